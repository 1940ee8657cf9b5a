//! Provider adapters for mockview.
//!
//! Three remote capabilities sit behind traits so the orchestrator can be
//! wired to real HTTP providers in production and to doubles in tests:
//!
//! - [`Transcriber`]: audio bytes to text (OpenAI Whisper).
//! - [`Completer`]: ordered dialogue to the next interviewer line (OpenAI
//!   chat completions).
//! - [`SpeechProvider`]: text to audio bytes. Two implementations exist,
//!   [`OpenAiSpeech`] (English only) and [`ElevenLabsSpeech`] (multilingual,
//!   the catch-all).
//!
//! Every call is a single attempt with the client's configured timeout.
//! Nothing here retries; a transport failure or non-2xx response is handed
//! back as a [`VoiceError`] for the caller to surface.
//!
//! [`speech_text`] strips display markup from model output before it is
//! spoken, and [`OpenAiHealth`] backs the service status probe.

pub mod completion;
pub mod config;
pub mod error;
mod http;
pub mod sanitize;
pub mod status;
pub mod stt;
pub mod tts;

pub use completion::{ChatMessage, Completer, OpenAiCompleter};
pub use config::{ElevenLabsConfig, OpenAiConfig};
pub use error::VoiceError;
pub use sanitize::speech_text;
pub use status::{ApiStatus, OpenAiHealth, ProviderHealth};
pub use stt::{OpenAiTranscriber, Transcriber};
pub use tts::{ElevenLabsSpeech, OpenAiSpeech, SpeechProvider};
