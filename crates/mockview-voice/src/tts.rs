use crate::config::{ElevenLabsConfig, OpenAiConfig};
use crate::error::VoiceError;
use crate::http;
use async_trait::async_trait;
use mockview_types::Language;
use serde::Serialize;

/// Maximum text input size for TTS (64 KiB).
pub const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Text-to-speech capability.
///
/// Implementations declare which spoken languages they can voice; the
/// caller decides which provider to use for a turn and never mixes them.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Short stable name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    fn supports_language(&self, language: Language) -> bool;

    /// Synthesizes `text` and returns encoded audio (MP3 for both HTTP
    /// providers).
    async fn speak(&self, api_key: &str, text: &str) -> Result<Vec<u8>, VoiceError>;
}

fn check_input(text: &str) -> Result<(), VoiceError> {
    if text.len() > MAX_TTS_INPUT_BYTES {
        return Err(VoiceError::InputTooLarge {
            what: "text",
            len: text.len(),
            limit: MAX_TTS_INPUT_BYTES,
        });
    }
    Ok(())
}

#[derive(Serialize)]
struct OpenAiSpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

/// OpenAI `audio/speech`. Voices English only.
#[derive(Debug, Clone)]
pub struct OpenAiSpeech {
    base_url: String,
    model: String,
    voice: String,
    client: reqwest::Client,
}

impl OpenAiSpeech {
    pub const NAME: &'static str = "openai";

    pub fn new(config: &OpenAiConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            client: http::build_client(Self::NAME, config.timeout_seconds)?,
        })
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeech {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports_language(&self, language: Language) -> bool {
        language == Language::English
    }

    async fn speak(&self, api_key: &str, text: &str) -> Result<Vec<u8>, VoiceError> {
        check_input(text)?;
        let request = self
            .client
            .post(http::endpoint(&self.base_url, "audio/speech"))
            .bearer_auth(api_key)
            .json(&OpenAiSpeechRequest {
                model: &self.model,
                input: text,
                voice: &self.voice,
            });

        let response = http::send(Self::NAME, request).await?;
        http::read_bytes(Self::NAME, response).await
    }
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

/// ElevenLabs multilingual text-to-speech. Accepts every language.
#[derive(Debug, Clone)]
pub struct ElevenLabsSpeech {
    config: ElevenLabsConfig,
    client: reqwest::Client,
}

impl ElevenLabsSpeech {
    pub const NAME: &'static str = "elevenlabs";

    pub fn new(config: &ElevenLabsConfig) -> Result<Self, VoiceError> {
        if !(0.0..=1.0).contains(&config.stability)
            || !(0.0..=1.0).contains(&config.similarity_boost)
        {
            return Err(VoiceError::Config(
                "stability and similarity_boost must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(Self {
            config: config.clone(),
            client: http::build_client(Self::NAME, config.timeout_seconds)?,
        })
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsSpeech {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn supports_language(&self, _language: Language) -> bool {
        true
    }

    async fn speak(&self, api_key: &str, text: &str) -> Result<Vec<u8>, VoiceError> {
        check_input(text)?;
        let path = format!("text-to-speech/{}", self.config.voice_id);
        let request = self
            .client
            .post(http::endpoint(&self.config.base_url, &path))
            .header("xi-api-key", api_key)
            .json(&ElevenLabsRequest {
                text,
                model_id: &self.config.model_id,
                voice_settings: VoiceSettings {
                    stability: self.config.stability,
                    similarity_boost: self.config.similarity_boost,
                },
            });

        let response = http::send(Self::NAME, request).await?;
        http::read_bytes(Self::NAME, response).await
    }
}
