use crate::config::OpenAiConfig;
use crate::error::VoiceError;
use crate::http;
use async_trait::async_trait;
use mockview_types::Language;
use serde::Deserialize;

/// Maximum audio upload accepted by the transcription endpoint (25 MiB).
pub const MAX_STT_INPUT_BYTES: usize = 25 * 1024 * 1024;

const PROVIDER: &str = "openai";

/// Speech-to-text capability.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes one recorded answer. `language` is a hint for the
    /// model; the returned text is trimmed and may be empty.
    async fn transcribe(
        &self,
        api_key: &str,
        audio: &[u8],
        language: Language,
    ) -> Result<String, VoiceError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper transcription over the OpenAI HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiTranscriber {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(config: &OpenAiConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            model: config.transcription_model.clone(),
            client: http::build_client(PROVIDER, config.timeout_seconds)?,
        })
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(
        &self,
        api_key: &str,
        audio: &[u8],
        language: Language,
    ) -> Result<String, VoiceError> {
        if audio.len() > MAX_STT_INPUT_BYTES {
            return Err(VoiceError::InputTooLarge {
                what: "audio",
                len: audio.len(),
                limit: MAX_STT_INPUT_BYTES,
            });
        }

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Config(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.iso_639_1());

        let request = self
            .client
            .post(http::endpoint(&self.base_url, "audio/transcriptions"))
            .bearer_auth(api_key)
            .multipart(form);

        let response = http::send(PROVIDER, request).await?;
        let body: TranscriptionResponse = http::read_json(PROVIDER, response).await?;
        tracing::debug!(chars = body.text.len(), "transcription received");
        Ok(body.text.trim().to_string())
    }
}
