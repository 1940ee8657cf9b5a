use serde::{Deserialize, Serialize};

/// Settings for the OpenAI family of endpoints (transcription, chat
/// completion, speech, model listing) plus its public status page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub status_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            status_url: "https://status.openai.com/api/v2".to_string(),
            chat_model: "gpt-4o-mini-2024-07-18".to_string(),
            transcription_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "nova".to_string(),
            timeout_seconds: 60,
        }
    }
}

/// Settings for the ElevenLabs text-to-speech endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub base_url: String,
    pub model_id: String,
    pub voice_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.elevenlabs.io/v1".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            voice_id: "cgSgspJ2msm6clMCkdW9".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
            timeout_seconds: 60,
        }
    }
}
