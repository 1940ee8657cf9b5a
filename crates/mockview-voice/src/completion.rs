use crate::config::OpenAiConfig;
use crate::error::VoiceError;
use crate::http;
use async_trait::async_trait;
use mockview_types::Role;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "openai";

/// One message of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Next-turn generation capability.
#[async_trait]
pub trait Completer: Send + Sync {
    /// Asks the model for the next assistant line given the full ordered
    /// dialogue. Returns `None` when the provider produced no choices.
    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, VoiceError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completions over the OpenAI HTTP API.
#[derive(Debug, Clone)]
pub struct OpenAiCompleter {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompleter {
    pub fn new(config: &OpenAiConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            model: config.chat_model.clone(),
            client: http::build_client(PROVIDER, config.timeout_seconds)?,
        })
    }
}

#[async_trait]
impl Completer for OpenAiCompleter {
    async fn complete(
        &self,
        api_key: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<String>, VoiceError> {
        let request = self
            .client
            .post(http::endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
            });

        let response = http::send(PROVIDER, request).await?;
        let body: CompletionResponse = http::read_json(PROVIDER, response).await?;
        tracing::debug!(
            messages = messages.len(),
            choices = body.choices.len(),
            "completion received"
        );

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty()))
    }
}
