//! Health probes for the primary provider.

use crate::config::OpenAiConfig;
use crate::error::VoiceError;
use crate::http;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "openai";

/// State of the provider's `API` component on its public status page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    Operational,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    Unknown,
}

impl ApiStatus {
    fn from_component(status: &str) -> Self {
        match status {
            "operational" => Self::Operational,
            "degraded_performance" => Self::DegradedPerformance,
            "partial_outage" => Self::PartialOutage,
            "major_outage" => Self::MajorOutage,
            _ => Self::Unknown,
        }
    }

    /// `Some(true)` when operational, `Some(false)` for any outage, `None`
    /// when the state is unknown.
    pub fn is_available(self) -> Option<bool> {
        match self {
            Self::Operational => Some(true),
            Self::Unknown => None,
            Self::DegradedPerformance | Self::PartialOutage | Self::MajorOutage => Some(false),
        }
    }
}

/// Probes used by the service status endpoint.
#[async_trait]
pub trait ProviderHealth: Send + Sync {
    /// Reads the public status page. Any failure to read it is `Unknown`.
    async fn api_status(&self) -> ApiStatus;

    /// Whether `api_key` is accepted by the provider.
    async fn is_key_valid(&self, api_key: &str) -> Result<bool, VoiceError>;
}

#[derive(Deserialize)]
struct ComponentsResponse {
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Deserialize)]
struct Component {
    name: String,
    status: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiHealth {
    base_url: String,
    status_url: String,
    client: reqwest::Client,
}

impl OpenAiHealth {
    pub fn new(config: &OpenAiConfig) -> Result<Self, VoiceError> {
        Ok(Self {
            base_url: config.base_url.clone(),
            status_url: config.status_url.clone(),
            client: http::build_client(PROVIDER, config.timeout_seconds)?,
        })
    }

    async fn fetch_status(&self) -> Result<ApiStatus, VoiceError> {
        let request = self
            .client
            .get(http::endpoint(&self.status_url, "components.json"));
        let response = http::send("openai-status", request).await?;
        let body: ComponentsResponse = http::read_json("openai-status", response).await?;

        Ok(body
            .components
            .iter()
            .find(|component| component.name == "API")
            .map(|component| ApiStatus::from_component(&component.status))
            .unwrap_or(ApiStatus::Unknown))
    }
}

#[async_trait]
impl ProviderHealth for OpenAiHealth {
    async fn api_status(&self) -> ApiStatus {
        match self.fetch_status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(error = %e, "status page unavailable");
                ApiStatus::Unknown
            }
        }
    }

    async fn is_key_valid(&self, api_key: &str) -> Result<bool, VoiceError> {
        if api_key.is_empty() {
            return Ok(false);
        }
        let request = self
            .client
            .get(http::endpoint(&self.base_url, "models"))
            .bearer_auth(api_key);
        match http::send(PROVIDER, request).await {
            Ok(response) => Ok(response.status() == reqwest::StatusCode::OK),
            Err(VoiceError::Rejected { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
