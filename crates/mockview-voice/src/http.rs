//! Request plumbing shared by every adapter.

use crate::error::VoiceError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Upper bound on how much of an error body is kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 512;

pub(crate) fn build_client(
    provider: &'static str,
    timeout_seconds: u64,
) -> Result<reqwest::Client, VoiceError> {
    if timeout_seconds == 0 {
        return Err(VoiceError::Config(format!(
            "{provider} timeout must be at least one second"
        )));
    }
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| VoiceError::Config(format!("failed to build {provider} client: {e}")))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Sends the request and turns transport failures and non-2xx statuses
/// into [`VoiceError`]s.
pub(crate) async fn send(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, VoiceError> {
    let response = request.send().await.map_err(|e| {
        tracing::warn!(provider, error = %e, "provider request failed");
        VoiceError::Unreachable {
            provider,
            reason: e.to_string(),
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    tracing::warn!(provider, status = status.as_u16(), "provider rejected request");
    Err(VoiceError::Rejected {
        provider,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_bytes(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<Vec<u8>, VoiceError> {
    let bytes = response.bytes().await.map_err(|e| VoiceError::Unreachable {
        provider,
        reason: format!("failed to read response body: {e}"),
    })?;
    Ok(bytes.to_vec())
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, VoiceError> {
    let bytes = read_bytes(provider, response).await?;
    serde_json::from_slice(&bytes).map_err(|e| VoiceError::InvalidResponse {
        provider,
        reason: e.to_string(),
    })
}
