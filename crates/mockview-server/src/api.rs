//! HTTP handlers for the interview API.

use crate::error::{ChatError, ErrorKind};
use crate::orchestrator::{ChatReply, SessionHistory, StartedSession, StatusReport};
use crate::AppState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Message shared by every authentication failure so callers cannot tell
/// an unknown session from a wrong secret.
const UNAUTHORIZED_MESSAGE: &str = "invalid session id or secret";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("unprocessable: {0}")]
    Unprocessable(String),
    #[error("bad gateway: {0}")]
    BadGateway(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE.to_string()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::PreconditionFailed(msg) => (StatusCode::PRECONDITION_FAILED, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        match e.kind() {
            ErrorKind::SessionNotFound | ErrorKind::InvalidSecret => ApiError::Unauthorized,
            ErrorKind::SessionEnded => ApiError::Conflict(e.to_string()),
            ErrorKind::InvalidInput => ApiError::BadRequest(e.to_string()),
            ErrorKind::CredentialsMissing => ApiError::PreconditionFailed(e.to_string()),
            ErrorKind::EmptyTranscript => ApiError::Unprocessable(e.to_string()),
            ErrorKind::ProviderRejected | ErrorKind::EmptyCompletion => {
                ApiError::BadGateway(e.to_string())
            }
            ErrorKind::ProviderUnreachable => ApiError::ServiceUnavailable(e.to_string()),
            ErrorKind::StoreWriteFailed | ErrorKind::Internal => {
                tracing::error!(error = %e, "chat flow failed");
                ApiError::InternalServerError("internal server error".to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartChatRequest {
    pub role: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerChatRequest {
    pub id: String,
    pub secret: String,
    /// Base64-encoded recording.
    pub audio: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeysRequest {
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub secondary_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub configured: bool,
}

/// Handler for `POST /api/chat/start`.
pub async fn start_chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<StartChatRequest>,
) -> Result<Json<StartedSession>, ApiError> {
    let started = state
        .orchestrator
        .start_session(&payload.role, &payload.skills, payload.language.as_deref())
        .await?;
    Ok(Json(started))
}

/// Handler for `POST /api/chat/answer`.
pub async fn answer_chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<AnswerChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let audio = BASE64
        .decode(payload.audio.trim())
        .map_err(|e| ApiError::BadRequest(format!("audio is not valid base64: {}", e)))?;

    let reply = state
        .orchestrator
        .answer_session(&payload.id, &payload.secret, &audio)
        .await?;
    Ok(Json(reply))
}

/// Handler for `POST /api/chat/end`.
pub async fn end_chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state
        .orchestrator
        .end_session(&payload.id, &payload.secret)
        .await?;
    Ok(Json(reply))
}

/// Handler for `POST /api/chat/history`.
pub async fn history_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<SessionRequest>,
) -> Result<Json<SessionHistory>, ApiError> {
    let history = state
        .orchestrator
        .history(&payload.id, &payload.secret)
        .await?;
    Ok(Json(history))
}

/// Handler for `GET /api/status`.
pub async fn status_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<StatusReport>, ApiError> {
    Ok(Json(state.orchestrator.status().await?))
}

/// Handler for `GET /api/keys`. Never returns the keys themselves.
pub async fn get_keys_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<KeysResponse>, ApiError> {
    let configured = state.orchestrator.keys_configured().await?;
    Ok(Json(KeysResponse { configured }))
}

/// Handler for `PUT /api/keys`.
pub async fn update_keys_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<UpdateKeysRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .orchestrator
        .update_keys(payload.primary_key, payload.secondary_key)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
