//! mockview server library.
//!
//! Wires the interview [`Orchestrator`](orchestrator::Orchestrator) to its
//! collaborators and exposes it over HTTP. The binary in `main.rs` only
//! loads configuration, installs logging and serves [`app`].

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod prompt;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use config::{Config, ConfigError, CredentialBackend};
use credentials::{CredentialStore, DbCredentials, KeyringCredentials};
use mockview_auth::{SecretError, SecretHasher};
use mockview_db::{DbPool, DbRuntimeSettings, OpenError};
use mockview_voice::{
    ElevenLabsSpeech, OpenAiCompleter, OpenAiHealth, OpenAiSpeech, OpenAiTranscriber, VoiceError,
};
use orchestrator::{Orchestrator, Providers};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Body limit for routes that carry no audio.
pub const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Body limit for chat routes, which carry base64 recordings.
pub const MAX_CHAT_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open database: {0}")]
    Database(#[from] OpenError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("failed to build provider client: {0}")]
    Voice(#[from] VoiceError),
}

impl AppState {
    /// Opens the database and builds the production providers.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let pool = mockview_db::open_database(
            &config.database.path,
            DbRuntimeSettings {
                busy_timeout_ms: config.database.busy_timeout_ms,
                pool_max_size: config.database.pool_max_size,
            },
        )?;
        Self::with_pool(config, pool)
    }

    /// Like [`AppState::from_config`] but over an already migrated pool.
    pub fn with_pool(config: &Config, pool: DbPool) -> Result<Self, StartupError> {
        let openai = &config.providers.openai;
        let providers = Providers {
            transcriber: Arc::new(OpenAiTranscriber::new(openai)?),
            completer: Arc::new(OpenAiCompleter::new(openai)?),
            primary_speech: Arc::new(OpenAiSpeech::new(openai)?),
            secondary_speech: Arc::new(ElevenLabsSpeech::new(&config.providers.elevenlabs)?),
            health: Arc::new(OpenAiHealth::new(openai)?),
        };

        let credentials: Arc<dyn CredentialStore> = match config.credentials.backend {
            CredentialBackend::Database => Arc::new(DbCredentials::new(pool.clone())),
            CredentialBackend::Keyring => Arc::new(KeyringCredentials::default()),
        };
        tracing::info!(backend = ?config.credentials.backend, "credential store selected");

        let orchestrator = Orchestrator::new(
            pool,
            SecretHasher::new(config.auth.bcrypt_cost)?,
            providers,
            credentials,
            config.chat.default_language()?,
        );
        Ok(Self { orchestrator })
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/api/chat/start", post(api::start_chat_handler))
        .route("/api/chat/answer", post(api::answer_chat_handler))
        .route("/api/chat/end", post(api::end_chat_handler))
        .route("/api/chat/history", post(api::history_handler))
        .layer(DefaultBodyLimit::max(MAX_CHAT_BODY_BYTES));

    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(api::status_handler))
        .route(
            "/api/keys",
            get(api::get_keys_handler).put(api::update_keys_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .merge(chat_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
