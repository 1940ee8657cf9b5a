use crate::credentials::CredentialError;
use mockview_auth::SecretError;
use mockview_chat::StoreError;
use mockview_types::UnsupportedLanguage;
use mockview_voice::VoiceError;
use thiserror::Error;

/// Coarse classification of a [`ChatError`], stable for callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    CredentialsMissing,
    ProviderUnreachable,
    ProviderRejected,
    EmptyTranscript,
    EmptyCompletion,
    SessionNotFound,
    InvalidSecret,
    SessionEnded,
    StoreWriteFailed,
    InvalidInput,
    Internal,
}

/// Failure of an orchestrator flow. Every variant aborts the flow.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("{0} provider API key is not configured")]
    CredentialsMissing(&'static str),

    /// A provider call failed; `step` says which part of the flow.
    #[error("failed to {step}: {source}")]
    Provider {
        step: &'static str,
        #[source]
        source: VoiceError,
    },

    #[error("transcription returned no text")]
    EmptyTranscript,

    #[error("completion returned no choices")]
    EmptyCompletion,

    #[error("chat session not found: {0}")]
    SessionNotFound(String),

    #[error("invalid session secret")]
    InvalidSecret,

    #[error("chat session has already ended")]
    SessionEnded,

    #[error("failed to {step}: {source}")]
    StoreWrite {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read conversation: {0}")]
    StoreRead(#[source] StoreError),

    #[error("failed to get database connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("failed to read provider credentials: {0}")]
    Credentials(#[from] CredentialError),

    #[error("failed to issue session secret: {0}")]
    Secret(#[source] SecretError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CredentialsMissing(_) => ErrorKind::CredentialsMissing,
            Self::Provider { source, .. } => match source {
                VoiceError::Unreachable { .. } => ErrorKind::ProviderUnreachable,
                VoiceError::Rejected { .. } | VoiceError::InvalidResponse { .. } => {
                    ErrorKind::ProviderRejected
                }
                VoiceError::InputTooLarge { .. } => ErrorKind::InvalidInput,
                VoiceError::Config(_) => ErrorKind::Internal,
            },
            Self::EmptyTranscript => ErrorKind::EmptyTranscript,
            Self::EmptyCompletion => ErrorKind::EmptyCompletion,
            Self::SessionNotFound(_) => ErrorKind::SessionNotFound,
            Self::InvalidSecret => ErrorKind::InvalidSecret,
            Self::SessionEnded => ErrorKind::SessionEnded,
            Self::StoreWrite { .. } => ErrorKind::StoreWriteFailed,
            Self::UnsupportedLanguage(_) | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::StoreRead(_)
            | Self::Pool(_)
            | Self::Credentials(_)
            | Self::Secret(_)
            | Self::Join(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn provider(step: &'static str) -> impl FnOnce(VoiceError) -> Self {
        move |source| Self::Provider { step, source }
    }

    pub(crate) fn store_write(step: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::StoreWrite { step, source }
    }
}
