use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    /// Connect failure, timeout, or a body that could not be read.
    #[error("{provider} unreachable: {reason}")]
    Unreachable {
        provider: &'static str,
        reason: String,
    },

    /// The provider answered with a non-2xx status.
    #[error("{provider} rejected the request with status {status}: {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// A 2xx response whose body did not have the expected shape.
    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{what} exceeds maximum size: {len} bytes (limit: {limit} bytes)")]
    InputTooLarge {
        what: &'static str,
        len: usize,
        limit: usize,
    },
}
