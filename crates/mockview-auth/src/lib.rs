//! Session secret primitives for mockview.
//!
//! A chat session is guarded by a short random secret handed to the caller
//! exactly once, when the session is created. Only a bcrypt hash of it is
//! persisted. There is no recovery path: losing the plaintext means losing
//! access to the conversation.
//!
//! The plaintext is ten characters from `[A-Za-z0-9]`, short enough to be
//! copied by hand as a recovery token.

use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

/// Length of the plaintext session secret.
pub const SECRET_LENGTH: usize = 10;

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest work factor bcrypt accepts.
pub const MIN_COST: u32 = 4;

/// Highest work factor bcrypt accepts.
pub const MAX_COST: u32 = 31;

/// Errors produced by secret operations.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The configured bcrypt cost is outside the range bcrypt accepts.
    #[error("invalid bcrypt cost {0}: must be between 4 and 31")]
    InvalidCost(u32),

    /// Hashing the freshly generated secret failed.
    #[error("failed to hash session secret: {0}")]
    Hash(#[source] bcrypt::BcryptError),

    /// The supplied plaintext does not match the stored hash, or the stored
    /// hash is malformed. The two are not distinguished.
    #[error("session secret does not match")]
    Mismatch,
}

/// A freshly issued secret. `plaintext` goes to the caller, `hash` to storage.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedSecret {
    pub plaintext: String,
    pub hash: String,
}

impl std::fmt::Debug for IssuedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedSecret")
            .field("plaintext", &"[REDACTED]")
            .field("hash", &self.hash)
            .finish()
    }
}

/// Issues and verifies session secrets with a fixed bcrypt work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretHasher {
    cost: u32,
}

impl Default for SecretHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl SecretHasher {
    /// Creates a hasher with the given bcrypt cost.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidCost`] outside `4..=31`.
    pub fn new(cost: u32) -> Result<Self, SecretError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(SecretError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Generates a new plaintext secret and its salted hash.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Hash`] if bcrypt fails.
    pub fn issue(&self) -> Result<IssuedSecret, SecretError> {
        let plaintext = generate_plaintext();
        let hash = bcrypt::hash(&plaintext, self.cost).map_err(SecretError::Hash)?;
        Ok(IssuedSecret { plaintext, hash })
    }

    /// Checks `plaintext` against a stored hash.
    ///
    /// bcrypt compares digests in constant time. A malformed hash is
    /// reported as a mismatch so callers never learn why verification
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Mismatch`] on any failure.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<(), SecretError> {
        match bcrypt::verify(plaintext, hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(SecretError::Mismatch),
            Err(e) => {
                tracing::warn!("stored session secret hash could not be parsed: {}", e);
                Err(SecretError::Mismatch)
            }
        }
    }
}

fn generate_plaintext() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}
