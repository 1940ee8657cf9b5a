//! Provider API key storage.
//!
//! Keys live either in the application database (default) or in the OS
//! keyring. Both backends are blocking; the orchestrator calls them from
//! `spawn_blocking`.

use mockview_chat::{ApiKeys, StoreError};
use mockview_db::DbPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to get database connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Reads and updates the primary/secondary provider keys.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<ApiKeys, CredentialError>;

    /// Partial update. `None` or an empty value keeps the stored key.
    fn update(&self, primary: Option<&str>, secondary: Option<&str>)
        -> Result<(), CredentialError>;

    /// True when at least one key is set.
    fn configured(&self) -> Result<bool, CredentialError> {
        Ok(self.get()?.any_configured())
    }
}

/// Keys stored in the `settings` table.
#[derive(Clone)]
pub struct DbCredentials {
    pool: DbPool,
}

impl DbCredentials {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for DbCredentials {
    fn get(&self) -> Result<ApiKeys, CredentialError> {
        let conn = self.pool.get()?;
        Ok(mockview_chat::get_api_keys(&conn)?)
    }

    fn update(
        &self,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Result<(), CredentialError> {
        let conn = self.pool.get()?;
        Ok(mockview_chat::update_api_keys(&conn, primary, secondary)?)
    }
}

pub const KEYRING_SERVICE: &str = "com.mockview.server";
const KEYRING_PRIMARY: &str = "primary-api-key";
const KEYRING_SECONDARY: &str = "secondary-api-key";

/// Keys stored in the OS keyring under [`KEYRING_SERVICE`].
#[derive(Debug, Clone)]
pub struct KeyringCredentials {
    service: String,
}

impl Default for KeyringCredentials {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringCredentials {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn load(&self, user: &str) -> Result<String, CredentialError> {
        let entry = keyring::Entry::new(&self.service, user)?;
        match entry.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, user: &str, value: Option<&str>) -> Result<(), CredentialError> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(());
        };
        keyring::Entry::new(&self.service, user)?.set_password(value)?;
        Ok(())
    }
}

impl CredentialStore for KeyringCredentials {
    fn get(&self) -> Result<ApiKeys, CredentialError> {
        Ok(ApiKeys {
            primary: self.load(KEYRING_PRIMARY)?,
            secondary: self.load(KEYRING_SECONDARY)?,
        })
    }

    fn update(
        &self,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Result<(), CredentialError> {
        self.store(KEYRING_PRIMARY, primary)?;
        self.store(KEYRING_SECONDARY, secondary)?;
        tracing::info!(
            primary = primary.is_some_and(|k| !k.trim().is_empty()),
            secondary = secondary.is_some_and(|k| !k.trim().is_empty()),
            "updated provider credentials in keyring"
        );
        Ok(())
    }
}
