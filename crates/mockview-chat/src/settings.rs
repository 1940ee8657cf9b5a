//! Provider credential row.
//!
//! The `settings` table holds exactly one row (seeded by migration) with the
//! API keys for the primary and secondary speech providers. An empty string
//! means "not configured".

use rusqlite::Connection;

use crate::StoreError;

/// Stored provider keys. Empty means unset.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub primary: String,
    pub secondary: String,
}

impl ApiKeys {
    pub fn primary(&self) -> Option<&str> {
        non_empty(&self.primary)
    }

    pub fn secondary(&self) -> Option<&str> {
        non_empty(&self.secondary)
    }

    /// True when at least one key is present.
    pub fn any_configured(&self) -> bool {
        self.primary().is_some() || self.secondary().is_some()
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |key: &str| if key.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("ApiKeys")
            .field("primary", &mask(&self.primary))
            .field("secondary", &mask(&self.secondary))
            .finish()
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Reads both provider keys.
pub fn get_api_keys(conn: &Connection) -> Result<ApiKeys, StoreError> {
    let keys = conn.query_row(
        "SELECT primary_key, secondary_key FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(ApiKeys {
                primary: row.get(0)?,
                secondary: row.get(1)?,
            })
        },
    )?;
    Ok(keys)
}

/// Partially updates the provider keys.
///
/// `None` and empty strings leave the stored value untouched, so a client
/// can rotate one key without resending the other.
pub fn update_api_keys(
    conn: &Connection,
    primary: Option<&str>,
    secondary: Option<&str>,
) -> Result<(), StoreError> {
    let primary = primary.map(str::trim).filter(|k| !k.is_empty());
    let secondary = secondary.map(str::trim).filter(|k| !k.is_empty());
    if primary.is_none() && secondary.is_none() {
        return Ok(());
    }

    conn.execute(
        "UPDATE settings SET
            primary_key = COALESCE(?1, primary_key),
            secondary_key = COALESCE(?2, secondary_key),
            updated_at = datetime('now')
         WHERE id = 1",
        rusqlite::params![primary, secondary],
    )?;

    tracing::info!(
        primary = primary.is_some(),
        secondary = secondary.is_some(),
        "updated provider credentials"
    );
    Ok(())
}

/// True when either provider key is set.
pub fn keys_configured(conn: &Connection) -> Result<bool, StoreError> {
    Ok(get_api_keys(conn)?.any_configured())
}
