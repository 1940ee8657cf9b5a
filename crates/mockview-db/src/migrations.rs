//! Schema migrations compiled into the binary.
//!
//! The schema version is SQLite's `user_version`: migration `n` in
//! [`MIGRATIONS`] (1-based) brings the database to version `n`. Each step
//! runs in its own transaction together with the version bump, so a failed
//! step leaves both schema and version where they were.

use rusqlite::Connection;
use thiserror::Error;

/// Ordered schema steps. Only ever append.
const MIGRATIONS: &[(&str, &str)] = &[
    ("settings", include_str!("migrations/001_settings.sql")),
    ("chat_sessions", include_str!("migrations/002_chat_sessions.sql")),
    ("chat_turns", include_str!("migrations/003_chat_turns.sql")),
    (
        "chat_session_ended",
        include_str!("migrations/004_chat_session_ended.sql"),
    ),
];

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration {version} ({name}) failed: {source}")]
    Step {
        version: u32,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read schema version: {0}")]
    Version(#[source] rusqlite::Error),

    /// The file was written by a newer build with more migrations.
    #[error("database schema version {found} is newer than this build ({known})")]
    TooNew { found: u32, known: u32 },
}

/// Brings the schema up to date and returns how many steps ran.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, MIGRATIONS)
}

fn schema_version(conn: &Connection) -> Result<u32, MigrationError> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(MigrationError::Version)
}

fn apply(conn: &Connection, steps: &[(&'static str, &'static str)]) -> Result<usize, MigrationError> {
    let current = schema_version(conn)?;
    let known = steps.len() as u32;
    if current > known {
        return Err(MigrationError::TooNew {
            found: current,
            known,
        });
    }

    let pending = &steps[current as usize..];
    for (offset, &(name, sql)) in pending.iter().enumerate() {
        let version = current + offset as u32 + 1;
        let step_failed = |source| MigrationError::Step {
            version,
            name,
            source,
        };

        let tx = conn.unchecked_transaction().map_err(step_failed)?;
        tx.execute_batch(sql).map_err(step_failed)?;
        tx.pragma_update(None, "user_version", version)
            .map_err(step_failed)?;
        tx.commit().map_err(step_failed)?;

        tracing::info!(version, migration = name, "applied schema migration");
    }

    Ok(pending.len())
}
