//! SQLite storage for mockview.
//!
//! One WAL-mode database file behind an `r2d2` pool. The schema (chat
//! sessions, their turns, and the provider key row) is created by the
//! migrations in `src/migrations/`, which [`open_database`] applies before
//! returning the pool.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};

use std::path::Path;
use thiserror::Error;

/// Errors from [`open_database`].
#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to get database connection: {0}")]
    Connection(#[from] r2d2::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },

    /// Each pooled connection to `:memory:` would see its own empty
    /// database, and r2d2 replaces connections over time.
    #[error("in-memory databases cannot back a connection pool; use a file path")]
    InMemory,
}

/// Creates the pool, makes sure the parent directory of `db_path` exists,
/// and applies pending migrations before handing the pool out.
///
/// # Errors
///
/// Returns [`OpenError`] if the directory, pool or migrations fail, and
/// [`OpenError::InMemory`] for `:memory:` paths.
pub fn open_database(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, OpenError> {
    if is_in_memory(db_path) {
        return Err(OpenError::InMemory);
    }
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| OpenError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
    }

    let pool = create_pool(db_path, settings)?;
    let conn = pool.get()?;
    let applied = run_migrations(&conn)?;
    if applied > 0 {
        tracing::info!(count = applied, path = db_path, "applied database migrations");
    }

    Ok(pool)
}

fn is_in_memory(db_path: &str) -> bool {
    let path = db_path.trim();
    path == ":memory:" || path.is_empty() || path.contains("mode=memory")
}
