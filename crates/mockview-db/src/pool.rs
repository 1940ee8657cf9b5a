//! r2d2 pool over a single SQLite file.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{ffi, Connection, OpenFlags};
use std::time::Duration;
use thiserror::Error;

/// Tunables applied to every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to build sqlite pool for {path}: {source}")]
    Build {
        path: String,
        #[source]
        source: r2d2::Error,
    },
}

/// Builds a pool whose connections run in WAL mode with foreign keys on.
///
/// `:memory:` gives every pooled connection its own private database; use
/// a file when several connections must see the same rows.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_init(move |conn| prepare_connection(conn, settings));

    Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)
        .map_err(|source| PoolError::Build {
            path: db_path.to_string(),
            source,
        })
}

fn prepare_connection(conn: &mut Connection, settings: DbRuntimeSettings) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
    conn.pragma_update(None, "foreign_keys", true)?;

    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    match mode.as_str() {
        // In-memory databases cannot use WAL and report "memory".
        "wal" | "memory" => Ok(()),
        other => Err(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {other}, expected wal")),
        )),
    }
}
