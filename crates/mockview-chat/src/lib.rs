//! Conversation store for mockview.
//!
//! A chat session owns an append-only log of turns. The log is the
//! canonical conversation history: the system persona first, then the
//! interviewer's opening line, then user/assistant pairs. Turns are never
//! updated or deleted (the schema refuses both), and `list_turns` returns
//! them in the order they were appended.
//!
//! All functions take a plain `rusqlite::Connection`; callers running on
//! an async runtime are expected to wrap them in `spawn_blocking`.

use mockview_types::{Language, Role};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use thiserror::Error;

pub mod settings;

pub use settings::{get_api_keys, keys_configured, update_api_keys, ApiKeys};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("chat session not found: {0}")]
    SessionNotFound(String),
    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

/// One interview conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque public identifier (UUID v4).
    pub id: String,
    /// bcrypt hash of the session secret.
    pub secret_hash: String,
    /// Spoken language, fixed at creation.
    pub language: Language,
    /// Creation timestamp (SQLite `datetime('now')`, UTC).
    pub created_at: String,
    /// Set once the closing feedback has been delivered.
    pub ended_at: Option<String>,
}

impl Session {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    /// Store-wide append sequence. Strictly increasing in creation order.
    #[serde(skip)]
    pub seq: i64,
    pub id: String,
    #[serde(skip)]
    pub session_id: String,
    pub role: Role,
    pub text: String,
    /// Base64-encoded audio, when the turn was spoken or synthesized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip)]
    pub created_at: String,
}

/// A turn that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTurn {
    pub role: Role,
    pub text: String,
    pub audio: Option<String>,
}

impl NewTurn {
    pub fn new(role: Role, text: impl Into<String>, audio: Option<String>) -> Self {
        Self {
            role,
            text: text.into(),
            audio,
        }
    }
}

const SESSION_COLUMNS: &str = "id, secret_hash, language, created_at, ended_at";
const TURN_COLUMNS: &str = "seq, id, session_id, role, text, audio, created_at";

/// Creates a session row with a fresh UUID.
pub fn create_session(
    conn: &Connection,
    secret_hash: &str,
    language: Language,
) -> Result<Session, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO chat_sessions (id, secret_hash, language) VALUES (?1, ?2, ?3)",
        params![id, secret_hash, language.identifier()],
    )?;
    get_session(conn, &id)
}

/// Creates a session and its opening turns in a single transaction.
///
/// Either the session and every turn become visible together, or nothing
/// is written.
pub fn create_session_with_turns(
    conn: &Connection,
    secret_hash: &str,
    language: Language,
    turns: &[NewTurn],
) -> Result<(Session, Vec<Turn>), StoreError> {
    let tx = conn.unchecked_transaction()?;
    let session = create_session(&tx, secret_hash, language)?;
    let mut written = Vec::with_capacity(turns.len());
    for turn in turns {
        written.push(insert_turn(&tx, &session.id, turn)?);
    }
    tx.commit()?;

    tracing::debug!(session_id = %session.id, turns = written.len(), "created chat session");
    Ok((session, written))
}

/// Loads a session by id.
///
/// Returns [`StoreError::SessionNotFound`] when no row matches.
pub fn get_session(conn: &Connection, id: &str) -> Result<Session, StoreError> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = ?1"),
        [id],
        map_row_to_session,
    )
    .optional()?
    .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?
}

/// Appends one turn to a session's log.
pub fn append_turn(
    conn: &Connection,
    session_id: &str,
    turn: &NewTurn,
) -> Result<Turn, StoreError> {
    ensure_session_exists(conn, session_id)?;
    insert_turn(conn, session_id, turn)
}

/// Appends the closing turn and marks the session ended, atomically.
pub fn append_final_turn(
    conn: &Connection,
    session_id: &str,
    turn: &NewTurn,
) -> Result<Turn, StoreError> {
    let tx = conn.unchecked_transaction()?;
    ensure_session_exists(&tx, session_id)?;
    let written = insert_turn(&tx, session_id, turn)?;
    tx.execute(
        "UPDATE chat_sessions SET ended_at = datetime('now') WHERE id = ?1 AND ended_at IS NULL",
        [session_id],
    )?;
    tx.commit()?;
    Ok(written)
}

/// Returns a session's turns in append order.
pub fn list_turns(conn: &Connection, session_id: &str) -> Result<Vec<Turn>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TURN_COLUMNS} FROM chat_turns WHERE session_id = ?1 ORDER BY seq ASC"
    ))?;

    let rows = stmt.query_map([session_id], map_row_to_turn)?;
    let mut turns = Vec::new();
    for row in rows {
        turns.push(row??);
    }
    Ok(turns)
}

fn ensure_session_exists(conn: &Connection, session_id: &str) -> Result<(), StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM chat_sessions WHERE id = ?1)",
        [session_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::SessionNotFound(session_id.to_string()))
    }
}

fn insert_turn(conn: &Connection, session_id: &str, turn: &NewTurn) -> Result<Turn, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    let row = conn.query_row(
        "INSERT INTO chat_turns (id, session_id, role, text, audio)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING seq, created_at",
        params![id, session_id, turn.role.as_str(), turn.text, turn.audio],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    )?;

    Ok(Turn {
        seq: row.0,
        id,
        session_id: session_id.to_string(),
        role: turn.role,
        text: turn.text.clone(),
        audio: turn.audio.clone(),
        created_at: row.1,
    })
}

// The outer Result is for rusqlite column access, the inner one for
// values that read fine but do not decode into our types.
fn map_row_to_session(row: &Row) -> rusqlite::Result<Result<Session, StoreError>> {
    let language: String = row.get(2)?;
    let language = match Language::from_identifier(&language) {
        Ok(lang) => lang,
        Err(e) => {
            return Ok(Err(StoreError::CorruptRow {
                table: "chat_sessions",
                reason: e.to_string(),
            }))
        }
    };

    Ok(Ok(Session {
        id: row.get(0)?,
        secret_hash: row.get(1)?,
        language,
        created_at: row.get(3)?,
        ended_at: row.get(4)?,
    }))
}

fn map_row_to_turn(row: &Row) -> rusqlite::Result<Result<Turn, StoreError>> {
    let role: String = row.get(3)?;
    let role = match role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            return Ok(Err(StoreError::CorruptRow {
                table: "chat_turns",
                reason: e.to_string(),
            }))
        }
    };

    Ok(Ok(Turn {
        seq: row.get(0)?,
        id: row.get(1)?,
        session_id: row.get(2)?,
        role,
        text: row.get(4)?,
        audio: row.get(5)?,
        created_at: row.get(6)?,
    }))
}
