//! Shared types for the mockview interview service.
//!
//! This crate holds the small vocabulary every other crate agrees on: the
//! role attached to each conversation turn and the table of spoken
//! languages the interviewer can hold a conversation in. It has no
//! workspace dependencies of its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod language;
pub use language::{Language, UnsupportedLanguage};

/// Author of a single conversation turn.
///
/// The string forms match the chat-completion wire vocabulary so a stored
/// turn can be replayed to the model without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The interviewer persona prompt. Always the first turn of a session.
    System,
    /// A line spoken by the interviewer.
    Assistant,
    /// A transcribed answer from the candidate.
    User,
}

impl Role {
    /// Returns the lowercase label stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Assistant => "assistant",
            Self::User => "user",
        }
    }

    /// Whether turns with this role are shown to the candidate.
    pub fn is_visible(self) -> bool {
        !matches!(self, Self::System)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown turn role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "assistant" => Ok(Self::Assistant),
            "user" => Ok(Self::User),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}
