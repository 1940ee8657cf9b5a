//! Spoken language table.
//!
//! A language travels in two shapes: a short region-qualified code
//! (`en-US`) at the API boundary, and a lowercase English name
//! (`english`) as the identifier persisted on a session.

use std::fmt;
use thiserror::Error;

/// A language the interview can be conducted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Indonesian,
    Spanish,
    French,
    German,
    Japanese,
}

/// Returned when a code or identifier is not in the language table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl Language {
    /// Every supported language, in display order.
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::Indonesian,
        Language::Spanish,
        Language::French,
        Language::German,
        Language::Japanese,
    ];

    /// Short code used at the API boundary.
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Indonesian => "id-ID",
            Self::Spanish => "es-ES",
            Self::French => "fr-FR",
            Self::German => "de-DE",
            Self::Japanese => "ja-JP",
        }
    }

    /// Identifier stored on the session row.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Indonesian => "indonesian",
            Self::Spanish => "spanish",
            Self::French => "french",
            Self::German => "german",
            Self::Japanese => "japanese",
        }
    }

    /// ISO 639-1 subtag, the form transcription models expect as a hint.
    pub fn iso_639_1(self) -> &'static str {
        self.code()
            .split_once('-')
            .map(|(primary, _)| primary)
            .unwrap_or(self.code())
    }

    /// Name of the language written in that language, for prompts.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Indonesian => "Bahasa Indonesia",
            Self::Spanish => "Español",
            Self::French => "Français",
            Self::German => "Deutsch",
            Self::Japanese => "日本語",
        }
    }

    /// Resolves a boundary code such as `en-US`, `EN-us` or `en`.
    pub fn from_code(code: &str) -> Result<Self, UnsupportedLanguage> {
        let wanted = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| {
                lang.code().eq_ignore_ascii_case(wanted)
                    || lang.iso_639_1().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnsupportedLanguage(code.to_string()))
    }

    /// Resolves a stored identifier back into a language.
    pub fn from_identifier(identifier: &str) -> Result<Self, UnsupportedLanguage> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.identifier() == identifier)
            .ok_or_else(|| UnsupportedLanguage(identifier.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}
