//! Domain error taxonomy shared by the store, query engine, and registry.
//!
//! The enum is `Clone` because a single load outcome is handed to every
//! caller that was waiting on a coalesced load.

use thiserror::Error;

/// Convenience alias used throughout the data access layer.
pub type Result<T, E = ScriptureError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptureError {
    /// Book number outside the canonical index.
    #[error("unknown book number {0}")]
    UnknownBook(i64),

    /// Range with inverted ordering or coordinates outside canonical bounds.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Two records in one translation share a coordinate.
    #[error("duplicate verse {book}:{chapter}:{verse} in translation '{translation}'")]
    DuplicateVerse {
        translation: String,
        book: u8,
        chapter: u16,
        verse: u16,
    },

    /// A record that resolves to a book but cannot be placed in it.
    #[error(
        "invalid verse record {book}:{chapter}:{verse} in translation '{translation}': {reason}"
    )]
    InvalidVerse {
        translation: String,
        book: i64,
        chapter: i64,
        verse: i64,
        reason: &'static str,
    },

    /// Nothing can load the requested id.
    #[error("translation '{0}' not found")]
    TranslationNotFound(String),

    /// The underlying source failed; the next request retries.
    #[error("failed to load translation '{translation}': {message}")]
    Load { translation: String, message: String },

    /// Malformed bridge call, rejected before any domain logic runs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ScriptureError {
    pub(crate) fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange(message.into())
    }

    /// Build a load error from an `anyhow` chain, keeping every context
    /// layer so the log shows where the load failed.
    pub(crate) fn load(translation: &str, err: &anyhow::Error) -> Self {
        Self::Load {
            translation: translation.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Whether this error should abort a translation load rather than be
    /// reported as a caller mistake.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::DuplicateVerse { .. } | Self::InvalidVerse { .. })
    }
}
