//! Domain models passed between the sources, the store, and the bridge.
//! `VerseRecord` is the raw, untrusted shape that comes off disk; `Verse` is
//! the validated form that only the store builder can produce.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::canon::BookNumber;

/// A canonical coordinate. The derived ordering is the canonical order:
/// book, then chapter, then verse, all ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VerseRef {
    pub book: BookNumber,
    /// 1-based chapter within `book`.
    pub chapter: u16,
    /// 1-based verse within `chapter`.
    pub verse: u16,
}

impl VerseRef {
    /// Build a coordinate. Chapter bounds are the caller's concern; see
    /// [`crate::canon::chapter_count`].
    pub fn new(book: BookNumber, chapter: u16, verse: u16) -> Self {
        Self {
            book,
            chapter,
            verse,
        }
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{}",
            self.book.info().name,
            self.chapter,
            self.verse
        )
    }
}

/// One validated verse. The translation id is shared with every other verse
/// of the same store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    /// Id of the translation this verse came from.
    pub translation_id: Arc<str>,
    pub reference: VerseRef,
    /// Verse text exactly as stored.
    pub text: String,
}

impl Verse {
    /// Canonical book of this verse.
    pub fn book(&self) -> BookNumber {
        self.reference.book
    }

    pub fn chapter(&self) -> u16 {
        self.reference.chapter
    }

    pub fn verse(&self) -> u16 {
        self.reference.verse
    }
}

/// Raw verse row as it appears in a JSON verse list or SQLite table. Integers
/// are kept wide and signed so that out-of-range values reach validation
/// instead of failing deserialization with an opaque message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub book: i64,
    pub chapter: i64,
    pub verse: i64,
    pub text: String,
}

/// Public identity of a translation. This is the only translation metadata
/// allowed across the bridge.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TranslationInfo {
    /// Stable short id, e.g. `kjv`. Always passes [`is_valid_translation_id`].
    pub id: String,
    /// Human-readable name; falls back to the id when the data has none.
    #[serde(rename = "displayName")]
    pub display_name: String,
}

impl fmt::Display for TranslationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.id)
    }
}

/// Everything a source hands back for one translation, before validation.
#[derive(Debug, Clone)]
pub struct TranslationData {
    pub info: TranslationInfo,
    pub records: Vec<VerseRecord>,
}

/// Longest translation id accepted anywhere.
pub const MAX_TRANSLATION_ID_LEN: usize = 32;

/// Translation ids double as file stems in the data directory, so they are
/// restricted to a character set that cannot express a path.
pub fn is_valid_translation_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_TRANSLATION_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_ids_cannot_express_paths() {
        for ok in ["kjv", "KJV", "web-2000", "esv_uk", "a"] {
            assert!(is_valid_translation_id(ok), "{ok}");
        }
        let long = "x".repeat(33);
        for bad in ["", "../kjv", "kjv.sqlite", "a/b", "c:\\x", "kjv ", long.as_str()] {
            assert!(!is_valid_translation_id(bad), "{bad}");
        }
    }
}
