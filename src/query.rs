//! Range queries over a single translation store.

use std::sync::Arc;

use crate::canon::{self, BookNumber};
use crate::error::{Result, ScriptureError};
use crate::models::Verse;
use crate::store::TranslationStore;

/// A caller-supplied range, still in raw integer form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRange {
    pub translation_id: String,
    pub book: i64,
    pub from_chapter: i64,
    pub from_verse: i64,
    pub to_chapter: i64,
    pub to_verse: i64,
}

/// A range that has been checked against the canonical index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidRange {
    pub book: BookNumber,
    pub from: (u16, u16),
    pub to: (u16, u16),
}

/// Verses found for a range, plus what the store was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResult {
    pub translation_id: Arc<str>,
    pub book: BookNumber,
    pub verses: Vec<Verse>,
    /// Verse numbers inside the range that the store lacks, counted up to the
    /// highest verse the store holds for each chapter.
    pub omitted: u32,
    /// Chapters inside the range with no verses at all in this store.
    pub missing_chapters: Vec<u16>,
}

impl RangeResult {
    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }
}

impl QueryRange {
    /// Check the coordinates against the canon and the ordering of the two
    /// endpoints, without touching any store.
    pub fn validate(&self) -> Result<ValidRange> {
        let book = BookNumber::new(self.book)?;
        let chapters = canon::chapter_count(book);

        let chapter = |n: i64, which: &str| -> Result<u16> {
            u16::try_from(n)
                .ok()
                .filter(|c| (1..=chapters).contains(c))
                .ok_or_else(|| {
                    ScriptureError::invalid_range(format!(
                        "{which} chapter {n} is outside 1..={chapters} for {}",
                        book.info().name
                    ))
                })
        };
        let verse = |n: i64, which: &str| -> Result<u16> {
            u16::try_from(n).ok().filter(|v| *v >= 1).ok_or_else(|| {
                ScriptureError::invalid_range(format!("{which} verse {n} must be positive"))
            })
        };

        let from = (
            chapter(self.from_chapter, "start")?,
            verse(self.from_verse, "start")?,
        );
        let to = (chapter(self.to_chapter, "end")?, verse(self.to_verse, "end")?);

        if from > to {
            return Err(ScriptureError::invalid_range(format!(
                "start {}:{} comes after end {}:{}",
                from.0, from.1, to.0, to.1
            )));
        }

        Ok(ValidRange { book, from, to })
    }
}

/// Run `range` against `store`. Verses absent from the store are skipped, not
/// synthesized; the result reports how many were skipped.
pub fn execute(store: &TranslationStore, range: &QueryRange) -> Result<RangeResult> {
    if range.translation_id != store.id() {
        return Err(ScriptureError::invalid_range(format!(
            "range targets translation '{}' but store holds '{}'",
            range.translation_id,
            store.id()
        )));
    }
    let valid = range.validate()?;
    Ok(execute_valid(store, valid))
}

pub(crate) fn execute_valid(store: &TranslationStore, range: ValidRange) -> RangeResult {
    let verses: Vec<Verse> = store
        .iter_range(range.book, range.from, range.to)
        .cloned()
        .collect();

    let mut expected: u32 = 0;
    let mut missing_chapters = Vec::new();
    for chapter in range.from.0..=range.to.0 {
        let Some(last) = store.last_verse(range.book, chapter) else {
            missing_chapters.push(chapter);
            continue;
        };
        let lo = if chapter == range.from.0 { range.from.1 } else { 1 };
        let hi = if chapter == range.to.0 {
            range.to.1.min(last)
        } else {
            last
        };
        if hi >= lo {
            expected += u32::from(hi - lo) + 1;
        }
    }
    let found = u32::try_from(verses.len()).unwrap_or(u32::MAX);

    RangeResult {
        translation_id: Arc::from(store.id()),
        book: range.book,
        verses,
        omitted: expected.saturating_sub(found),
        missing_chapters,
    }
}
