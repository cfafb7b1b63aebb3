//! Immutable, indexed verse collection for one translation.
//!
//! A store is built once from untrusted records and never mutated afterwards,
//! which is what lets the registry hand out `Arc<TranslationStore>` to any
//! number of readers without locking.

use std::collections::btree_map::{BTreeMap, Entry};
use std::sync::Arc;

use crate::canon::{self, BookNumber};
use crate::error::{Result, ScriptureError};
use crate::models::{TranslationInfo, Verse, VerseRecord, VerseRef};

/// Every verse of one translation, keyed and iterated in canonical order.
#[derive(Debug)]
pub struct TranslationStore {
    info: TranslationInfo,
    verses: BTreeMap<VerseRef, Verse>,
}

/// Per-chapter summary used by the inspection command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterSummary {
    pub chapter: u16,
    /// Verses present in the chapter.
    pub verses: usize,
    /// Highest verse number present, which bounds the expected count.
    pub last_verse: u16,
}

impl TranslationStore {
    /// Validate every record and index it by coordinate. Any invalid or
    /// duplicate record aborts the build; nothing is silently dropped.
    pub fn build(
        info: TranslationInfo,
        records: impl IntoIterator<Item = VerseRecord>,
    ) -> Result<Self> {
        let translation_id: Arc<str> = Arc::from(info.id.as_str());
        let mut verses = BTreeMap::new();

        for record in records {
            let reference = validate_record(&info.id, &record)?;
            match verses.entry(reference) {
                Entry::Occupied(_) => {
                    return Err(ScriptureError::DuplicateVerse {
                        translation: info.id.clone(),
                        book: reference.book.get(),
                        chapter: reference.chapter,
                        verse: reference.verse,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(Verse {
                        translation_id: Arc::clone(&translation_id),
                        reference,
                        text: record.text,
                    });
                }
            }
        }

        Ok(Self { info, verses })
    }

    /// Id and display name this store was built with.
    pub fn info(&self) -> &TranslationInfo {
        &self.info
    }

    /// Shorthand for `info().id`.
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Number of verses held.
    pub fn len(&self) -> usize {
        self.verses.len()
    }

    /// True for a translation with no verses at all.
    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    /// The verse at an exact coordinate, if this translation has it.
    pub fn lookup(&self, book: BookNumber, chapter: u16, verse: u16) -> Option<&Verse> {
        self.verses.get(&VerseRef::new(book, chapter, verse))
    }

    /// Verses of `book` from `from` to `to` inclusive, as `(chapter, verse)`
    /// pairs, in canonical order. The iterator borrows the store and can be
    /// cloned to replay the same sequence.
    pub fn iter_range(
        &self,
        book: BookNumber,
        from: (u16, u16),
        to: (u16, u16),
    ) -> impl Iterator<Item = &Verse> + Clone + '_ {
        let start = VerseRef::new(book, from.0, from.1);
        let end = VerseRef::new(book, to.0, to.1);
        // BTreeMap::range panics on an inverted range.
        let bounds = if start <= end { start..=end } else { end..=end };
        let skip_all = start > end;
        self.verses
            .range(bounds)
            .filter(move |_| !skip_all)
            .map(|(_, verse)| verse)
    }

    /// Highest verse number present for a chapter, or `None` if the store has
    /// nothing for it.
    pub fn last_verse(&self, book: BookNumber, chapter: u16) -> Option<u16> {
        self.verses
            .range(VerseRef::new(book, chapter, 0)..=VerseRef::new(book, chapter, u16::MAX))
            .next_back()
            .map(|(reference, _)| reference.verse)
    }

    /// Chapters of `book` that have at least one verse, in order.
    pub fn chapter_summaries(&self, book: BookNumber) -> Vec<ChapterSummary> {
        let mut summaries: Vec<ChapterSummary> = Vec::new();
        let range = VerseRef::new(book, 0, 0)..=VerseRef::new(book, u16::MAX, u16::MAX);
        for reference in self.verses.range(range).map(|(reference, _)| reference) {
            match summaries.last_mut() {
                Some(last) if last.chapter == reference.chapter => {
                    last.verses += 1;
                    last.last_verse = reference.verse;
                }
                _ => summaries.push(ChapterSummary {
                    chapter: reference.chapter,
                    verses: 1,
                    last_verse: reference.verse,
                }),
            }
        }
        summaries
    }

    /// Every verse in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Verse> + '_ {
        self.verses.values()
    }
}

fn validate_record(translation: &str, record: &VerseRecord) -> Result<VerseRef> {
    let book = BookNumber::new(record.book)?;
    let invalid = |reason| ScriptureError::InvalidVerse {
        translation: translation.to_string(),
        book: record.book,
        chapter: record.chapter,
        verse: record.verse,
        reason,
    };

    let max_chapter = canon::chapter_count(book);
    if record.chapter < 1 || record.chapter > i64::from(max_chapter) {
        return Err(invalid("chapter outside the book's canonical range"));
    }
    let verse = u16::try_from(record.verse)
        .ok()
        .filter(|verse| *verse >= 1)
        .ok_or_else(|| invalid("verse number must be a positive 16-bit integer"))?;

    Ok(VerseRef::new(book, record.chapter as u16, verse))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> TranslationInfo {
        TranslationInfo {
            id: "test".into(),
            display_name: "Test Translation".into(),
        }
    }

    fn record(book: i64, chapter: i64, verse: i64, text: &str) -> VerseRecord {
        VerseRecord {
            book,
            chapter,
            verse,
            text: text.into(),
        }
    }

    fn book(n: i64) -> BookNumber {
        BookNumber::new(n).unwrap()
    }

    #[test]
    fn point_lookup_returns_every_built_verse_unchanged() {
        let records = vec![
            record(43, 3, 16, "For God so loved the world"),
            record(1, 1, 1, "In the beginning"),
            record(43, 3, 17, "For God sent not his Son"),
            record(66, 22, 21, "The grace of our Lord"),
        ];
        let store = TranslationStore::build(info(), records.clone()).unwrap();
        assert_eq!(store.len(), records.len());

        for r in &records {
            let found = store
                .lookup(book(r.book), r.chapter as u16, r.verse as u16)
                .unwrap();
            assert_eq!(found.text, r.text);
            assert_eq!(i64::from(found.book().get()), r.book);
            assert_eq!(i64::from(found.chapter()), r.chapter);
            assert_eq!(i64::from(found.verse()), r.verse);
            assert_eq!(&*found.translation_id, "test");
        }
        assert!(store.lookup(book(43), 3, 18).is_none());
    }

    #[test]
    fn iteration_follows_canonical_order_regardless_of_input_order() {
        let store = TranslationStore::build(
            info(),
            vec![
                record(2, 1, 1, "b"),
                record(1, 2, 1, "a2"),
                record(1, 1, 10, "a1-10"),
                record(1, 1, 2, "a1-2"),
            ],
        )
        .unwrap();
        let order: Vec<&str> = store.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(order, ["a1-2", "a1-10", "a2", "b"]);
    }

    #[test]
    fn duplicate_coordinates_abort_the_build() {
        let err = TranslationStore::build(
            info(),
            vec![record(43, 3, 16, "first"), record(43, 3, 16, "second")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ScriptureError::DuplicateVerse {
                translation: "test".into(),
                book: 43,
                chapter: 3,
                verse: 16,
            }
        );
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn unknown_books_are_rejected() {
        let err = TranslationStore::build(info(), vec![record(67, 1, 1, "x")]).unwrap_err();
        assert_eq!(err, ScriptureError::UnknownBook(67));
    }

    #[test]
    fn chapters_are_checked_against_the_canon_but_verses_are_not_bounded() {
        let err = TranslationStore::build(info(), vec![record(43, 22, 1, "x")]).unwrap_err();
        assert!(matches!(err, ScriptureError::InvalidVerse { chapter: 22, .. }));

        let err = TranslationStore::build(info(), vec![record(43, 1, 0, "x")]).unwrap_err();
        assert!(matches!(err, ScriptureError::InvalidVerse { verse: 0, .. }));

        // Verse 900 of John 1 does not exist anywhere, but the canon does not
        // carry verse bounds, so the store accepts it.
        assert!(TranslationStore::build(info(), vec![record(43, 1, 900, "x")]).is_ok());
    }

    #[test]
    fn range_iteration_is_restartable() {
        let store = TranslationStore::build(
            info(),
            (1..=5).map(|v| record(43, 1, v, &format!("v{v}"))),
        )
        .unwrap();
        let iter = store.iter_range(book(43), (1, 2), (1, 4));
        let first: Vec<u16> = iter.clone().map(Verse::verse).collect();
        let second: Vec<u16> = iter.map(Verse::verse).collect();
        assert_eq!(first, [2, 3, 4]);
        assert_eq!(first, second);

        assert_eq!(store.iter_range(book(43), (1, 4), (1, 2)).count(), 0);
    }

    #[test]
    fn summaries_and_last_verse_reflect_the_data() {
        let store = TranslationStore::build(
            info(),
            vec![
                record(43, 1, 1, "a"),
                record(43, 1, 3, "b"),
                record(43, 3, 16, "c"),
            ],
        )
        .unwrap();
        assert_eq!(store.last_verse(book(43), 1), Some(3));
        assert_eq!(store.last_verse(book(43), 2), None);
        assert_eq!(
            store.chapter_summaries(book(43)),
            vec![
                ChapterSummary {
                    chapter: 1,
                    verses: 2,
                    last_verse: 3
                },
                ChapterSummary {
                    chapter: 3,
                    verses: 1,
                    last_verse: 16
                },
            ]
        );
        assert!(store.chapter_summaries(book(1)).is_empty());
    }
}
