//! Canonical book table: the fixed numbering, names, and chapter counts that
//! every translation is validated against. The table ships with the crate and
//! is never derived from loaded data, so a translation that is missing verses
//! cannot change how many chapters a book has.

use crate::error::{Result, ScriptureError};

/// Number of books in the canonical index.
pub const BOOK_COUNT: u8 = 66;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Testament {
    Old,
    New,
}

/// Static metadata for one canonical book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookInfo {
    pub number: BookNumber,
    pub name: &'static str,
    pub abbreviation: &'static str,
    pub chapter_count: u16,
    pub testament: Testament,
}

/// A book number that is known to exist in the canonical index. The only way
/// to obtain one outside this module is through [`BookNumber::new`], so a
/// `BookNumber` in hand always resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookNumber(u8);

impl BookNumber {
    /// Accepts 1..=66; anything else is `UnknownBook`.
    pub fn new(n: i64) -> Result<Self> {
        if (1..=i64::from(BOOK_COUNT)).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(ScriptureError::UnknownBook(n))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Canonical metadata for this book.
    pub fn info(self) -> &'static BookInfo {
        &BOOKS[usize::from(self.0) - 1]
    }
}

impl std::fmt::Display for BookNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve a raw book number to its canonical metadata.
pub fn resolve_book(n: i64) -> Result<&'static BookInfo> {
    BookNumber::new(n).map(BookNumber::info)
}

/// Chapter count for a canonical book.
pub fn chapter_count(book: BookNumber) -> u16 {
    book.info().chapter_count
}

/// Every book in canonical order.
pub fn books() -> impl Iterator<Item = &'static BookInfo> {
    BOOKS.iter()
}

/// Look a book up by full name or abbreviation, ignoring case and spaces so
/// "1 John" and "1john" both match.
pub fn find_book(name: &str) -> Option<&'static BookInfo> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }
    BOOKS
        .iter()
        .find(|book| normalize(book.name) == wanted || normalize(book.abbreviation) == wanted)
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! canon {
    ($($number:literal $name:literal $abbr:literal $chapters:literal $testament:ident;)*) => {
        [$(BookInfo {
            number: BookNumber($number),
            name: $name,
            abbreviation: $abbr,
            chapter_count: $chapters,
            testament: Testament::$testament,
        },)*]
    };
}

static BOOKS: [BookInfo; BOOK_COUNT as usize] = canon! {
    1 "Genesis" "Gen" 50 Old;
    2 "Exodus" "Exod" 40 Old;
    3 "Leviticus" "Lev" 27 Old;
    4 "Numbers" "Num" 36 Old;
    5 "Deuteronomy" "Deut" 34 Old;
    6 "Joshua" "Josh" 24 Old;
    7 "Judges" "Judg" 21 Old;
    8 "Ruth" "Ruth" 4 Old;
    9 "1 Samuel" "1Sam" 31 Old;
    10 "2 Samuel" "2Sam" 24 Old;
    11 "1 Kings" "1Kgs" 22 Old;
    12 "2 Kings" "2Kgs" 25 Old;
    13 "1 Chronicles" "1Chr" 29 Old;
    14 "2 Chronicles" "2Chr" 36 Old;
    15 "Ezra" "Ezra" 10 Old;
    16 "Nehemiah" "Neh" 13 Old;
    17 "Esther" "Esth" 10 Old;
    18 "Job" "Job" 42 Old;
    19 "Psalms" "Ps" 150 Old;
    20 "Proverbs" "Prov" 31 Old;
    21 "Ecclesiastes" "Eccl" 12 Old;
    22 "Song of Solomon" "Song" 8 Old;
    23 "Isaiah" "Isa" 66 Old;
    24 "Jeremiah" "Jer" 52 Old;
    25 "Lamentations" "Lam" 5 Old;
    26 "Ezekiel" "Ezek" 48 Old;
    27 "Daniel" "Dan" 12 Old;
    28 "Hosea" "Hos" 14 Old;
    29 "Joel" "Joel" 3 Old;
    30 "Amos" "Amos" 9 Old;
    31 "Obadiah" "Obad" 1 Old;
    32 "Jonah" "Jonah" 4 Old;
    33 "Micah" "Mic" 7 Old;
    34 "Nahum" "Nah" 3 Old;
    35 "Habakkuk" "Hab" 3 Old;
    36 "Zephaniah" "Zeph" 3 Old;
    37 "Haggai" "Hag" 2 Old;
    38 "Zechariah" "Zech" 14 Old;
    39 "Malachi" "Mal" 4 Old;
    40 "Matthew" "Matt" 28 New;
    41 "Mark" "Mark" 16 New;
    42 "Luke" "Luke" 24 New;
    43 "John" "John" 21 New;
    44 "Acts" "Acts" 28 New;
    45 "Romans" "Rom" 16 New;
    46 "1 Corinthians" "1Cor" 16 New;
    47 "2 Corinthians" "2Cor" 13 New;
    48 "Galatians" "Gal" 6 New;
    49 "Ephesians" "Eph" 6 New;
    50 "Philippians" "Phil" 4 New;
    51 "Colossians" "Col" 4 New;
    52 "1 Thessalonians" "1Thess" 5 New;
    53 "2 Thessalonians" "2Thess" 3 New;
    54 "1 Timothy" "1Tim" 6 New;
    55 "2 Timothy" "2Tim" 4 New;
    56 "Titus" "Titus" 3 New;
    57 "Philemon" "Phlm" 1 New;
    58 "Hebrews" "Heb" 13 New;
    59 "James" "Jas" 5 New;
    60 "1 Peter" "1Pet" 5 New;
    61 "2 Peter" "2Pet" 3 New;
    62 "1 John" "1John" 5 New;
    63 "2 John" "2John" 1 New;
    64 "3 John" "3John" 1 New;
    65 "Jude" "Jude" 1 New;
    66 "Revelation" "Rev" 22 New;
};
