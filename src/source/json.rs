use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::{TranslationData, TranslationInfo, VerseRecord};

/// Accepted JSON layouts: a bare list of verse records, or a document that
/// also names the translation.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonTranslation {
    Bare(Vec<VerseRecord>),
    Document(JsonDocument),
}

#[derive(Debug, Deserialize)]
struct JsonDocument {
    #[serde(default, alias = "displayName")]
    name: Option<String>,
    verses: Vec<VerseRecord>,
}

/// Just the name of a JSON document; the verse list is skipped unparsed.
#[derive(Debug, Deserialize)]
struct JsonHeader {
    #[serde(default, alias = "displayName")]
    name: Option<String>,
}

fn usable_name(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.trim().is_empty())
}

/// Parse translation JSON. The display name falls back to the id when the
/// document does not carry one.
pub fn parse_translation(id: &str, json: &str) -> Result<TranslationData> {
    let parsed: JsonTranslation =
        serde_json::from_str(json).context("translation JSON is not a verse list")?;
    let (name, records) = match parsed {
        JsonTranslation::Bare(records) => (None, records),
        JsonTranslation::Document(doc) => (doc.name, doc.verses),
    };
    Ok(TranslationData {
        info: TranslationInfo {
            id: id.to_string(),
            display_name: usable_name(name).unwrap_or_else(|| id.to_string()),
        },
        records,
    })
}

pub fn read_translation(id: &str, path: &Path) -> Result<TranslationData> {
    let json = fs::read_to_string(path).context("failed to read translation JSON")?;
    parse_translation(id, &json)
}

/// Read only the display name of a translation file, streaming past the
/// verses without collecting them. A bare verse list has no name.
pub fn read_display_name(path: &Path) -> Result<Option<String>> {
    let file = File::open(path).context("failed to open translation JSON")?;
    let mut reader = BufReader::new(file);
    if first_significant_byte(&mut reader)? != Some(b'{') {
        return Ok(None);
    }
    let header: JsonHeader =
        serde_json::from_reader(reader).context("translation JSON is not a verse list")?;
    Ok(usable_name(header.name))
}

fn first_significant_byte<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    loop {
        let buf = reader.fill_buf().context("failed to read translation JSON")?;
        if buf.is_empty() {
            return Ok(None);
        }
        if let Some(&byte) = buf.iter().find(|b| !b.is_ascii_whitespace()) {
            return Ok(Some(byte));
        }
        let len = buf.len();
        reader.consume(len);
    }
}
