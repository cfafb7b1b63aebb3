//! The only surface reachable from the untrusted rendering side.
//!
//! Exactly two operations exist: listing translations and fetching a verse
//! range. Requests are checked for shape, type, and bounds before anything
//! touches the registry, and responses carry translation ids, names, and
//! verse text only. Load failures are reported with a generic message; the
//! underlying cause, which may name files, goes to the log.

use std::io::{BufRead, Read, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ScriptureError;
use crate::models::{is_valid_translation_id, TranslationInfo, MAX_TRANSLATION_ID_LEN};
use crate::query::{self, QueryRange};
use crate::registry::TranslationRegistry;

/// Largest request accepted on the wire, excluding the line terminator.
pub const MAX_REQUEST_BYTES: usize = 4096;

const ENCODE_FAILURE: &str =
    r#"{"error":{"kind":"LoadError","message":"response could not be encoded"}}"#;

/// The fixed operation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    /// `{"op": "list_translations"}`; takes no arguments.
    ListTranslations,
    /// `{"op": "get_scripture", ...}` with the fields of [`ScriptureRequest`].
    GetScripture(ScriptureRequest),
}

/// Arguments of `get_scripture`. Integers are accepted at full `i64` width so
/// a too-large chapter is reported as a bad range rather than a type error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScriptureRequest {
    /// Must match `[A-Za-z0-9_-]{1,32}`.
    pub translation_id: String,
    /// Canonical book number, 1..=66.
    pub book: i64,
    pub from_chapter: i64,
    pub from_verse: i64,
    pub to_chapter: i64,
    /// Inclusive; may be past the chapter's last verse.
    pub to_verse: i64,
}

/// Error categories a bridge caller can see. Anything that went wrong inside
/// a load, including bad source data, is collapsed into `LoadError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Wrong shape, type, size, or encoding; never reaches the registry.
    InvalidRequest,
    TranslationNotFound,
    /// Book number outside the canon.
    UnknownBook,
    /// Inverted range or chapter/verse outside canonical bounds.
    InvalidRange,
    /// Loading failed; a later request retries.
    LoadError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeError {
    pub kind: ErrorKind,
    /// Human-readable detail. Never contains file-system paths.
    pub message: String,
}

impl BridgeError {
    fn invalid_request(message: impl Into<String>) -> Self {
        ScriptureError::InvalidRequest(message.into()).into()
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BridgeError {}

impl From<ScriptureError> for BridgeError {
    fn from(err: ScriptureError) -> Self {
        let kind = match &err {
            ScriptureError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ScriptureError::TranslationNotFound(_) => ErrorKind::TranslationNotFound,
            ScriptureError::UnknownBook(_) => ErrorKind::UnknownBook,
            ScriptureError::InvalidRange(_) => ErrorKind::InvalidRange,
            ScriptureError::Load { translation, .. }
            | ScriptureError::DuplicateVerse { translation, .. }
            | ScriptureError::InvalidVerse { translation, .. } => {
                warn!(
                    translation = %translation,
                    error = %err,
                    "load failure reported to bridge caller"
                );
                return Self {
                    kind: ErrorKind::LoadError,
                    message: format!("translation '{translation}' could not be loaded"),
                };
            }
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// One verse as it crosses the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseView {
    pub book: u8,
    pub chapter: u16,
    pub verse: u16,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptureResponse {
    pub translation_id: String,
    pub book: u8,
    /// Canonical book name, so the caller needs no copy of the canon.
    pub book_name: String,
    /// Found verses in canonical order. Empty is a valid answer.
    pub verses: Vec<VerseView>,
    /// Verses inside the range that this translation does not contain.
    pub omitted: u32,
    /// Chapters inside the range with no text at all in this translation.
    pub missing_chapters: Vec<u16>,
}

/// Payload of a successful response, one variant per operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BridgeReply {
    Translations(Vec<TranslationInfo>),
    Scripture(ScriptureResponse),
}

/// Wire envelope: `{"ok": ...}` or `{"error": {"kind", "message"}}`. An empty
/// verse list is an `ok`, never an `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeResponse {
    Ok(BridgeReply),
    Error(BridgeError),
}

impl BridgeResponse {
    /// Encode for the wire. Encoding these types cannot realistically fail,
    /// but if it does the caller still gets a well-formed error line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            warn!(error = %err, "failed to encode bridge response");
            ENCODE_FAILURE.to_string()
        })
    }
}

/// Parse a wire request. Unknown operations, unknown fields, wrongly typed
/// values, and oversized payloads are all `InvalidRequest`.
pub fn parse_request(raw: &str) -> Result<BridgeRequest, BridgeError> {
    if raw.len() > MAX_REQUEST_BYTES {
        return Err(BridgeError::invalid_request(format!(
            "request exceeds {MAX_REQUEST_BYTES} bytes"
        )));
    }
    let mut object: Map<String, Value> = serde_json::from_str(raw)
        .map_err(|err| BridgeError::invalid_request(format!("malformed request: {err}")))?;

    let op = match object.remove("op") {
        Some(Value::String(op)) => op,
        Some(_) => return Err(BridgeError::invalid_request("'op' must be a string")),
        None => return Err(BridgeError::invalid_request("missing 'op'")),
    };

    match op.as_str() {
        "list_translations" => {
            if let Some(field) = object.keys().next() {
                return Err(BridgeError::invalid_request(format!(
                    "list_translations takes no arguments, got '{field}'"
                )));
            }
            Ok(BridgeRequest::ListTranslations)
        }
        "get_scripture" => {
            let request: ScriptureRequest = serde_json::from_value(Value::Object(object))
                .map_err(|err| BridgeError::invalid_request(format!("bad get_scripture: {err}")))?;
            Ok(BridgeRequest::GetScripture(request))
        }
        other => Err(BridgeError::invalid_request(format!(
            "unsupported operation '{other}'"
        ))),
    }
}

/// Dispatches validated requests to the registry it was constructed with.
#[derive(Clone)]
pub struct Gateway {
    registry: Arc<TranslationRegistry>,
}

impl Gateway {
    /// The registry is shared, not owned, so the host process can keep
    /// installing or replacing translations behind the gateway.
    pub fn new(registry: Arc<TranslationRegistry>) -> Self {
        Self { registry }
    }

    /// Ids and display names only; no paths or handles.
    pub fn list_translations(&self) -> Vec<TranslationInfo> {
        self.registry.translations()
    }

    /// Validate `request`, load the translation if needed, and run the range.
    /// Id and coordinate checks happen first, so a bad request never
    /// triggers a load.
    pub fn get_scripture(
        &self,
        request: &ScriptureRequest,
    ) -> Result<ScriptureResponse, BridgeError> {
        if !is_valid_translation_id(&request.translation_id) {
            return Err(BridgeError::invalid_request(format!(
                "translationId must be 1..={MAX_TRANSLATION_ID_LEN} characters of [A-Za-z0-9_-]"
            )));
        }
        let range = QueryRange {
            translation_id: request.translation_id.clone(),
            book: request.book,
            from_chapter: request.from_chapter,
            from_verse: request.from_verse,
            to_chapter: request.to_chapter,
            to_verse: request.to_verse,
        };
        let valid = range.validate()?;
        let store = self.registry.get(&request.translation_id)?;
        let result = query::execute_valid(&store, valid);

        Ok(ScriptureResponse {
            translation_id: result.translation_id.to_string(),
            book: result.book.get(),
            book_name: result.book.info().name.to_string(),
            verses: result
                .verses
                .into_iter()
                .map(|verse| VerseView {
                    book: verse.book().get(),
                    chapter: verse.chapter(),
                    verse: verse.verse(),
                    text: verse.text,
                })
                .collect(),
            omitted: result.omitted,
            missing_chapters: result.missing_chapters,
        })
    }

    /// Dispatch an already-parsed request. Failures become an `error`
    /// envelope rather than a Rust error, since they are answers to the
    /// caller.
    pub fn handle(&self, request: BridgeRequest) -> BridgeResponse {
        let outcome = match request {
            BridgeRequest::ListTranslations => {
                Ok(BridgeReply::Translations(self.list_translations()))
            }
            BridgeRequest::GetScripture(request) => {
                self.get_scripture(&request).map(BridgeReply::Scripture)
            }
        };
        match outcome {
            Ok(reply) => BridgeResponse::Ok(reply),
            Err(err) => {
                debug!(kind = ?err.kind, message = %err.message, "bridge request failed");
                BridgeResponse::Error(err)
            }
        }
    }

    /// Full wire round: parse, dispatch, encode.
    pub fn handle_json(&self, raw: &str) -> String {
        let response = match parse_request(raw) {
            Ok(request) => self.handle(request),
            Err(err) => {
                debug!(message = %err.message, "rejected bridge request");
                BridgeResponse::Error(err)
            }
        };
        response.to_json()
    }
}

/// Answer newline-delimited requests from `reader` until end of input.
///
/// Each line is read through a `MAX_REQUEST_BYTES + 1` window, so a client
/// that never sends a newline cannot make the bridge buffer without bound.
/// Oversized lines are drained and rejected; lines that are not UTF-8 are
/// rejected. Both get an `InvalidRequest` reply and the loop carries on.
/// Only I/O failures on either stream end it.
pub fn serve_lines<R: BufRead, W: Write>(
    gateway: &Gateway,
    mut reader: R,
    mut writer: W,
) -> Result<()> {
    let window = MAX_REQUEST_BYTES as u64 + 1;
    let mut line = Vec::with_capacity(MAX_REQUEST_BYTES + 1);
    loop {
        line.clear();
        let read = (&mut reader)
            .take(window)
            .read_until(b'\n', &mut line)
            .context("failed to read request")?;
        if read == 0 {
            return Ok(());
        }

        let terminated = line.last() == Some(&b'\n');
        if terminated {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }

        let response = if !terminated && line.len() > MAX_REQUEST_BYTES {
            discard_line(&mut reader)?;
            debug!("rejected oversized bridge request");
            BridgeResponse::Error(BridgeError::invalid_request(format!(
                "request exceeds {MAX_REQUEST_BYTES} bytes"
            )))
            .to_json()
        } else {
            match std::str::from_utf8(&line) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => gateway.handle_json(text),
                Err(_) => {
                    debug!("rejected non-UTF-8 bridge request");
                    BridgeResponse::Error(BridgeError::invalid_request(
                        "request is not valid UTF-8",
                    ))
                    .to_json()
                }
            }
        };

        writeln!(writer, "{response}").context("failed to write response")?;
        writer.flush().context("failed to flush response")?;
    }
}

/// Skip input up to and including the next newline.
fn discard_line<R: BufRead>(reader: &mut R) -> Result<()> {
    loop {
        let (used, done) = {
            let buf = reader.fill_buf().context("failed to read request")?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|b| *b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (buf.len(), false),
            }
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_operations() {
        assert_eq!(
            parse_request(r#"{"op": "list_translations"}"#).unwrap(),
            BridgeRequest::ListTranslations
        );
        let parsed = parse_request(
            r#"{"op": "get_scripture", "translationId": "kjv", "book": 43,
                "fromChapter": 3, "fromVerse": 16, "toChapter": 3, "toVerse": 16}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            BridgeRequest::GetScripture(ScriptureRequest {
                translation_id: "kjv".into(),
                book: 43,
                from_chapter: 3,
                from_verse: 16,
                to_chapter: 3,
                to_verse: 16,
            })
        );
    }

    #[test]
    fn rejects_anything_outside_the_operation_set() {
        let cases = [
            "",
            "[]",
            r#"{"op": "read_file", "path": "/etc/passwd"}"#,
            r#"{"op": 7}"#,
            r#"{"translationId": "kjv"}"#,
            r#"{"op": "list_translations", "dir": "/"}"#,
            r#"{"op": "get_scripture", "translationId": "kjv", "book": "43",
                "fromChapter": 1, "fromVerse": 1, "toChapter": 1, "toVerse": 1}"#,
            r#"{"op": "get_scripture", "translationId": "kjv", "book": 43.5,
                "fromChapter": 1, "fromVerse": 1, "toChapter": 1, "toVerse": 1}"#,
            r#"{"op": "get_scripture", "translationId": "kjv", "book": 43,
                "fromChapter": 1, "fromVerse": 1, "toChapter": 1}"#,
            r#"{"op": "get_scripture", "translationId": "kjv", "book": 43, "sql": "x",
                "fromChapter": 1, "fromVerse": 1, "toChapter": 1, "toVerse": 1}"#,
        ];
        for raw in cases {
            let err = parse_request(raw).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidRequest, "{raw}");
            assert!(err.message.starts_with("invalid request: "), "{}", err.message);
        }

        let huge = format!(r#"{{"op": "list_translations", "pad": "{}"}}"#, "x".repeat(5000));
        assert_eq!(parse_request(&huge).unwrap_err().kind, ErrorKind::InvalidRequest);
    }

    #[test]
    fn load_failures_hide_their_cause() {
        let err = BridgeError::from(ScriptureError::Load {
            translation: "kjv".into(),
            message: "failed to load /home/me/.scripture-bridge/translations/kjv.sqlite".into(),
        });
        assert_eq!(err.kind, ErrorKind::LoadError);
        assert!(!err.message.contains('/'));

        let err = BridgeError::from(ScriptureError::DuplicateVerse {
            translation: "kjv".into(),
            book: 1,
            chapter: 1,
            verse: 1,
        });
        assert_eq!(err.kind, ErrorKind::LoadError);
    }

    #[test]
    fn envelope_shape() {
        let ok = serde_json::to_value(BridgeResponse::Ok(BridgeReply::Translations(vec![
            TranslationInfo {
                id: "kjv".into(),
                display_name: "King James Version".into(),
            },
        ])))
        .unwrap();
        assert_eq!(
            ok,
            serde_json::json!({"ok": [{"id": "kjv", "displayName": "King James Version"}]})
        );

        let err = serde_json::to_value(BridgeResponse::Error(BridgeError {
            kind: ErrorKind::InvalidRange,
            message: "m".into(),
        }))
        .unwrap();
        assert_eq!(
            err,
            serde_json::json!({"error": {"kind": "InvalidRange", "message": "m"}})
        );
    }
}
