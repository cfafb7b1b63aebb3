//! Where translations come from. The registry only sees the
//! [`TranslationSource`] trait; file locations stay behind it and never reach
//! the bridge.

mod json;

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::db::{fetch_display_name, fetch_verses, open_translation_db};
use crate::models::{is_valid_translation_id, TranslationData, TranslationInfo};

pub use json::{parse_translation, read_display_name, read_translation};

/// Extension for SQLite translation databases.
pub const SQLITE_EXTENSION: &str = "sqlite";
/// Extension for JSON verse lists.
pub const JSON_EXTENSION: &str = "json";

/// Loader used by the registry. `load` returns `Ok(None)` when the source has
/// no translation with that id, and `Err` when it has one but could not read
/// it.
pub trait TranslationSource: Send + Sync {
    fn available(&self) -> Result<Vec<TranslationInfo>>;

    fn load(&self, id: &str) -> Result<Option<TranslationData>>;
}

/// Translations stored as `<id>.sqlite` or `<id>.json` files in one directory.
/// When both exist for an id, the SQLite database wins.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path an import for `id` should write to.
    pub fn sqlite_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_translation_id(id) {
            bail!("'{id}' is not a valid translation id");
        }
        Ok(self.dir.join(format!("{id}.{SQLITE_EXTENSION}")))
    }

    fn locate(&self, id: &str) -> Option<(PathBuf, &'static str)> {
        [SQLITE_EXTENSION, JSON_EXTENSION]
            .into_iter()
            .map(|ext| (self.dir.join(format!("{id}.{ext}")), ext))
            .find(|(path, _)| path.is_file())
    }

    fn load_sqlite(&self, id: &str, path: &Path) -> Result<TranslationData> {
        let conn = open_translation_db(path)?;
        let display_name = fetch_display_name(&conn)?.unwrap_or_else(|| id.to_string());
        let records = fetch_verses(&conn)?;
        Ok(TranslationData {
            info: TranslationInfo {
                id: id.to_string(),
                display_name,
            },
            records,
        })
    }
}

impl TranslationSource for DirectorySource {
    /// List translations without loading their verses. Each entry carries
    /// the same name a load would produce: the stored name for SQLite
    /// databases, the document `name` for JSON files, otherwise the id.
    /// Files that cannot be read are logged and left out.
    fn available(&self) -> Result<Vec<TranslationInfo>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(dir = %self.dir.display(), "data directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err).context("failed to read data directory"),
        };

        let mut found: BTreeMap<String, TranslationInfo> = BTreeMap::new();
        for entry in entries {
            let path = entry.context("failed to read data directory entry")?.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            if !is_valid_translation_id(stem) {
                continue;
            }

            let name = match ext {
                SQLITE_EXTENSION => {
                    open_translation_db(&path).and_then(|conn| fetch_display_name(&conn))
                }
                JSON_EXTENSION if !found.contains_key(stem) => read_display_name(&path),
                _ => continue,
            };
            let display_name = match name {
                Ok(name) => name,
                Err(err) => {
                    warn!(
                        translation = stem,
                        error = %format!("{err:#}"),
                        "unreadable translation file"
                    );
                    continue;
                }
            };

            found.insert(
                stem.to_string(),
                TranslationInfo {
                    id: stem.to_string(),
                    display_name: display_name.unwrap_or_else(|| stem.to_string()),
                },
            );
        }

        Ok(found.into_values().collect())
    }

    fn load(&self, id: &str) -> Result<Option<TranslationData>> {
        if !is_valid_translation_id(id) {
            return Ok(None);
        }
        let Some((path, ext)) = self.locate(id) else {
            return Ok(None);
        };
        debug!(translation = id, format = ext, "reading translation");

        let data = if ext == SQLITE_EXTENSION {
            self.load_sqlite(id, &path)
        } else {
            read_translation(id, &path)
        }
        .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(Some(data))
    }
}

/// In-memory source, for embedding fixed data and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    translations: BTreeMap<String, TranslationData>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translation, replacing any with the same id.
    pub fn with(mut self, data: TranslationData) -> Self {
        self.translations.insert(data.info.id.clone(), data);
        self
    }
}

impl TranslationSource for MemorySource {
    fn available(&self) -> Result<Vec<TranslationInfo>> {
        Ok(self
            .translations
            .values()
            .map(|data| data.info.clone())
            .collect())
    }

    fn load(&self, id: &str) -> Result<Option<TranslationData>> {
        Ok(self.translations.get(id).cloned())
    }
}
