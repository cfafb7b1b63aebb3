use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".scripture-bridge";
/// Sub-folder holding `<id>.sqlite` and `<id>.json` translation files.
const TRANSLATIONS_DIR_NAME: &str = "translations";

/// Environment variable that overrides the translation directory.
pub const DATA_DIR_ENV: &str = "SCRIPTURE_DATA_DIR";
/// Environment variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "SCRIPTURE_LOG";
/// Filter used when `SCRIPTURE_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory: explicit flag, then `SCRIPTURE_DATA_DIR`,
    /// then `~/.scripture-bridge/translations`.
    pub fn resolve(flag: Option<PathBuf>) -> Result<Self> {
        Self::from_sources(flag, std::env::var_os(DATA_DIR_ENV))
    }

    fn from_sources(flag: Option<PathBuf>, env: Option<OsString>) -> Result<Self> {
        let data_dir = match (flag, env) {
            (Some(dir), _) => dir,
            (None, Some(dir)) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_data_dir()?,
        };
        Ok(Self { data_dir })
    }
}

fn default_data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs
        .home_dir()
        .join(DATA_DIR_NAME)
        .join(TRANSLATIONS_DIR_NAME))
}
