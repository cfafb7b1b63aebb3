use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};

/// Open an existing translation database for loading. The connection is
/// read-only so a load can never modify the file it reads from.
pub fn open_translation_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .context("failed to open translation database")?;
    Ok(conn)
}

/// Create a fresh translation database at `path` with the verse and metadata
/// tables. Refuses to overwrite an existing file so an import cannot clobber
/// a translation that is already installed.
pub fn create_translation_db(path: &Path) -> Result<Connection> {
    if path.exists() {
        bail!("translation database {} already exists", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to create translation database")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS verses (
            book INTEGER NOT NULL,
            chapter INTEGER NOT NULL,
            verse INTEGER NOT NULL,
            text TEXT NOT NULL,
            PRIMARY KEY (book, chapter, verse)
        )",
        [],
    )
    .context("failed to create verses table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create metadata table")?;

    Ok(conn)
}
