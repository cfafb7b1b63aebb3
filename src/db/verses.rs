use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::connection::create_translation_db;
use crate::models::VerseRecord;
use crate::store::TranslationStore;

/// Suffix of the staging file an install writes before renaming it into place.
pub const STAGING_SUFFIX: &str = "partial";

/// Read every verse row. Rows are returned as raw records; ordering and
/// validation are the store builder's job, so the query does not sort.
pub fn fetch_verses(conn: &Connection) -> Result<Vec<VerseRecord>> {
    let mut stmt = conn
        .prepare("SELECT book, chapter, verse, text FROM verses")
        .context("failed to prepare verse query")?;

    let verses = stmt
        .query_map([], |row| {
            Ok(VerseRecord {
                book: row.get(0)?,
                chapter: row.get(1)?,
                verse: row.get(2)?,
                text: row.get(3)?,
            })
        })
        .context("failed to iterate verses")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect verses")?;

    Ok(verses)
}

/// Display name stored under the `name` metadata key. Databases produced by
/// other tools often have no metadata table at all, which is not an error.
pub fn fetch_display_name(conn: &Connection) -> Result<Option<String>> {
    let has_metadata: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'metadata')",
            [],
            |row| row.get(0),
        )
        .context("failed to inspect database schema")?;
    if !has_metadata {
        return Ok(None);
    }

    conn.query_row(
        "SELECT value FROM metadata WHERE key = 'name'",
        [],
        |row| row.get(0),
    )
    .optional()
    .context("failed to read translation name")
}

/// Persist a validated store into a freshly created database inside a single
/// transaction. Returns the number of verses written.
pub fn write_translation(conn: &mut Connection, store: &TranslationStore) -> Result<usize> {
    let tx = conn
        .transaction()
        .context("failed to start import transaction")?;

    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('name', ?1)",
        params![store.info().display_name],
    )
    .context("failed to write translation name")?;

    let mut written = 0;
    {
        let mut stmt = tx
            .prepare("INSERT INTO verses (book, chapter, verse, text) VALUES (?1, ?2, ?3, ?4)")
            .context("failed to prepare verse insert")?;
        for verse in store.iter() {
            stmt.execute(params![
                verse.book().get(),
                verse.chapter(),
                verse.verse(),
                verse.text
            ])
            .with_context(|| format!("failed to insert {}", verse.reference))?;
            written += 1;
        }
    }

    tx.commit().context("failed to commit import")?;
    Ok(written)
}

/// Install a validated store as a new database at `path`.
///
/// The database is built under a staging name next to `path` and only
/// renamed onto `path` once every verse is committed. A failed install
/// removes the staging file, so `path` either holds the whole translation
/// or does not exist and the import can simply be retried.
pub fn install_translation(path: &Path, store: &TranslationStore) -> Result<usize> {
    if path.exists() {
        bail!("translation database {} already exists", path.display());
    }
    let staging = staging_path(path);
    if staging.exists() {
        fs::remove_file(&staging).context("failed to remove stale staging file")?;
    }

    match write_staged(&staging, store) {
        Ok(written) => {
            fs::rename(&staging, path).context("failed to move translation into place")?;
            Ok(written)
        }
        Err(err) => {
            let _ = fs::remove_file(&staging);
            Err(err)
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

fn write_staged(staging: &Path, store: &TranslationStore) -> Result<usize> {
    let mut conn = create_translation_db(staging)?;
    let written = write_translation(&mut conn, store)?;
    conn.close()
        .map_err(|(_, err)| err)
        .context("failed to close staged database")?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_translation_db, open_translation_db};
    use crate::models::TranslationInfo;

    fn sample_store() -> TranslationStore {
        TranslationStore::build(
            TranslationInfo {
                id: "kjv".into(),
                display_name: "King James Version".into(),
            },
            vec![
                VerseRecord {
                    book: 1,
                    chapter: 1,
                    verse: 1,
                    text: "In the beginning God created the heaven and the earth.".into(),
                },
                VerseRecord {
                    book: 43,
                    chapter: 11,
                    verse: 35,
                    text: "Jesus wept.".into(),
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn written_translation_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kjv.sqlite");
        let store = sample_store();

        let mut conn = create_translation_db(&path).unwrap();
        assert_eq!(write_translation(&mut conn, &store).unwrap(), 2);
        drop(conn);

        let conn = open_translation_db(&path).unwrap();
        let mut records = fetch_verses(&conn).unwrap();
        records.sort_by_key(|r| (r.book, r.chapter, r.verse));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text, "Jesus wept.");
        assert_eq!(
            fetch_display_name(&conn).unwrap().as_deref(),
            Some("King James Version")
        );

        assert!(create_translation_db(&path).is_err());
    }

    #[test]
    fn missing_metadata_table_yields_no_name() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE verses (book INTEGER, chapter INTEGER, verse INTEGER, text TEXT)",
            [],
        )
        .unwrap();
        assert_eq!(fetch_display_name(&conn).unwrap(), None);
        assert!(fetch_verses(&conn).unwrap().is_empty());
    }

    #[test]
    fn install_leaves_only_the_finished_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kjv.sqlite");

        assert_eq!(install_translation(&path, &sample_store()).unwrap(), 2);
        assert!(!staging_path(&path).exists());

        let conn = open_translation_db(&path).unwrap();
        assert_eq!(fetch_verses(&conn).unwrap().len(), 2);
        drop(conn);

        assert!(install_translation(&path, &sample_store()).is_err());
    }

    #[test]
    fn failed_install_leaves_nothing_behind_and_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kjv.sqlite");
        let staging = staging_path(&path);
        // A directory in the staging spot makes the install fail.
        fs::create_dir(&staging).unwrap();

        assert!(install_translation(&path, &sample_store()).is_err());
        assert!(!path.exists());

        fs::remove_dir(&staging).unwrap();
        assert_eq!(install_translation(&path, &sample_store()).unwrap(), 2);
        assert!(path.exists());
        assert!(!staging.exists());
    }

    #[test]
    fn stale_staging_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kjv.sqlite");
        fs::write(staging_path(&path), b"half an import").unwrap();

        assert_eq!(install_translation(&path, &sample_store()).unwrap(), 2);
        assert!(!staging_path(&path).exists());
    }
}
