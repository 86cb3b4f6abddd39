//! File rows for the Canon store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::{row_to_file, Store, FILES_COLUMNS};
use crate::error::Result;
use crate::types::{FileId, SourceFile};

/// Normalize a file path to use forward slashes for consistent DB storage.
///
/// On Windows, `Path::to_string_lossy()` preserves backslashes from OS APIs,
/// but tests and cross-platform code use forward slashes. Normalizing to `/`
/// ensures lookups match regardless of how the path was constructed.
pub(crate) fn normalize_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Look up a file row by logical path.
pub(crate) fn find_file(conn: &Connection, path: &str) -> rusqlite::Result<Option<SourceFile>> {
    conn.query_row(
        &format!("SELECT {FILES_COLUMNS} FROM files WHERE path = ?1"),
        [path],
        row_to_file,
    )
    .optional()
}

/// Create the file row for a first ingestion.
pub(crate) fn insert_file(
    conn: &Connection,
    path: &str,
    raw_hash: &str,
    tree_hash: &str,
    size_bytes: u64,
    now: i64,
) -> rusqlite::Result<FileId> {
    conn.execute(
        "INSERT INTO files (path, raw_hash, tree_hash, size_bytes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![path, raw_hash, tree_hash, size_bytes as i64, now],
    )?;
    Ok(FileId::from(conn.last_insert_rowid()))
}

/// Point the file row at its latest version's hashes.
pub(crate) fn update_file_hashes(
    conn: &Connection,
    file_id: FileId,
    raw_hash: &str,
    tree_hash: &str,
    size_bytes: u64,
    now: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE files SET raw_hash = ?2, tree_hash = ?3, size_bytes = ?4, updated_at = ?5
         WHERE id = ?1",
        params![file_id.as_i64(), raw_hash, tree_hash, size_bytes as i64, now],
    )?;
    Ok(())
}

impl Store {
    /// Get a file by logical path.
    pub fn get_file(&self, path: &Path) -> Result<Option<SourceFile>> {
        let path_str = normalize_path(path);
        let conn = self.connection()?;

        find_file(&conn, &path_str).map_err(Into::into)
    }

    /// Get a file by its database ID.
    pub fn get_file_by_id(&self, id: FileId) -> Result<Option<SourceFile>> {
        let conn = self.connection()?;

        conn.query_row(
            &format!("SELECT {FILES_COLUMNS} FROM files WHERE id = ?1"),
            [id.as_i64()],
            row_to_file,
        )
        .optional()
        .map_err(Into::into)
    }

    /// List all tracked files, ordered by path.
    pub fn list_files(&self) -> Result<Vec<SourceFile>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!("SELECT {FILES_COLUMNS} FROM files ORDER BY path"))?;
        let files = stmt
            .query_map([], row_to_file)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find_by_path_and_id() {
        let store = Store::open_in_memory().expect("store");
        let id = {
            let conn = store.connection().expect("conn");
            insert_file(&conn, "pkg/a.py", "r1", "t1", 12, 1_000).expect("insert")
        };

        let by_path = store
            .get_file(Path::new("pkg/a.py"))
            .expect("query")
            .expect("file exists");
        let by_id = store.get_file_by_id(id).expect("query").expect("file exists");

        assert_eq!(by_path, by_id);
        assert_eq!(by_path.size_bytes, 12);
        assert_eq!(by_path.created_at, by_path.updated_at);
    }

    #[test]
    fn update_keeps_id_and_creation_time() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.connection().expect("conn");
        let id = insert_file(&conn, "a.py", "r1", "t1", 1, 1_000).expect("insert");

        update_file_hashes(&conn, id, "r2", "t2", 2, 2_000).expect("update");
        let file = find_file(&conn, "a.py").expect("query").expect("file exists");

        assert_eq!(file.id, id);
        assert_eq!(file.raw_hash, "r2");
        assert_eq!(file.created_at, 1_000);
        assert_eq!(file.updated_at, 2_000);
    }

    #[test]
    fn unknown_path_is_none() {
        let store = Store::open_in_memory().expect("store");

        assert!(store.get_file(Path::new("missing.py")).expect("query").is_none());
        assert!(store.list_files().expect("query").is_empty());
    }
}
