//! File version ledger.
//!
//! Versions are numbered per file from 1. Numbers are assigned inside the
//! ingestion's immediate transaction, so two writers can never both see the
//! same maximum.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::files::normalize_path;
use super::{row_to_version, Store, VERSIONS_COLUMNS};
use crate::error::Result;
use crate::types::{FileId, FileVersion, VersionId};

/// Header values for a new version row.
#[derive(Debug, Clone)]
pub(crate) struct NewVersion<'a> {
    pub file_id: FileId,
    pub version_number: u32,
    pub previous_version_id: Option<VersionId>,
    pub raw_hash: &'a str,
    pub tree_hash: &'a str,
    pub size_bytes: u64,
    pub component_count: usize,
    pub change_summary: &'a str,
    pub created_at: i64,
}

/// Latest version of a file.
pub(crate) fn latest_version(
    conn: &Connection,
    file_id: FileId,
) -> rusqlite::Result<Option<FileVersion>> {
    conn.query_row(
        &format!(
            "SELECT {VERSIONS_COLUMNS} FROM file_versions WHERE file_id = ?1
             ORDER BY version_number DESC LIMIT 1"
        ),
        [file_id.as_i64()],
        row_to_version,
    )
    .optional()
}

/// A specific version of a file.
pub(crate) fn version_by_number(
    conn: &Connection,
    file_id: FileId,
    version_number: u32,
) -> rusqlite::Result<Option<FileVersion>> {
    conn.query_row(
        &format!(
            "SELECT {VERSIONS_COLUMNS} FROM file_versions
             WHERE file_id = ?1 AND version_number = ?2"
        ),
        params![file_id.as_i64(), version_number],
        row_to_version,
    )
    .optional()
}

/// Append a version row.
pub(crate) fn insert_version(
    conn: &Connection,
    version: &NewVersion<'_>,
) -> rusqlite::Result<VersionId> {
    conn.execute(
        "INSERT INTO file_versions (file_id, version_number, previous_version_id, raw_hash,
             tree_hash, size_bytes, component_count, change_summary, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            version.file_id.as_i64(),
            version.version_number,
            version.previous_version_id.map(VersionId::as_i64),
            version.raw_hash,
            version.tree_hash,
            version.size_bytes as i64,
            version.component_count,
            version.change_summary,
            version.created_at,
        ],
    )?;
    Ok(VersionId::from(conn.last_insert_rowid()))
}

impl Store {
    /// All versions of a file, oldest first. Empty for an unknown path.
    pub fn list_versions(&self, path: &Path) -> Result<Vec<FileVersion>> {
        let path_str = normalize_path(path);
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSIONS_COLUMNS} FROM file_versions
             WHERE file_id = (SELECT id FROM files WHERE path = ?1)
             ORDER BY version_number"
        ))?;
        let versions = stmt
            .query_map([&path_str], row_to_version)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(versions)
    }

    /// A version of a file by number, or the latest when `version_number` is `None`.
    pub fn get_version(
        &self,
        file_id: FileId,
        version_number: Option<u32>,
    ) -> Result<Option<FileVersion>> {
        let conn = self.connection()?;

        let version = match version_number {
            Some(n) => version_by_number(&conn, file_id, n)?,
            None => latest_version(&conn, file_id)?,
        };
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::files::insert_file;

    fn new_version(
        file_id: FileId,
        number: u32,
        previous: Option<VersionId>,
    ) -> NewVersion<'static> {
        NewVersion {
            file_id,
            version_number: number,
            previous_version_id: previous,
            raw_hash: "r",
            tree_hash: "t",
            size_bytes: 1,
            component_count: 0,
            change_summary: "",
            created_at: i64::from(number),
        }
    }

    #[test]
    fn latest_version_follows_version_number() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.connection().expect("conn");
        let file_id = insert_file(&conn, "a.py", "r", "t", 1, 0).expect("file");

        let v1 = insert_version(&conn, &new_version(file_id, 1, None)).expect("v1");
        let v2 = insert_version(&conn, &new_version(file_id, 2, Some(v1))).expect("v2");

        let latest = latest_version(&conn, file_id).expect("query").expect("exists");
        assert_eq!(latest.id, v2);
        assert_eq!(latest.previous_version_id, Some(v1));
        assert_eq!(
            version_by_number(&conn, file_id, 1).expect("query").map(|v| v.id),
            Some(v1)
        );
    }

    #[test]
    fn version_numbers_are_unique_per_file() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.connection().expect("conn");
        let file_id = insert_file(&conn, "a.py", "r", "t", 1, 0).expect("file");

        insert_version(&conn, &new_version(file_id, 1, None)).expect("v1");
        let duplicate = insert_version(&conn, &new_version(file_id, 1, None));

        assert!(duplicate.is_err());
    }

    #[test]
    fn versions_reject_updates_and_deletes() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.connection().expect("conn");
        let file_id = insert_file(&conn, "a.py", "r", "t", 1, 0).expect("file");
        insert_version(&conn, &new_version(file_id, 1, None)).expect("v1");

        let update = conn.execute("UPDATE file_versions SET change_summary = 'x'", []);
        let delete = conn.execute("DELETE FROM file_versions", []);

        assert!(update.is_err(), "update should be aborted by trigger");
        assert!(delete.is_err(), "delete should be aborted by trigger");
    }
}
