//! Equivalence proof ledger.

use rusqlite::{params, Connection};

use super::helpers::{row_to_proof, PROOFS_COLUMNS};
use super::Store;
use crate::error::Result;
use crate::types::{EquivalenceProof, FileId, VerifyStatus, VersionId};

/// Values of one proof row.
#[derive(Debug, Clone)]
pub(crate) struct NewProof<'a> {
    pub file_id: FileId,
    pub version_id: VersionId,
    pub original_raw_hash: &'a str,
    pub rebuilt_raw_hash: &'a str,
    pub original_tree_hash: &'a str,
    pub rebuilt_tree_hash: Option<&'a str>,
    pub status: VerifyStatus,
    pub verified_at: i64,
}

/// Append a proof. Returns its row id.
pub(crate) fn insert_proof(conn: &Connection, proof: &NewProof<'_>) -> rusqlite::Result<i64> {
    let raw_match = proof.original_raw_hash == proof.rebuilt_raw_hash;
    let tree_match = proof.rebuilt_tree_hash == Some(proof.original_tree_hash);

    conn.execute(
        "INSERT INTO equivalence_proofs (file_id, version_id, original_raw_hash, rebuilt_raw_hash,
             original_tree_hash, rebuilt_tree_hash, raw_match, tree_match, matched, status,
             mismatch, verified_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            proof.file_id.as_i64(),
            proof.version_id.as_i64(),
            proof.original_raw_hash,
            proof.rebuilt_raw_hash,
            proof.original_tree_hash,
            proof.rebuilt_tree_hash,
            raw_match,
            tree_match,
            proof.status == VerifyStatus::Pass,
            proof.status.as_str(),
            proof.status.mismatch(),
            proof.verified_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Store {
    /// Append a proof under the connection lock.
    pub(crate) fn record_proof(&self, proof: &NewProof<'_>) -> Result<i64> {
        let conn = self.connection()?;
        let id = insert_proof(&conn, proof)?;
        tracing::trace!(proof_id = id, status = %proof.status, "Recorded equivalence proof");
        Ok(id)
    }

    /// Proofs recorded for a file, oldest first.
    pub fn list_proofs(&self, file_id: FileId) -> Result<Vec<EquivalenceProof>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {PROOFS_COLUMNS} FROM equivalence_proofs WHERE file_id = ?1 ORDER BY id"
        ))?;
        let proofs = stmt
            .query_map([file_id.as_i64()], row_to_proof)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(proofs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::files::insert_file;
    use crate::db::versions::{insert_version, NewVersion};

    fn seeded() -> (Store, FileId, VersionId) {
        let store = Store::open_in_memory().expect("store");
        let (file_id, version_id) = {
            let conn = store.connection().expect("conn");
            let file_id = insert_file(&conn, "a.py", "raw", "tree", 3, 0).expect("file");
            let version_id = insert_version(
                &conn,
                &NewVersion {
                    file_id,
                    version_number: 1,
                    previous_version_id: None,
                    raw_hash: "raw",
                    tree_hash: "tree",
                    size_bytes: 3,
                    component_count: 0,
                    change_summary: "",
                    created_at: 0,
                },
            )
            .expect("version");
            (file_id, version_id)
        };
        (store, file_id, version_id)
    }

    #[test]
    fn proofs_record_status_and_mismatch() {
        let (store, file_id, version_id) = seeded();
        {
            let conn = store.connection().expect("conn");
            insert_proof(
                &conn,
                &NewProof {
                    file_id,
                    version_id,
                    original_raw_hash: "raw",
                    rebuilt_raw_hash: "raw",
                    original_tree_hash: "tree",
                    rebuilt_tree_hash: Some("tree"),
                    status: VerifyStatus::Pass,
                    verified_at: 1,
                },
            )
            .expect("pass proof");
            insert_proof(
                &conn,
                &NewProof {
                    file_id,
                    version_id,
                    original_raw_hash: "raw",
                    rebuilt_raw_hash: "other",
                    original_tree_hash: "tree",
                    rebuilt_tree_hash: None,
                    status: VerifyStatus::StructuralDrift,
                    verified_at: 2,
                },
            )
            .expect("drift proof");
        }

        let proofs = store.list_proofs(file_id).expect("list");

        assert_eq!(proofs.len(), 2);
        assert!(proofs[0].matched);
        assert_eq!(proofs[0].status, VerifyStatus::Pass);
        assert!(!proofs[1].matched);
        assert!(!proofs[1].raw_match);
        assert!(!proofs[1].tree_match);
        assert_eq!(proofs[1].rebuilt_tree_hash, None);
        assert_eq!(proofs[1].status, VerifyStatus::StructuralDrift);
    }

    #[test]
    fn proofs_are_append_only() {
        let (store, file_id, version_id) = seeded();
        let conn = store.connection().expect("conn");
        insert_proof(
            &conn,
            &NewProof {
                file_id,
                version_id,
                original_raw_hash: "raw",
                rebuilt_raw_hash: "raw",
                original_tree_hash: "tree",
                rebuilt_tree_hash: Some("tree"),
                status: VerifyStatus::Pass,
                verified_at: 1,
            },
        )
        .expect("proof");

        assert!(conn
            .execute("UPDATE equivalence_proofs SET matched = 0", [])
            .is_err());
        assert!(conn.execute("DELETE FROM equivalence_proofs", []).is_err());
    }
}
