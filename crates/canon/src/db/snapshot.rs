//! Atomic ingestion of a staged extraction.
//!
//! Everything an ingestion writes happens inside one immediate transaction:
//! the version row, the snapshot (components, segments, facts, history) and
//! the drift events. A failure anywhere rolls all of it back, so the previous
//! version stays the current one.

use rusqlite::TransactionBehavior;

use super::components::{identity_table, insert_component, insert_history};
use super::drift::{insert_drift_events, load_facts};
use super::files::{find_file, insert_file, normalize_path, update_file_hashes};
use super::symbols::insert_facts;
use super::versions::{insert_version, latest_version, NewVersion};
use super::Store;
use crate::drift::{self, DriftReport};
use crate::error::{Error, Result};
use crate::extract::Extraction;
use crate::identity::{self, IdentityTable};
use crate::types::{ComponentId, IngestReport};

/// Outcome of writing one snapshot.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotWrite {
    pub report: IngestReport,
    pub drift: DriftReport,
}

impl Store {
    /// Persist a staged extraction as the next version of its file.
    pub(crate) fn write_snapshot(&self, extraction: &Extraction) -> Result<SnapshotWrite> {
        let path = normalize_path(&extraction.path);
        let now = Self::now_ns()?;

        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (file_id, previous) = match find_file(&tx, &path)? {
            Some(file) => (file.id, latest_version(&tx, file.id)?),
            None => (
                insert_file(
                    &tx,
                    &path,
                    &extraction.raw_hash,
                    &extraction.tree_hash,
                    extraction.size_bytes,
                    now,
                )?,
                None,
            ),
        };
        let version_number = previous.as_ref().map_or(1, |v| v.version_number + 1);

        let (committed, old_facts) = match &previous {
            Some(v) => (identity_table(&tx, v.id)?, load_facts(&tx, v.id)?),
            None => (IdentityTable::new(), Vec::new()),
        };
        tracing::debug!(
            path = %path,
            version = version_number,
            previous_components = committed.len(),
            "Loaded previous identity table"
        );

        let identities = identity::resolve_all(&committed, &extraction.components, now);
        let new_facts = drift::facts_from_extraction(extraction);
        let (report, change_summary) = if previous.is_some() {
            let report = drift::compare(&old_facts, &new_facts);
            let summary = report.describe();
            (report, summary)
        } else {
            (DriftReport::baseline(&new_facts), "initial version".to_string())
        };

        let previous_version_id = previous.as_ref().map(|v| v.id);
        let version_id = insert_version(
            &tx,
            &NewVersion {
                file_id,
                version_number,
                previous_version_id,
                raw_hash: &extraction.raw_hash,
                tree_hash: &extraction.tree_hash,
                size_bytes: extraction.size_bytes,
                component_count: extraction.components.len(),
                change_summary: &change_summary,
                created_at: now,
            },
        )?;

        // Pre-order guarantees every parent id exists before its children.
        let mut ids: Vec<ComponentId> = Vec::with_capacity(extraction.components.len());
        for (component, identity) in extraction.components.iter().zip(&identities) {
            let parent_id = match component.parent {
                Some(idx) => Some(*ids.get(idx).ok_or_else(|| {
                    Error::Internal(format!(
                        "component {} refers to parent {idx} before it was written",
                        component.qualified_name
                    ))
                })?),
                None => None,
            };
            let id = insert_component(&tx, file_id, version_id, parent_id, component, identity)?;
            insert_history(
                &tx,
                id,
                file_id,
                version_id,
                component,
                identity,
                report.change_for(&component.qualified_name),
                now,
            )?;
            ids.push(id);
        }
        insert_facts(&tx, extraction, &ids)?;
        tracing::trace!(version_id = %version_id, rows = ids.len(), "Wrote snapshot components");

        insert_drift_events(
            &tx,
            file_id,
            version_id,
            previous_version_id,
            &report.changes,
            now,
        )?;

        update_file_hashes(
            &tx,
            file_id,
            &extraction.raw_hash,
            &extraction.tree_hash,
            extraction.size_bytes,
            now,
        )?;
        tx.commit()?;

        tracing::debug!(
            path = %path,
            version = version_number,
            drift = %report.summary,
            "Committed snapshot"
        );

        Ok(SnapshotWrite {
            report: IngestReport {
                path: extraction.path.clone(),
                file_id,
                version_id,
                version_number,
                component_count: extraction.components.len(),
                drift: report.summary,
                missing_segments: extraction.missing_segments,
            },
            drift: report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract, ExtractOptions};
    use crate::types::{ChangeKind, IdentityResolution};
    use std::path::Path;

    fn staged(source: &str) -> Extraction {
        extract(Path::new("pkg/mod.py"), source, &ExtractOptions::default())
            .expect("source should parse")
    }

    // === Version numbering ===

    #[test]
    fn first_write_creates_version_one() {
        let store = Store::open_in_memory().expect("store");

        let written = store
            .write_snapshot(&staged("def f():\n    return 1\n"))
            .expect("write");

        assert_eq!(written.report.version_number, 1);
        assert!(!written.report.drift.has_drift());
        assert_eq!(written.report.drift.unchanged, 0);
        assert!(store
            .list_drift_events(written.report.file_id, None)
            .expect("events")
            .is_empty());

        let history = store
            .component_history(written.report.file_id, "f")
            .expect("history");
        assert_eq!(history[0].change, ChangeKind::Added);

        let versions = store.list_versions(Path::new("pkg/mod.py")).expect("versions");
        assert_eq!(versions[0].change_summary, "initial version");
    }

    #[test]
    fn rewrites_increment_version_and_keep_file_id() {
        let store = Store::open_in_memory().expect("store");
        let first = store.write_snapshot(&staged("x = 1\n")).expect("v1");
        let second = store.write_snapshot(&staged("x = 1\n")).expect("v2");

        assert_eq!(second.report.version_number, 2);
        assert_eq!(first.report.file_id, second.report.file_id);
        assert!(!second.report.drift.has_drift());

        let versions = store.list_versions(Path::new("pkg/mod.py")).expect("versions");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].previous_version_id, Some(first.report.version_id));
    }

    // === Identity ===

    #[test]
    fn unchanged_components_adopt_committed_identity() {
        let store = Store::open_in_memory().expect("store");
        let source = "def f():\n    return 1\n";
        let first = store.write_snapshot(&staged(source)).expect("v1");
        let second = store.write_snapshot(&staged(source)).expect("v2");

        let before = store
            .get_component(first.report.version_id, "f")
            .expect("query")
            .expect("exists");
        let after = store
            .get_component(second.report.version_id, "f")
            .expect("query")
            .expect("exists");

        assert_eq!(before.resolution, IdentityResolution::New);
        assert_eq!(after.resolution, IdentityResolution::Adopt);
        assert_eq!(after.committed_hash, before.committed_hash);
        assert_eq!(after.committed_at, before.committed_at);
        assert_ne!(after.id, before.id);
    }

    #[test]
    fn history_rows_carry_drift_classification() {
        let store = Store::open_in_memory().expect("store");
        store
            .write_snapshot(&staged("def f():\n    return 1\n\ndef g():\n    pass\n"))
            .expect("v1");
        let second = store
            .write_snapshot(&staged("def f():\n    return 2\n\ndef g():\n    pass\n"))
            .expect("v2");

        let history = store
            .component_history(second.report.file_id, "f")
            .expect("history");

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].change, ChangeKind::Added);
        assert_eq!(history[1].change, ChangeKind::Modified);
        assert_ne!(history[0].committed_hash, history[1].committed_hash);
    }

    // === Facts ===

    #[test]
    fn nested_components_point_at_their_parent_row() {
        let store = Store::open_in_memory().expect("store");
        let written = store
            .write_snapshot(&staged("class A:\n    def m(self):\n        helper()\n"))
            .expect("write");

        let class = store
            .get_component(written.report.version_id, "A")
            .expect("query")
            .expect("class");
        let method = store
            .get_component(written.report.version_id, "A.m")
            .expect("query")
            .expect("method");
        let calls = store.list_call_sites(method.id).expect("calls");

        assert_eq!(method.parent_id, Some(class.id));
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].callee, "helper");
    }

    #[test]
    fn drift_events_are_written_with_the_version() {
        let store = Store::open_in_memory().expect("store");
        store.write_snapshot(&staged("def f():\n    pass\n")).expect("v1");
        let second = store
            .write_snapshot(&staged("def g():\n    pass\n"))
            .expect("v2");

        let events = store
            .list_drift_events(second.report.file_id, Some(second.report.version_id))
            .expect("events");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].qualified_name, "f");
        assert_eq!(events[0].kind, ChangeKind::Removed);
        assert_eq!(events[1].qualified_name, "g");
        assert_eq!(events[1].kind, ChangeKind::Added);
    }
}
