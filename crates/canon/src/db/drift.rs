//! Drift event ledger and fact loading for stored snapshots.

use std::collections::{BTreeSet, HashMap};

use rusqlite::{params, Connection};

use super::helpers::{row_to_drift_event, DRIFT_COLUMNS};
use super::versions::{latest_version, version_by_number};
use super::Store;
use crate::drift::{self, import_key, symbol_key, ComponentFacts, DriftChange, DriftReport};
use crate::error::{Error, Result};
use crate::types::{AccessKind, ComponentKind, DriftEvent, FileId, ScopeKind, VersionId};

/// Append drift events for a version.
///
/// Events are unique per version and qualified name; re-running detection
/// for a version inserts nothing. Returns the number of new rows.
pub(crate) fn insert_drift_events(
    conn: &Connection,
    file_id: FileId,
    version_id: VersionId,
    previous_version_id: Option<VersionId>,
    changes: &[DriftChange],
    detected_at: i64,
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO drift_events (file_id, version_id, previous_version_id,
             qualified_name, kind, category, severity, old_value, new_value, detected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;

    let mut inserted = 0;
    for change in changes {
        inserted += stmt.execute(params![
            file_id.as_i64(),
            version_id.as_i64(),
            previous_version_id.map(VersionId::as_i64),
            change.qualified_name,
            change.kind.as_str(),
            change.category.as_str(),
            change.severity.as_str(),
            change.old_value,
            change.new_value,
            detected_at,
        ])?;
    }
    tracing::trace!(version_id = %version_id, inserted, "Appended drift events");
    Ok(inserted)
}

/// Rebuild drift facts for every component of a stored version.
///
/// Produces the same keys as [`drift::facts_from_extraction`] so stored and
/// staged snapshots compare directly.
pub(crate) fn load_facts(
    conn: &Connection,
    version_id: VersionId,
) -> rusqlite::Result<Vec<ComponentFacts>> {
    let mut stmt = conn.prepare(
        "SELECT id, qualified_name, kind, content_hash, structure_hash, signature
         FROM components WHERE version_id = ?1 ORDER BY id",
    )?;
    let mut rows = stmt.query([version_id.as_i64()])?;

    let mut facts = Vec::new();
    let mut index_of: HashMap<i64, usize> = HashMap::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let kind: String = row.get(2)?;
        // Unknown kinds only matter for the import/non-import split.
        let kind = ComponentKind::parse(&kind).unwrap_or(ComponentKind::Block);
        index_of.insert(id, facts.len());
        facts.push(ComponentFacts {
            qualified_name: row.get(1)?,
            kind,
            content_hash: row.get(3)?,
            structure_hash: row.get(4)?,
            signature: row.get(5)?,
            calls: BTreeSet::new(),
            imports: BTreeSet::new(),
            symbols: BTreeSet::new(),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT s.component_id, s.callee FROM call_sites s
         JOIN components c ON c.id = s.component_id WHERE c.version_id = ?1",
    )?;
    let mut rows = stmt.query([version_id.as_i64()])?;
    while let Some(row) = rows.next()? {
        if let Some(&idx) = index_of.get(&row.get::<_, i64>(0)?) {
            facts[idx].calls.insert(row.get(1)?);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT i.component_id, i.module, i.name, i.alias, i.level FROM imports i
         JOIN components c ON c.id = i.component_id WHERE c.version_id = ?1",
    )?;
    let mut rows = stmt.query([version_id.as_i64()])?;
    while let Some(row) = rows.next()? {
        if let Some(&idx) = index_of.get(&row.get::<_, i64>(0)?) {
            let module: String = row.get(1)?;
            let name: Option<String> = row.get(2)?;
            let alias: Option<String> = row.get(3)?;
            let level: u32 = row.get(4)?;
            facts[idx]
                .imports
                .insert(import_key(&module, name.as_deref(), alias.as_deref(), level));
        }
    }

    let mut stmt = conn.prepare(
        "SELECT s.component_id, s.name, s.scope, s.access FROM symbols s
         JOIN components c ON c.id = s.component_id WHERE c.version_id = ?1",
    )?;
    let mut rows = stmt.query([version_id.as_i64()])?;
    while let Some(row) = rows.next()? {
        let Some(&idx) = index_of.get(&row.get::<_, i64>(0)?) else {
            continue;
        };
        let name: String = row.get(1)?;
        let scope: String = row.get(2)?;
        let access: String = row.get(3)?;
        match (ScopeKind::parse(&scope), AccessKind::parse(&access)) {
            (Some(scope), Some(access)) => {
                facts[idx].symbols.insert(symbol_key(&name, scope, access));
            }
            _ => tracing::warn!(
                scope = %scope,
                access = %access,
                "Unknown symbol scope or access in database, skipping from drift facts"
            ),
        }
    }

    Ok(facts)
}

impl Store {
    /// Run drift detection for a stored version against its predecessor.
    ///
    /// `version_number` of `None` selects the latest version. Events already
    /// recorded for the version are kept as they are. A first version has no
    /// predecessor and reports no drift.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if the file has no such version.
    pub fn detect_drift(
        &self,
        file_id: FileId,
        version_number: Option<u32>,
    ) -> Result<DriftReport> {
        let conn = self.connection()?;

        let version = match version_number {
            Some(n) => version_by_number(&conn, file_id, n)?,
            None => latest_version(&conn, file_id)?,
        }
        .ok_or_else(|| {
            Error::UnknownFile(format!(
                "file {file_id} has no version {}",
                version_number.map_or_else(|| "yet".to_string(), |n| n.to_string())
            ))
        })?;

        let new = load_facts(&conn, version.id)?;
        let report = match version.previous_version_id {
            Some(previous) => drift::compare(&load_facts(&conn, previous)?, &new),
            None => DriftReport::baseline(&new),
        };

        let inserted = insert_drift_events(
            &conn,
            file_id,
            version.id,
            version.previous_version_id,
            &report.changes,
            Self::now_ns()?,
        )?;
        tracing::debug!(
            file_id = %file_id,
            version = version.version_number,
            changes = report.changes.len(),
            inserted,
            "Detected drift"
        );
        Ok(report)
    }

    /// Drift events of a file, optionally restricted to one version.
    ///
    /// Ordered by version, then qualified name.
    pub fn list_drift_events(
        &self,
        file_id: FileId,
        version_id: Option<VersionId>,
    ) -> Result<Vec<DriftEvent>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {DRIFT_COLUMNS} FROM drift_events
             WHERE file_id = ?1 AND (?2 IS NULL OR version_id = ?2)
             ORDER BY version_id, qualified_name"
        ))?;
        let events = stmt
            .query_map(
                params![file_id.as_i64(), version_id.map(VersionId::as_i64)],
                row_to_drift_event,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}
