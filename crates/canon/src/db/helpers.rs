//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants to reduce duplication across query modules.

// Counts, lines and byte offsets are stored as INTEGER (i64); they never
// exceed u32/u64 for real source files.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::path::PathBuf;

use crate::types::{
    AccessKind, CallSite, ChangeKind, Component, ComponentHistory, ComponentId, ComponentKind,
    Decorator, DriftCategory, DriftEvent, EquivalenceProof, FileId, FileVersion, GlobalAccess,
    IdentityResolution, ImportRecord, ScopeKind, Severity, SourceFile, SourceSegment, Symbol,
    VerifyStatus, VersionId,
};

/// SQL column list for files table.
///
/// Use with `row_to_file` for consistent column ordering.
pub(crate) const FILES_COLUMNS: &str =
    "id, path, raw_hash, tree_hash, size_bytes, created_at, updated_at";

/// SQL column list for `file_versions` table.
pub(crate) const VERSIONS_COLUMNS: &str = "id, file_id, version_number, previous_version_id, \
     raw_hash, tree_hash, size_bytes, component_count, change_summary, created_at";

/// SQL column list for components table.
pub(crate) const COMPONENTS_COLUMNS: &str = "id, file_id, version_id, parent_id, kind, name, \
     qualified_name, order_index, depth, start_line, end_line, content_hash, structure_hash, \
     committed_hash, committed_at, signature, resolution";

/// SQL column list for symbols table.
pub(crate) const SYMBOLS_COLUMNS: &str =
    "component_id, name, scope, access, scope_level, line, type_annotation";

/// SQL column list for imports table.
pub(crate) const IMPORTS_COLUMNS: &str =
    "component_id, module, name, alias, level, is_from, line";

/// SQL column list for `component_history` joined to `file_versions` (`h`/`v`).
pub(crate) const HISTORY_COLUMNS: &str = "h.component_id, h.version_id, v.version_number, \
     h.qualified_name, h.drift, h.resolution, h.content_hash, h.structure_hash, \
     h.committed_hash, h.committed_at";

/// SQL column list for `drift_events` table.
pub(crate) const DRIFT_COLUMNS: &str = "id, file_id, version_id, previous_version_id, \
     qualified_name, kind, category, severity, old_value, new_value, detected_at";

/// SQL column list for `equivalence_proofs` table.
pub(crate) const PROOFS_COLUMNS: &str = "id, file_id, version_id, original_raw_hash, \
     rebuilt_raw_hash, original_tree_hash, rebuilt_tree_hash, raw_match, tree_match, matched, \
     status, mismatch, verified_at";

/// Build the error for an unrecognized stored value.
fn unknown_value(column: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        format!(
            "Unknown {what} '{value}' in database. Database may be corrupted or from a newer version."
        )
        .into(),
    )
}

/// Read a text column and parse it with `parse`.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
fn parse_column<T>(
    row: &rusqlite::Row,
    column: usize,
    what: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let value: String = row.get(column)?;
    parse(&value).ok_or_else(|| unknown_value(column, what, &value))
}

/// Convert a database row to a [`SourceFile`].
pub(crate) fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<SourceFile> {
    Ok(SourceFile {
        id: FileId::from(row.get::<_, i64>(0)?),
        path: PathBuf::from(row.get::<_, String>(1)?),
        raw_hash: row.get(2)?,
        tree_hash: row.get(3)?,
        size_bytes: row.get::<_, i64>(4)? as u64,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Convert a database row to a [`FileVersion`].
pub(crate) fn row_to_version(row: &rusqlite::Row) -> rusqlite::Result<FileVersion> {
    Ok(FileVersion {
        id: VersionId::from(row.get::<_, i64>(0)?),
        file_id: FileId::from(row.get::<_, i64>(1)?),
        version_number: row.get(2)?,
        previous_version_id: row.get::<_, Option<i64>>(3)?.map(VersionId::from),
        raw_hash: row.get(4)?,
        tree_hash: row.get(5)?,
        size_bytes: row.get::<_, i64>(6)? as u64,
        component_count: row.get(7)?,
        change_summary: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Convert a database row to a [`Component`].
pub(crate) fn row_to_component(row: &rusqlite::Row) -> rusqlite::Result<Component> {
    Ok(Component {
        id: ComponentId::from(row.get::<_, i64>(0)?),
        file_id: FileId::from(row.get::<_, i64>(1)?),
        version_id: VersionId::from(row.get::<_, i64>(2)?),
        parent_id: row.get::<_, Option<i64>>(3)?.map(ComponentId::from),
        kind: parse_column(row, 4, "component kind", ComponentKind::parse)?,
        name: row.get(5)?,
        qualified_name: row.get(6)?,
        order_index: row.get(7)?,
        depth: row.get(8)?,
        start_line: row.get(9)?,
        end_line: row.get(10)?,
        content_hash: row.get(11)?,
        structure_hash: row.get(12)?,
        committed_hash: row.get(13)?,
        committed_at: row.get(14)?,
        signature: row.get(15)?,
        resolution: parse_column(row, 16, "identity resolution", IdentityResolution::parse)?,
    })
}

/// Convert a database row to a [`SourceSegment`].
///
/// Expected columns: `component_id`, leading, text, trailing
pub(crate) fn row_to_segment(row: &rusqlite::Row) -> rusqlite::Result<SourceSegment> {
    Ok(SourceSegment {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        leading: row.get(1)?,
        text: row.get(2)?,
        trailing: row.get(3)?,
    })
}

/// Convert a database row to a [`Symbol`].
pub(crate) fn row_to_symbol(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        name: row.get(1)?,
        scope: parse_column(row, 2, "symbol scope", ScopeKind::parse)?,
        access: parse_column(row, 3, "access kind", AccessKind::parse)?,
        scope_level: row.get(4)?,
        line: row.get(5)?,
        type_annotation: row.get(6)?,
    })
}

/// Convert a database row to a [`CallSite`].
///
/// Expected columns: `component_id`, callee, line
pub(crate) fn row_to_call_site(row: &rusqlite::Row) -> rusqlite::Result<CallSite> {
    Ok(CallSite {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        callee: row.get(1)?,
        line: row.get(2)?,
    })
}

/// Convert a database row to an [`ImportRecord`].
pub(crate) fn row_to_import(row: &rusqlite::Row) -> rusqlite::Result<ImportRecord> {
    Ok(ImportRecord {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        module: row.get(1)?,
        name: row.get(2)?,
        alias: row.get(3)?,
        level: row.get(4)?,
        is_from: row.get(5)?,
        line: row.get(6)?,
    })
}

/// Convert a database row to a [`GlobalAccess`].
///
/// Expected columns: `component_id`, name, access, line
pub(crate) fn row_to_global_access(row: &rusqlite::Row) -> rusqlite::Result<GlobalAccess> {
    Ok(GlobalAccess {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        name: row.get(1)?,
        access: parse_column(row, 2, "access kind", AccessKind::parse)?,
        line: row.get(3)?,
    })
}

/// Convert a database row to a [`Decorator`].
///
/// Expected columns: `component_id`, position, name, text, line
pub(crate) fn row_to_decorator(row: &rusqlite::Row) -> rusqlite::Result<Decorator> {
    Ok(Decorator {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        position: row.get(1)?,
        name: row.get(2)?,
        text: row.get(3)?,
        line: row.get(4)?,
    })
}

/// Convert a database row to a [`ComponentHistory`].
pub(crate) fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<ComponentHistory> {
    Ok(ComponentHistory {
        component_id: ComponentId::from(row.get::<_, i64>(0)?),
        version_id: VersionId::from(row.get::<_, i64>(1)?),
        version_number: row.get(2)?,
        qualified_name: row.get(3)?,
        change: parse_column(row, 4, "change kind", ChangeKind::parse)?,
        resolution: parse_column(row, 5, "identity resolution", IdentityResolution::parse)?,
        content_hash: row.get(6)?,
        structure_hash: row.get(7)?,
        committed_hash: row.get(8)?,
        committed_at: row.get(9)?,
    })
}

/// Convert a database row to a [`DriftEvent`].
pub(crate) fn row_to_drift_event(row: &rusqlite::Row) -> rusqlite::Result<DriftEvent> {
    Ok(DriftEvent {
        id: row.get(0)?,
        file_id: FileId::from(row.get::<_, i64>(1)?),
        version_id: VersionId::from(row.get::<_, i64>(2)?),
        previous_version_id: row.get::<_, Option<i64>>(3)?.map(VersionId::from),
        qualified_name: row.get(4)?,
        kind: parse_column(row, 5, "change kind", ChangeKind::parse)?,
        category: parse_column(row, 6, "drift category", DriftCategory::parse)?,
        severity: parse_column(row, 7, "severity", Severity::parse)?,
        old_value: row.get(8)?,
        new_value: row.get(9)?,
        detected_at: row.get(10)?,
    })
}

/// Convert a database row to an [`EquivalenceProof`].
pub(crate) fn row_to_proof(row: &rusqlite::Row) -> rusqlite::Result<EquivalenceProof> {
    let status: String = row.get(10)?;
    let mismatch: Option<String> = row.get(11)?;
    let status = VerifyStatus::parse(&status, mismatch.as_deref())
        .ok_or_else(|| unknown_value(10, "verification status", &status))?;

    Ok(EquivalenceProof {
        id: row.get(0)?,
        file_id: FileId::from(row.get::<_, i64>(1)?),
        version_id: VersionId::from(row.get::<_, i64>(2)?),
        original_raw_hash: row.get(3)?,
        rebuilt_raw_hash: row.get(4)?,
        original_tree_hash: row.get(5)?,
        rebuilt_tree_hash: row.get(6)?,
        raw_match: row.get(7)?,
        tree_match: row.get(8)?,
        matched: row.get(9)?,
        status,
        verified_at: row.get(12)?,
    })
}
