//! Components, source segments and component history.

use rusqlite::{params, Connection, OptionalExtension};

use super::helpers::{row_to_history, row_to_segment, HISTORY_COLUMNS};
use super::{row_to_component, Store, COMPONENTS_COLUMNS};
use crate::error::Result;
use crate::extract::ExtractedComponent;
use crate::identity::{CommittedIdentity, IdentityTable, ResolvedIdentity};
use crate::types::{
    ChangeKind, Component, ComponentHistory, ComponentId, FileId, SourceSegment, VersionId,
};

/// Insert one staged component into a snapshot.
pub(crate) fn insert_component(
    conn: &Connection,
    file_id: FileId,
    version_id: VersionId,
    parent_id: Option<ComponentId>,
    component: &ExtractedComponent,
    identity: &ResolvedIdentity,
) -> rusqlite::Result<ComponentId> {
    conn.execute(
        "INSERT INTO components (file_id, version_id, parent_id, kind, name, qualified_name,
             order_index, depth, start_line, end_line, start_byte, end_byte, content_hash,
             structure_hash, committed_hash, committed_at, signature, resolution)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            file_id.as_i64(),
            version_id.as_i64(),
            parent_id.map(ComponentId::as_i64),
            component.kind.as_str(),
            component.name,
            component.qualified_name,
            component.order_index,
            component.depth,
            component.start_line,
            component.end_line,
            component.start_byte as i64,
            component.end_byte as i64,
            component.content_hash,
            component.structure_hash,
            identity.committed_hash,
            identity.committed_at,
            component.signature,
            identity.resolution.as_str(),
        ],
    )?;
    let id = ComponentId::from(conn.last_insert_rowid());

    conn.execute(
        "INSERT INTO source_segments (component_id, leading, text, trailing)
         VALUES (?1, ?2, ?3, ?4)",
        params![id.as_i64(), component.leading, component.text, component.trailing],
    )?;
    Ok(id)
}

/// Append the history row for a freshly inserted component.
#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_history(
    conn: &Connection,
    component_id: ComponentId,
    file_id: FileId,
    version_id: VersionId,
    component: &ExtractedComponent,
    identity: &ResolvedIdentity,
    change: ChangeKind,
    recorded_at: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO component_history (component_id, file_id, version_id, qualified_name, drift,
             resolution, content_hash, structure_hash, committed_hash, committed_at, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            component_id.as_i64(),
            file_id.as_i64(),
            version_id.as_i64(),
            component.qualified_name,
            change.as_str(),
            identity.resolution.as_str(),
            component.content_hash,
            component.structure_hash,
            identity.committed_hash,
            identity.committed_at,
            recorded_at,
        ],
    )?;
    Ok(())
}

/// Committed identity table of a version, keyed by qualified name.
pub(crate) fn identity_table(
    conn: &Connection,
    version_id: VersionId,
) -> rusqlite::Result<IdentityTable> {
    let mut stmt = conn.prepare(
        "SELECT qualified_name, component_id, content_hash, structure_hash, committed_hash,
                committed_at
         FROM component_history WHERE version_id = ?1",
    )?;
    let rows = stmt.query_map([version_id.as_i64()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            CommittedIdentity {
                component_id: ComponentId::from(row.get::<_, i64>(1)?),
                content_hash: row.get(2)?,
                structure_hash: row.get(3)?,
                committed_hash: row.get(4)?,
                committed_at: row.get(5)?,
            },
        ))
    })?;
    rows.collect()
}

/// All components of a version in tree order (parents before children).
pub(crate) fn components_of_version(
    conn: &Connection,
    version_id: VersionId,
) -> rusqlite::Result<Vec<Component>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMPONENTS_COLUMNS} FROM components WHERE version_id = ?1
         ORDER BY depth, parent_id, order_index"
    ))?;
    let rows = stmt.query_map([version_id.as_i64()], row_to_component)?;
    rows.collect()
}

/// Segments of a version's top-level components, in `order_index` order.
pub(crate) fn top_level_segments(
    conn: &Connection,
    version_id: VersionId,
) -> rusqlite::Result<Vec<SourceSegment>> {
    let mut stmt = conn.prepare(
        "SELECT s.component_id, s.leading, s.text, s.trailing
         FROM source_segments s
         JOIN components c ON c.id = s.component_id
         WHERE c.version_id = ?1 AND c.parent_id IS NULL
         ORDER BY c.order_index",
    )?;
    let rows = stmt.query_map([version_id.as_i64()], row_to_segment)?;
    rows.collect()
}

impl Store {
    /// All components of a version in tree order.
    pub fn list_components(&self, version_id: VersionId) -> Result<Vec<Component>> {
        let conn = self.connection()?;
        components_of_version(&conn, version_id).map_err(Into::into)
    }

    /// A component of a version by qualified name.
    pub fn get_component(
        &self,
        version_id: VersionId,
        qualified_name: &str,
    ) -> Result<Option<Component>> {
        let conn = self.connection()?;

        conn.query_row(
            &format!(
                "SELECT {COMPONENTS_COLUMNS} FROM components
                 WHERE version_id = ?1 AND qualified_name = ?2"
            ),
            params![version_id.as_i64(), qualified_name],
            row_to_component,
        )
        .optional()
        .map_err(Into::into)
    }

    /// The exact source segment of a component.
    pub fn get_segment(&self, component_id: ComponentId) -> Result<Option<SourceSegment>> {
        let conn = self.connection()?;

        conn.query_row(
            "SELECT component_id, leading, text, trailing FROM source_segments
             WHERE component_id = ?1",
            [component_id.as_i64()],
            row_to_segment,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Top-level segments of a version, in order.
    pub fn list_top_level_segments(&self, version_id: VersionId) -> Result<Vec<SourceSegment>> {
        let conn = self.connection()?;
        top_level_segments(&conn, version_id).map_err(Into::into)
    }

    /// History of one qualified name across all versions of a file, oldest first.
    pub fn component_history(
        &self,
        file_id: FileId,
        qualified_name: &str,
    ) -> Result<Vec<ComponentHistory>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {HISTORY_COLUMNS}
             FROM component_history h
             JOIN file_versions v ON v.id = h.version_id
             WHERE h.file_id = ?1 AND h.qualified_name = ?2
             ORDER BY v.version_number"
        ))?;
        let history = stmt
            .query_map(params![file_id.as_i64(), qualified_name], row_to_history)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(history)
    }
}
