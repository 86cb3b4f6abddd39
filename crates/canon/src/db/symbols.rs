//! Per-component facts: symbols, call sites, imports, global accesses and
//! decorators.

use rusqlite::{params, Connection};

use super::helpers::{
    row_to_call_site, row_to_decorator, row_to_global_access, row_to_import, row_to_symbol,
    IMPORTS_COLUMNS, SYMBOLS_COLUMNS,
};
use super::Store;
use crate::error::Result;
use crate::extract::Extraction;
use crate::types::{CallSite, ComponentId, Decorator, GlobalAccess, ImportRecord, Symbol};

/// Insert every fact of a staged extraction.
///
/// `ids[i]` is the row id assigned to `extraction.components[i]`.
pub(crate) fn insert_facts(
    conn: &Connection,
    extraction: &Extraction,
    ids: &[ComponentId],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO symbols (component_id, name, scope, access, scope_level, line, type_annotation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for s in &extraction.symbols {
        stmt.execute(params![
            ids[s.component].as_i64(),
            s.name,
            s.scope.as_str(),
            s.access.as_str(),
            s.scope_level,
            s.line,
            s.type_annotation,
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO call_sites (component_id, callee, line) VALUES (?1, ?2, ?3)",
    )?;
    for c in &extraction.calls {
        stmt.execute(params![ids[c.component].as_i64(), c.callee, c.line])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO imports (component_id, module, name, alias, level, is_from, line)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for i in &extraction.imports {
        stmt.execute(params![
            ids[i.component].as_i64(),
            i.module,
            i.name,
            i.alias,
            i.level,
            i.is_from,
            i.line,
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO global_accesses (component_id, name, access, line) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for g in &extraction.globals {
        stmt.execute(params![
            ids[g.component].as_i64(),
            g.name,
            g.access.as_str(),
            g.line
        ])?;
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO decorators (component_id, position, name, text, line)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for d in &extraction.decorators {
        stmt.execute(params![
            ids[d.component].as_i64(),
            d.position,
            d.name,
            d.text,
            d.line
        ])?;
    }

    Ok(())
}

impl Store {
    /// Symbols observed inside a component, in source order.
    pub fn list_symbols(&self, component_id: ComponentId) -> Result<Vec<Symbol>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOLS_COLUMNS} FROM symbols WHERE component_id = ?1 ORDER BY id"
        ))?;
        let symbols = stmt
            .query_map([component_id.as_i64()], row_to_symbol)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(symbols)
    }

    /// Calls made from a component, in source order.
    pub fn list_call_sites(&self, component_id: ComponentId) -> Result<Vec<CallSite>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(
            "SELECT component_id, callee, line FROM call_sites WHERE component_id = ?1 ORDER BY id",
        )?;
        let calls = stmt
            .query_map([component_id.as_i64()], row_to_call_site)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(calls)
    }

    /// Imports declared by a component, in source order.
    pub fn list_imports(&self, component_id: ComponentId) -> Result<Vec<ImportRecord>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {IMPORTS_COLUMNS} FROM imports WHERE component_id = ?1 ORDER BY id"
        ))?;
        let imports = stmt
            .query_map([component_id.as_i64()], row_to_import)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(imports)
    }

    /// Global mutations performed by a component.
    pub fn list_global_accesses(&self, component_id: ComponentId) -> Result<Vec<GlobalAccess>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(
            "SELECT component_id, name, access, line FROM global_accesses
             WHERE component_id = ?1 ORDER BY id",
        )?;
        let accesses = stmt
            .query_map([component_id.as_i64()], row_to_global_access)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accesses)
    }

    /// Decorators of a component, in source order.
    pub fn list_decorators(&self, component_id: ComponentId) -> Result<Vec<Decorator>> {
        let conn = self.connection()?;

        let mut stmt = conn.prepare(
            "SELECT component_id, position, name, text, line FROM decorators
             WHERE component_id = ?1 ORDER BY position",
        )?;
        let decorators = stmt
            .query_map([component_id.as_i64()], row_to_decorator)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(decorators)
    }
}
