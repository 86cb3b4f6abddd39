//! `SQLite` storage layer for Canon.
//!
//! This module manages the `SQLite` database that stores snapshots, facts and
//! the append-only ledgers. `SQLite` is the source of truth for all persistent
//! data.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL, ledger triggers, `live_components` view)
//! - `helpers` - Row conversion and parsing utilities
//! - `files` - File rows
//! - `versions` - File version ledger
//! - `components` - Components, segments and component history
//! - `symbols` - Symbols, call sites, imports, global accesses, decorators
//! - `snapshot` - Atomic ingestion of a staged extraction
//! - `drift` - Drift event ledger and fact loading
//! - `proofs` - Equivalence proof ledger
//!
//! Query functions that must run inside a caller's transaction take a
//! `&Connection` (a `Transaction` derefs to one); the `Store` methods wrap
//! them with locking.

mod components;
mod drift;
mod files;
mod helpers;
mod proofs;
mod schema;
mod snapshot;
mod symbols;
mod versions;

pub(crate) use files::normalize_path;
pub(crate) use helpers::{
    row_to_component, row_to_file, row_to_version, COMPONENTS_COLUMNS, FILES_COLUMNS,
    VERSIONS_COLUMNS,
};
pub(crate) use proofs::NewProof;
pub(crate) use schema::SCHEMA;
pub(crate) use snapshot::SnapshotWrite;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::types::{ComponentKind, DatabaseStats};

/// How long a connection waits for another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `SQLite` database wrapper for the Canon store.
///
/// The connection is wrapped in a `Mutex` so a `Store` can be shared across
/// threads; parsing happens outside the lock, only reads and writes hold it.
pub struct Store {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Store {
    /// Open or create the store database.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the database cannot be opened or the
    /// schema cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::StoreUnavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", path.display())))?;
        Self::configure(&conn)
            .map_err(|e| Error::StoreUnavailable(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), "Opened store");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::StoreUnavailable(format!("in-memory database: {e}")))?;
        Self::configure(&conn)
            .map_err(|e| Error::StoreUnavailable(format!("in-memory database: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    fn configure(conn: &Connection) -> rusqlite::Result<()> {
        // Enable WAL mode and foreign keys
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Apply schema
        conn.execute_batch(SCHEMA)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the connection lock.
    ///
    /// Returns a `MutexGuard` providing exclusive access to the underlying connection.
    /// Used internally by all database operations.
    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::StoreUnavailable(format!(
                "database connection mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }

    /// Get the current unix timestamp in nanoseconds.
    ///
    /// Returns an error if the system time is before the Unix epoch, which would
    /// break the ordering of ledger rows.
    // u128 nanoseconds won't exceed i64::MAX until year 2262
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub(crate) fn now_ns() -> Result<i64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .map_err(|e| {
                Error::Config(format!(
                    "System clock is before Unix epoch: {e}. Fix system time before ingesting."
                ))
            })
    }

    /// Get statistics about the database contents.
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.connection()?;
        let mut stats = DatabaseStats::default();

        let count = |sql: &str| -> Result<usize> {
            conn.query_row(sql, [], |row| row.get::<_, usize>(0))
                .map_err(Into::into)
        };
        stats.file_count = count("SELECT COUNT(*) FROM files")?;
        stats.version_count = count("SELECT COUNT(*) FROM file_versions")?;
        stats.component_rows = count("SELECT COUNT(*) FROM components")?;
        stats.drift_event_count = count("SELECT COUNT(*) FROM drift_events")?;
        stats.proof_count = count("SELECT COUNT(*) FROM equivalence_proofs")?;
        stats.failed_proof_count =
            count("SELECT COUNT(*) FROM equivalence_proofs WHERE matched = 0")?;

        // Live component counts by kind
        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM live_components GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            let kind_str: String = row.get(0)?;
            let count: usize = row.get(1)?;
            Ok((kind_str, count))
        })?;

        let mut by_kind: HashMap<ComponentKind, usize> = HashMap::new();
        for row in rows {
            let (kind_str, count) = row?;
            if let Some(kind) = ComponentKind::parse(&kind_str) {
                by_kind.insert(kind, count);
            } else {
                tracing::warn!(
                    kind = %kind_str,
                    count = count,
                    "Unknown component kind in database, skipping from stats"
                );
            }
        }
        stats.live_components_by_kind = by_kind;

        Ok(stats)
    }
}
