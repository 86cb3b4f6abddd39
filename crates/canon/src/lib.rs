//! # Canon: Canonical Code Ingestion and Drift Detection
//!
//! Canon decomposes Python source files into a hierarchy of structural
//! components, stores each ingestion as an immutable snapshot in `SQLite`, and
//! answers two questions about every file it has seen:
//!
//! - **What changed?** Successive snapshots are compared by qualified name and
//!   every addition, removal and modification is recorded as a categorized
//!   drift event.
//! - **Is the store faithful?** The latest snapshot can be rebuilt from its
//!   stored segments and checked byte-for-byte and tree-for-tree against the
//!   ingested source.
//!
//! ## Design Philosophy
//!
//! - **All or nothing** - an ingestion either writes a complete snapshot or
//!   leaves the previous one untouched
//! - **Append-only history** - versions, component history, drift events and
//!   proofs are never rewritten
//! - **Identity by name** - a component is the same component when its
//!   qualified name is the same; its committed hash only moves on a structural
//!   change
//! - **Library first, CLI second**
//!
//! ## Quick Start
//!
//! ```no_run
//! use canon::Canon;
//! use std::path::Path;
//!
//! let canon = Canon::open_in_workspace(Path::new("/path/to/workspace"))?;
//!
//! let report = canon.ingest(Path::new("app/models.py"))?;
//! println!("version {} ({})", report.version_number, report.drift);
//!
//! let outcome = canon.verify(Path::new("app/models.py"))?;
//! println!("{}", outcome.status);
//! # Ok::<(), canon::Error>(())
//! ```

pub mod config;
mod db;
pub mod drift;
mod error;
pub mod extract;
pub mod hashing;
pub mod identity;
pub mod languages;
mod locks;
mod types;
pub mod verify;

pub use config::{CanonConfig, DuplicatePolicy};
pub use drift::{ComponentFacts, DriftChange, DriftReport};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extraction};
pub use types::{
    AccessKind, CallSite, ChangeKind, Component, ComponentHistory, ComponentId, ComponentKind,
    DatabaseStats, Decorator, DriftCategory, DriftEvent, DriftSummary, EquivalenceProof, FileId,
    FileVersion, GlobalAccess, IdentityResolution, ImportRecord, IngestReport, ScopeKind,
    Severity, SourceFile, SourceSegment, Symbol, VerifyOutcome, VerifyStatus, VersionId,
};

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use db::{normalize_path, Store};
use locks::FileLocks;

/// Canonical code store.
///
/// `Canon` is `Send + Sync`: share one instance across threads. Work on the
/// same logical path is serialized; different paths proceed in parallel, and
/// only database reads and writes contend on the connection.
pub struct Canon {
    config: CanonConfig,
    db_path: PathBuf,
    store: Store,
    locks: FileLocks,
}

impl Canon {
    /// Open the store described by `config`, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`Error::StoreUnavailable`] if the database cannot be opened.
    pub fn open(config: CanonConfig) -> Result<Self> {
        let db_path = config.database_path();
        let store = Store::open(&db_path)?;
        debug!(
            database = %db_path.display(),
            duplicate_names = ?config.duplicate_names,
            "Opened Canon"
        );

        Ok(Self {
            config,
            db_path,
            store,
            locks: FileLocks::new(),
        })
    }

    /// Open the store for a workspace, reading `.canon/config.yaml` if present.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the workspace root does not exist
    /// - [`Error::Config`] if the configuration file is invalid
    /// - [`Error::StoreUnavailable`] if the database cannot be opened
    pub fn open_in_workspace(workspace_root: &Path) -> Result<Self> {
        let workspace_root = workspace_root.canonicalize().map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("workspace root not found: {}", workspace_root.display()),
            ))
        })?;
        Self::open(CanonConfig::discover(&workspace_root)?)
    }

    /// Path of the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CanonConfig {
        &self.config
    }

    // === Ingestion ===

    /// Read `path` and ingest it as the next version of that logical path.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if `path` does not exist
    /// - [`Error::FatalParse`] if the file is not UTF-8 or does not parse
    /// - [`Error::IdentityAmbiguity`] for duplicate names under the reject policy
    /// - store errors; nothing is written in any error case
    pub fn ingest(&self, path: &Path) -> Result<IngestReport> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::fatal_parse(path, format!("source is not valid UTF-8: {e}")))?;
        self.ingest_source(path, &text)
    }

    /// Ingest `text` as the next version of logical path `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Canon::ingest`], except that nothing is read from disk.
    pub fn ingest_source(&self, path: &Path, text: &str) -> Result<IngestReport> {
        let handle = self.locks.handle(&normalize_path(path))?;
        let _guard = locks::acquire(&handle);

        let extraction = extract::extract(path, text, &ExtractOptions::from(&self.config))?;
        let written = self.store.write_snapshot(&extraction)?;

        info!(
            path = %path.display(),
            version = written.report.version_number,
            components = written.report.component_count,
            drift = %written.report.drift,
            "Ingested"
        );
        for change in &written.drift.changes {
            debug!(
                qualified_name = %change.qualified_name,
                kind = change.kind.as_str(),
                category = change.category.as_str(),
                severity = change.severity.as_str(),
                "Drift"
            );
        }
        Ok(written.report)
    }

    /// Ingest several files in parallel.
    ///
    /// Results come back in input order; one file's failure does not stop the
    /// others.
    pub fn ingest_many(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<IngestReport>)> {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.ingest(path)))
            .collect()
    }

    // === Verification and drift ===

    /// Rebuild the latest version of `path` and compare it with the source.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` was never ingested. A mismatch is
    /// reported in the outcome, not as an error.
    pub fn verify(&self, path: &Path) -> Result<VerifyOutcome> {
        let file = self.require_file(path)?;
        self.verify_file(file.id)
    }

    /// [`Canon::verify`] by file id.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if no such file exists.
    pub fn verify_file(&self, file_id: FileId) -> Result<VerifyOutcome> {
        let file = self
            .store
            .get_file_by_id(file_id)?
            .ok_or_else(|| Error::UnknownFile(format!("file id {file_id}")))?;

        let handle = self.locks.handle(&normalize_path(&file.path))?;
        let _guard = locks::acquire(&handle);
        verify::verify_latest(&self.store, file_id)
    }

    /// Run drift detection for a version of `path` (latest when `None`).
    ///
    /// Detection is idempotent: events already recorded for the version are
    /// not duplicated. Version 1 has nothing to drift from and reports zero.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` or the version does not exist.
    pub fn detect_drift(&self, path: &Path, version_number: Option<u32>) -> Result<DriftSummary> {
        let file = self.require_file(path)?;

        let handle = self.locks.handle(&normalize_path(path))?;
        let _guard = locks::acquire(&handle);
        Ok(self.store.detect_drift(file.id, version_number)?.summary)
    }

    // === Queries ===

    /// Get a tracked file by logical path.
    ///
    /// # Errors
    ///
    /// Store errors only; an unknown path is `Ok(None)`.
    pub fn get_file(&self, path: &Path) -> Result<Option<SourceFile>> {
        self.store.get_file(path)
    }

    /// List all tracked files, ordered by path.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn list_files(&self) -> Result<Vec<SourceFile>> {
        self.store.list_files()
    }

    /// Components of the latest version of `path`, in tree order.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` was never ingested.
    pub fn list_components(&self, path: &Path) -> Result<Vec<Component>> {
        self.list_components_at(path, None)
    }

    /// Components of a specific version of `path` (latest when `None`).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` or the version does not exist.
    pub fn list_components_at(
        &self,
        path: &Path,
        version_number: Option<u32>,
    ) -> Result<Vec<Component>> {
        let version = self.require_version(path, version_number)?;
        self.store.list_components(version.id)
    }

    /// A component of the latest version of `path` by qualified name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` was never ingested.
    pub fn get_component(&self, path: &Path, qualified_name: &str) -> Result<Option<Component>> {
        let version = self.require_version(path, None)?;
        self.store.get_component(version.id, qualified_name)
    }

    /// The exact source segment of a component.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn get_segment(&self, component_id: ComponentId) -> Result<Option<SourceSegment>> {
        self.store.get_segment(component_id)
    }

    /// Symbols observed inside a component.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn list_symbols(&self, component_id: ComponentId) -> Result<Vec<Symbol>> {
        self.store.list_symbols(component_id)
    }

    /// Calls made from a component.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn list_call_sites(&self, component_id: ComponentId) -> Result<Vec<CallSite>> {
        self.store.list_call_sites(component_id)
    }

    /// Imports declared by a component.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn list_imports(&self, component_id: ComponentId) -> Result<Vec<ImportRecord>> {
        self.store.list_imports(component_id)
    }

    /// Global mutations performed by a component.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn list_global_accesses(&self, component_id: ComponentId) -> Result<Vec<GlobalAccess>> {
        self.store.list_global_accesses(component_id)
    }

    /// Decorators of a component.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn list_decorators(&self, component_id: ComponentId) -> Result<Vec<Decorator>> {
        self.store.list_decorators(component_id)
    }

    /// All versions of `path`, oldest first.
    ///
    /// # Errors
    ///
    /// Store errors; an unknown path yields an empty list.
    pub fn list_versions(&self, path: &Path) -> Result<Vec<FileVersion>> {
        self.store.list_versions(path)
    }

    /// Drift events of `path`, optionally for a single version number.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` or the version does not exist.
    pub fn list_drift_events(
        &self,
        path: &Path,
        version_number: Option<u32>,
    ) -> Result<Vec<DriftEvent>> {
        let file = self.require_file(path)?;
        let version_id = match version_number {
            Some(n) => Some(self.require_version(path, Some(n))?.id),
            None => None,
        };
        self.store.list_drift_events(file.id, version_id)
    }

    /// History of a qualified name across every version of `path`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` was never ingested.
    pub fn component_history(
        &self,
        path: &Path,
        qualified_name: &str,
    ) -> Result<Vec<ComponentHistory>> {
        let file = self.require_file(path)?;
        self.store.component_history(file.id, qualified_name)
    }

    /// Equivalence proofs recorded for `path`, oldest first.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` was never ingested.
    pub fn list_proofs(&self, path: &Path) -> Result<Vec<EquivalenceProof>> {
        let file = self.require_file(path)?;
        self.store.list_proofs(file.id)
    }

    /// Rebuild the latest version of `path` from its stored segments.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFile`] if `path` was never ingested.
    pub fn reconstruct(&self, path: &Path) -> Result<String> {
        let version = self.require_version(path, None)?;
        let segments = self.store.list_top_level_segments(version.id)?;
        Ok(verify::rebuild(&segments))
    }

    /// Get statistics about the store.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        self.store.get_stats()
    }

    // === Helpers ===

    fn require_file(&self, path: &Path) -> Result<SourceFile> {
        self.store
            .get_file(path)?
            .ok_or_else(|| Error::UnknownFile(path.display().to_string()))
    }

    fn require_version(&self, path: &Path, version_number: Option<u32>) -> Result<FileVersion> {
        let file = self.require_file(path)?;
        self.store
            .get_version(file.id, version_number)?
            .ok_or_else(|| match version_number {
                Some(n) => Error::UnknownFile(format!("{} has no version {n}", path.display())),
                None => Error::UnknownFile(path.display().to_string()),
            })
    }

    /// Raw connection access for tests that tamper with stored rows.
    #[cfg(test)]
    pub(crate) fn connection(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.store.connection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_workspace() -> TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    #[test]
    fn open_in_workspace_uses_default_database_location() {
        let workspace = temp_workspace();

        let canon = Canon::open_in_workspace(workspace.path()).expect("open");

        let expected = workspace
            .path()
            .canonicalize()
            .expect("canonical workspace")
            .join(".canon/canon.db");
        assert_eq!(canon.db_path(), expected);
        assert!(expected.exists());
    }

    #[test]
    fn open_in_workspace_fails_for_missing_root() {
        let result = Canon::open_in_workspace(Path::new("/nonexistent/path/that/does/not/exist"));

        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn canon_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Canon>();
    }

    #[test]
    fn ingest_missing_file_is_file_not_found() {
        let workspace = temp_workspace();
        let canon = Canon::open_in_workspace(workspace.path()).expect("open");

        let err = canon
            .ingest(&workspace.path().join("missing.py"))
            .expect_err("missing file");

        assert!(matches!(err, Error::FileNotFound(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ingest_non_utf8_is_fatal_parse() {
        let workspace = temp_workspace();
        let path = workspace.path().join("latin1.py");
        std::fs::write(&path, b"name = '\xe9'\n").expect("write");
        let canon = Canon::open_in_workspace(workspace.path()).expect("open");

        let err = canon.ingest(&path).expect_err("invalid utf-8");

        assert!(matches!(err, Error::FatalParse { .. }));
        assert!(canon.get_file(&path).expect("query").is_none());
    }

    #[test]
    fn corrupted_segment_is_caught_by_verify() {
        let workspace = temp_workspace();
        let canon = Canon::open_in_workspace(workspace.path()).expect("open");
        let path = Path::new("m.py");
        canon
            .ingest_source(path, "def f():\n    return 1\n")
            .expect("ingest");

        canon
            .connection()
            .expect("conn")
            .execute("UPDATE source_segments SET text = text || ' '", [])
            .expect("tamper");

        let outcome = canon.verify(path).expect("verify");
        assert!(!outcome.raw_match);
        assert!(outcome.tree_match);
        assert_eq!(outcome.status, VerifyStatus::FormattingDrift);
    }
}
