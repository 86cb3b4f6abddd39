//! Configuration for a Canon workspace.
//!
//! Settings live in `.canon/config.yaml` under the workspace root. Every key is
//! optional; a missing file means all defaults.
//!
//! ```yaml
//! database: .canon/canon.db
//! duplicate-names: suffix   # or: reject
//! record-reads: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the Canon directory inside a workspace.
pub const CANON_DIR_NAME: &str = ".canon";

/// Name of the configuration file inside [`CANON_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default database location, relative to the workspace root.
pub const DEFAULT_DATABASE: &str = ".canon/canon.db";

/// What to do when two named definitions share a qualified name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Disambiguate later occurrences with `#2`, `#3`, ...
    ///
    /// Python routinely redefines names (`@property` / `@x.setter` pairs,
    /// conditional definitions), so this is the default.
    #[default]
    Suffix,
    /// Abort the ingestion with [`Error::IdentityAmbiguity`].
    Reject,
}

/// Configuration for one Canon instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CanonConfig {
    /// Database path. Relative paths resolve against the workspace root.
    pub database: PathBuf,

    /// Policy for duplicate function/class names within a file.
    pub duplicate_names: DuplicatePolicy,

    /// Record reads of function-local names as symbols.
    pub record_reads: bool,

    /// Directory that relative paths resolve against. Not persisted.
    #[serde(skip)]
    pub workspace_root: PathBuf,
}

impl Default for CanonConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            duplicate_names: DuplicatePolicy::Suffix,
            record_reads: true,
            workspace_root: PathBuf::from("."),
        }
    }
}

impl CanonConfig {
    /// Defaults rooted at `workspace_root`.
    #[must_use]
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// The workspace root is left at its default; callers that know the
    /// workspace set it afterwards.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load `.canon/config.yaml` under `workspace_root`, or defaults if absent.
    pub fn discover(workspace_root: &Path) -> Result<Self> {
        let path = Self::config_path(workspace_root);
        let mut config = if path.is_file() {
            tracing::debug!(path = %path.display(), "Loading configuration");
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.workspace_root = workspace_root.to_path_buf();
        Ok(config)
    }

    /// Save configuration as YAML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Location of the configuration file for a workspace.
    #[must_use]
    pub fn config_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(CANON_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// The database path with relative paths resolved against the workspace.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            self.workspace_root.join(&self.database)
        }
    }

    /// Override the database location.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }

    /// Override the duplicate-name policy.
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_names = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CanonConfig::default();

        assert_eq!(config.database, PathBuf::from(".canon/canon.db"));
        assert_eq!(config.duplicate_names, DuplicatePolicy::Suffix);
        assert!(config.record_reads);
    }

    #[test]
    fn discover_without_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("should create temp dir");

        let config = CanonConfig::discover(dir.path()).expect("discover should succeed");

        assert_eq!(config.workspace_root, dir.path());
        assert_eq!(config.database_path(), dir.path().join(".canon/canon.db"));
    }

    #[test]
    fn discover_reads_partial_yaml() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = CanonConfig::config_path(dir.path());
        std::fs::create_dir_all(path.parent().expect("config has parent"))
            .expect("should create .canon");
        std::fs::write(&path, "duplicate-names: reject\n").expect("should write config");

        let config = CanonConfig::discover(dir.path()).expect("discover should succeed");

        assert_eq!(config.duplicate_names, DuplicatePolicy::Reject);
        assert!(config.record_reads, "unspecified keys keep defaults");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "databse: typo.db\n").expect("should write config");

        let err = CanonConfig::load(&path).expect_err("typo should fail");

        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("nested").join("config.yaml");
        let config = CanonConfig::default()
            .with_database("/var/lib/canon.db")
            .with_duplicate_policy(DuplicatePolicy::Reject);

        config.save(&path).expect("save should succeed");
        let loaded = CanonConfig::load(&path).expect("load should succeed");

        assert_eq!(loaded.database, PathBuf::from("/var/lib/canon.db"));
        assert_eq!(loaded.duplicate_names, DuplicatePolicy::Reject);
    }

    #[test]
    fn absolute_database_ignores_workspace_root() {
        let config = CanonConfig::for_workspace(Path::new("/work")).with_database("/tmp/x.db");

        assert_eq!(config.database_path(), PathBuf::from("/tmp/x.db"));
    }
}
