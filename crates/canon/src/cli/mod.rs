//! CLI command implementations.

mod display;

pub mod components;
pub mod drift;
pub mod history;
pub mod ingest;
pub mod stats;
pub mod verify;
pub mod versions;

use std::path::PathBuf;

use canon::{Canon, CanonConfig};

/// Options shared by every command.
pub struct Context {
    /// Workspace root; relative database paths resolve against it.
    pub workspace: PathBuf,
    /// Database path overriding the configured one.
    pub database: Option<PathBuf>,
    /// Print results as JSON instead of text.
    pub json: bool,
}

impl Context {
    /// Open the store for this invocation.
    pub fn open(&self) -> Result<Canon, canon::Error> {
        let workspace = self.workspace.canonicalize().map_err(|e| {
            canon::Error::Io(std::io::Error::new(
                e.kind(),
                format!("workspace root not found: {}", self.workspace.display()),
            ))
        })?;

        let mut config = CanonConfig::discover(&workspace)?;
        if let Some(database) = &self.database {
            config = config.with_database(database);
        }
        Canon::open(config)
    }
}
