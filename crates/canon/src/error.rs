//! Error types for Canon operations.
//!
//! Errors fall into three groups:
//!
//! - **Input problems**: the source cannot be turned into a trustworthy
//!   component tree (`FatalParse`, `IdentityAmbiguity`, `FileNotFound`).
//! - **Infrastructure problems**: the store or filesystem failed
//!   (`StoreUnavailable`, `Database`, `Io`).
//! - **Usage problems**: bad configuration or a lookup for something that was
//!   never ingested (`Config`, `UnknownFile`).
//!
//! ## Error Philosophy
//!
//! An ingestion is all-or-nothing. Anything that would leave a partially
//! written snapshot aborts the whole ingestion and rolls back. The one problem
//! that is recovered locally is a component whose exact text cannot be
//! recovered: it is stored as an empty segment, logged, and counted in the
//! [`IngestReport`](crate::IngestReport).
//!
//! A verification mismatch is an expected outcome and is reported through
//! [`VerifyOutcome`](crate::VerifyOutcome), never as an `Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Canon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Canon operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The source could not be parsed into a complete syntax tree.
    ///
    /// Nothing is persisted for the ingestion that raised it.
    #[error("cannot parse {}: {message}", path.display())]
    FatalParse {
        /// Logical path of the rejected source
        path: PathBuf,
        /// What the parser objected to
        message: String,
    },

    /// Two named definitions resolved to the same qualified name.
    ///
    /// Only raised under [`DuplicatePolicy::Reject`](crate::DuplicatePolicy::Reject).
    #[error("ambiguous identity in {}: `{qualified_name}` is defined more than once", path.display())]
    IdentityAmbiguity {
        /// Logical path of the rejected source
        path: PathBuf,
        /// The qualified name that occurs twice
        qualified_name: String,
    },

    /// The file to ingest does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// No File row exists for the requested path or id.
    #[error("file has not been ingested: {0}")]
    UnknownFile(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tree-sitter infrastructure failed (grammar could not be loaded)
    #[error("parser error: {0}")]
    Parser(String),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant violated (e.g., mutex poisoned, corrupt row)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Process exit code for this error, as used by the `canon` binary.
    ///
    /// | Code | Meaning |
    /// |------|---------|
    /// | 1 | generic failure |
    /// | 2 | file not found |
    /// | 3 | syntax error (unparsable source, ambiguous identity) |
    /// | 4 | store unavailable or database failure |
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::FileNotFound(_) => 2,
            Self::FatalParse { .. } | Self::IdentityAmbiguity { .. } => 3,
            Self::StoreUnavailable(_) | Self::Database(_) => 4,
            Self::UnknownFile(_)
            | Self::Io(_)
            | Self::Parser(_)
            | Self::Config(_)
            | Self::Internal(_) => 1,
        }
    }

    /// Returns `true` if the source itself was rejected.
    ///
    /// These are problems the user fixes by editing the file, not the setup.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::FatalParse { .. } | Self::IdentityAmbiguity { .. } | Self::FileNotFound(_)
        )
    }

    pub(crate) fn fatal_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::FatalParse {
            path: path.into(),
            message: message.into(),
        }
    }
}
