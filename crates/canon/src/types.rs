//! Domain types for Canon.
//!
//! These types represent the core domain model:
//! - **Entities**: `SourceFile`, `Component`, `SourceSegment`, `Symbol`,
//!   `CallSite`, `ImportRecord`, `GlobalAccess`, `Decorator` (stored in the database)
//! - **Ledgers**: `FileVersion`, `ComponentHistory`, `DriftEvent`,
//!   `EquivalenceProof` (append-only)
//! - **Results**: `IngestReport`, `DriftSummary`, `VerifyOutcome`, `DatabaseStats`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Identity | Qualified name | Row ids change every version; names survive re-ingestion |
//! | Snapshots | Components keyed by version | Old versions stay readable for drift comparison |
//! | Hashes | Lowercase hex SHA-256 | Stable across processes and platforms |
//! | Timestamps | Unix nanoseconds (`i64`) | Matches `SQLite` integer storage |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Strongly-typed ID wrappers
// ============================================================================

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Extract the raw i64 value.
            #[must_use]
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id! {
    /// A strongly-typed file ID.
    ///
    /// Stable for the lifetime of the database: re-ingestion updates the File
    /// row in place.
    FileId
}

row_id! {
    /// A strongly-typed component ID.
    ///
    /// Component rows belong to exactly one version; the same qualified name
    /// gets a new `ComponentId` in every version.
    ComponentId
}

row_id! {
    /// A strongly-typed file version ID.
    VersionId
}

// ============================================================================
// Enums
// ============================================================================

/// Structural kind of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Function defined at module level or nested inside another function
    Function,
    /// Function defined directly inside a class body
    Method,
    /// Class definition
    Class,
    /// `import` / `from ... import` statement
    Import,
    /// Assignment statement (module variable or class attribute)
    Assignment,
    /// Bare expression statement (calls, docstrings)
    Expression,
    /// Any other statement (`if`, `for`, `try`, ...), or a file with no statements
    Block,
}

impl ComponentKind {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Import => "import",
            Self::Assignment => "assignment",
            Self::Expression => "expression",
            Self::Block => "block",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(Self::Function),
            "method" => Some(Self::Method),
            "class" => Some(Self::Class),
            "import" => Some(Self::Import),
            "assignment" => Some(Self::Assignment),
            "expression" => Some(Self::Expression),
            "block" => Some(Self::Block),
            _ => None,
        }
    }

    /// Whether the component carries a user-chosen name (function or class).
    ///
    /// Only named definitions are subject to the duplicate-name policy; every
    /// other kind is disambiguated positionally.
    #[must_use]
    pub fn is_named_definition(&self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Class)
    }
}

/// Where a symbol binding lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Function parameter
    Parameter,
    /// Name local to a function
    Local,
    /// Module-level name (or a name declared `global`)
    Global,
    /// Attribute target (`self.x`) or class attribute
    Attribute,
    /// Subscript target (`cache[key]`)
    Subscript,
}

impl ScopeKind {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parameter => "parameter",
            Self::Local => "local",
            Self::Global => "global",
            Self::Attribute => "attribute",
            Self::Subscript => "subscript",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "parameter" => Some(Self::Parameter),
            "local" => Some(Self::Local),
            "global" => Some(Self::Global),
            "attribute" => Some(Self::Attribute),
            "subscript" => Some(Self::Subscript),
            _ => None,
        }
    }
}

/// How a name is accessed at a given site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    /// Value is loaded
    Read,
    /// Value is bound or rebound
    Write,
    /// Binding is removed with `del`
    Delete,
    /// Read-modify-write (augmented assignment)
    Both,
}

impl AccessKind {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Both => "both",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "delete" => Some(Self::Delete),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Whether this access changes the binding.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// How a component's identity was resolved against the previous version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityResolution {
    /// The qualified name existed in the previous version; its committed
    /// identity was carried forward.
    Adopt,
    /// First appearance of the qualified name.
    New,
}

impl IdentityResolution {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adopt => "adopt",
            Self::New => "new",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "adopt" => Some(Self::Adopt),
            "new" => Some(Self::New),
            _ => None,
        }
    }
}

/// Change classification of a qualified name between two versions.
///
/// Drift events use `Added`, `Removed` and `Modified`. History rows use
/// `Added`, `Modified` and `Unchanged` (a removed component has no row in the
/// new version).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Only present in the new version
    Added,
    /// Only present in the previous version
    Removed,
    /// Present in both with different content hashes
    Modified,
    /// Present in both with identical content hashes
    Unchanged,
}

impl ChangeKind {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(Self::Added),
            "removed" => Some(Self::Removed),
            "modified" => Some(Self::Modified),
            "unchanged" => Some(Self::Unchanged),
            _ => None,
        }
    }
}

/// What changed, at a finer grain than [`ChangeKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftCategory {
    /// A new non-import component appeared
    ComponentAdded,
    /// A non-import component disappeared
    ComponentRemoved,
    /// A new import statement appeared
    ImportAdded,
    /// An import statement disappeared
    ImportRemoved,
    /// Text changed but the syntax tree did not (whitespace, comments)
    FormattingOnly,
    /// Parameters, return annotation, bases or decorators changed
    SignatureChanged,
    /// The set of imported names changed
    ImportsChanged,
    /// The set of called names changed
    CallsChanged,
    /// The set of bound names changed
    SymbolsChanged,
    /// Structure changed with no finer signal
    BodyChanged,
}

impl DriftCategory {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ComponentAdded => "component_added",
            Self::ComponentRemoved => "component_removed",
            Self::ImportAdded => "import_added",
            Self::ImportRemoved => "import_removed",
            Self::FormattingOnly => "formatting_only",
            Self::SignatureChanged => "signature_changed",
            Self::ImportsChanged => "imports_changed",
            Self::CallsChanged => "calls_changed",
            Self::SymbolsChanged => "symbols_changed",
            Self::BodyChanged => "body_changed",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "component_added" => Some(Self::ComponentAdded),
            "component_removed" => Some(Self::ComponentRemoved),
            "import_added" => Some(Self::ImportAdded),
            "import_removed" => Some(Self::ImportRemoved),
            "formatting_only" => Some(Self::FormattingOnly),
            "signature_changed" => Some(Self::SignatureChanged),
            "imports_changed" => Some(Self::ImportsChanged),
            "calls_changed" => Some(Self::CallsChanged),
            "symbols_changed" => Some(Self::SymbolsChanged),
            "body_changed" => Some(Self::BodyChanged),
            _ => None,
        }
    }

    /// Severity tier for this category.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::SignatureChanged | Self::ComponentRemoved => Severity::High,
            Self::CallsChanged
            | Self::ImportsChanged
            | Self::ImportRemoved
            | Self::ComponentAdded => Severity::Medium,
            Self::SymbolsChanged | Self::BodyChanged | Self::ImportAdded => Severity::Low,
            Self::FormattingOnly => Severity::Info,
        }
    }
}

/// Drift severity tiers, ordered from least to most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No structural effect
    Info,
    /// Local change
    Low,
    /// Changes what the component depends on
    Medium,
    /// Changes how callers see the component
    High,
}

impl Severity {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Outcome of a rebuild verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    /// Raw and tree hashes both match
    Pass,
    /// Raw bytes differ but the syntax tree is the same
    FormattingDrift,
    /// The syntax tree differs, or the rebuilt text no longer parses
    StructuralDrift,
}

impl VerifyStatus {
    /// Status string recorded on the proof (`PASS` or `DRIFT_DETECTED`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::FormattingDrift | Self::StructuralDrift => "DRIFT_DETECTED",
        }
    }

    /// Mismatch detail, `None` on pass.
    #[must_use]
    pub fn mismatch(&self) -> Option<&'static str> {
        match self {
            Self::Pass => None,
            Self::FormattingDrift => Some("formatting_only"),
            Self::StructuralDrift => Some("structural"),
        }
    }

    /// Parse the stored status and mismatch columns.
    #[must_use]
    pub fn parse(status: &str, mismatch: Option<&str>) -> Option<Self> {
        match (status, mismatch) {
            ("PASS", None) => Some(Self::Pass),
            ("DRIFT_DETECTED", Some("formatting_only")) => Some(Self::FormattingDrift),
            ("DRIFT_DETECTED", Some("structural")) => Some(Self::StructuralDrift),
            _ => None,
        }
    }

    /// Classify from the two comparison results.
    #[must_use]
    pub fn from_matches(raw_match: bool, tree_match: bool) -> Self {
        match (raw_match, tree_match) {
            (true, true) => Self::Pass,
            (false, true) => Self::FormattingDrift,
            // A raw match with a tree mismatch means the recorded tree hash is
            // stale; still a structural disagreement.
            (_, false) => Self::StructuralDrift,
        }
    }
}

impl fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mismatch() {
            Some(kind) => write!(f, "{} ({kind})", self.as_str()),
            None => f.write_str(self.as_str()),
        }
    }
}

// ============================================================================
// Core Entities (stored in database)
// ============================================================================

/// A tracked source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Database primary key, stable across versions
    pub id: FileId,
    /// Logical path
    pub path: PathBuf,
    /// SHA-256 of the raw bytes at the latest version
    pub raw_hash: String,
    /// SHA-256 of the serialized syntax tree at the latest version
    pub tree_hash: String,
    /// Byte size at the latest version
    pub size_bytes: u64,
    /// When the file was first ingested (unix nanoseconds)
    pub created_at: i64,
    /// When the file was last ingested (unix nanoseconds)
    pub updated_at: i64,
}

/// A structural unit within one version of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Database primary key
    pub id: ComponentId,
    /// Owning file
    pub file_id: FileId,
    /// Version this row belongs to
    pub version_id: VersionId,
    /// Enclosing component, `None` for top-level components
    pub parent_id: Option<ComponentId>,
    /// Structural kind
    pub kind: ComponentKind,
    /// Short name (e.g., `method_b`)
    pub name: String,
    /// Dot-joined path from the file root (e.g., `ClassA.method_b`)
    pub qualified_name: String,
    /// Position among siblings, gap-free from 0
    pub order_index: u32,
    /// Nesting depth, 0 for top-level components
    pub depth: u32,
    /// First line (1-indexed)
    pub start_line: u32,
    /// Last line (1-indexed, inclusive)
    pub end_line: u32,
    /// SHA-256 of the exact source text
    pub content_hash: String,
    /// SHA-256 of the serialized subtree (whitespace and comments excluded)
    pub structure_hash: String,
    /// Hash recognized as the official version of this qualified name
    pub committed_hash: String,
    /// When `committed_hash` was last set (unix nanoseconds)
    pub committed_at: i64,
    /// Parameter list / bases, prefixed with decorators
    pub signature: Option<String>,
    /// How the identity was resolved at ingestion
    pub resolution: IdentityResolution,
}

/// Exact source text of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSegment {
    /// Owning component
    pub component_id: ComponentId,
    /// Text between the previous top-level component and this one
    pub leading: String,
    /// Exact text of the component
    pub text: String,
    /// Text after the last top-level component (empty elsewhere)
    pub trailing: String,
}

impl SourceSegment {
    /// The bytes this segment contributes to a reconstruction.
    #[must_use]
    pub fn assembled(&self) -> String {
        let mut out =
            String::with_capacity(self.leading.len() + self.text.len() + self.trailing.len());
        out.push_str(&self.leading);
        out.push_str(&self.text);
        out.push_str(&self.trailing);
        out
    }
}

/// A named binding observed inside a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Enclosing component
    pub component_id: ComponentId,
    /// Bound name (`x`, `self.cache`, `table`)
    pub name: String,
    /// Where the binding lives
    pub scope: ScopeKind,
    /// How the name is accessed
    pub access: AccessKind,
    /// Nesting depth of the scope (0 = module)
    pub scope_level: u32,
    /// Line of the access (1-indexed)
    pub line: u32,
    /// Annotation text, when present
    pub type_annotation: Option<String>,
}

/// A call made from inside a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Calling component
    pub component_id: ComponentId,
    /// Callee expression with whitespace removed (`os.path.join`)
    pub callee: String,
    /// Line of the call (1-indexed)
    pub line: u32,
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Component containing the import statement
    pub component_id: ComponentId,
    /// Module path (`os.path`, empty for `from . import x`)
    pub module: String,
    /// Imported name for `from` imports (`join`, `*`)
    pub name: Option<String>,
    /// `as` alias
    pub alias: Option<String>,
    /// Number of leading dots in a relative import
    pub level: u32,
    /// Whether this came from a `from ... import` statement
    pub is_from: bool,
    /// Line of the statement (1-indexed)
    pub line: u32,
}

impl ImportRecord {
    /// The name this import binds in the importing scope.
    #[must_use]
    pub fn bound_name(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        match &self.name {
            Some(name) => name,
            None => self.module.split('.').next().unwrap_or(&self.module),
        }
    }
}

/// A mutation of a module-level variable from inside a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalAccess {
    /// Mutating component
    pub component_id: ComponentId,
    /// Global name
    pub name: String,
    /// Write, delete or both
    pub access: AccessKind,
    /// Line of the access (1-indexed)
    pub line: u32,
}

/// A decorator attached to a function or class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    /// Decorated component
    pub component_id: ComponentId,
    /// Position in source order, from 0
    pub position: u32,
    /// Decorator callee (`app.route`)
    pub name: String,
    /// Full decorator expression (`app.route("/users")`)
    pub text: String,
    /// Line of the decorator (1-indexed)
    pub line: u32,
}

// ============================================================================
// Ledgers (append-only)
// ============================================================================

/// Immutable snapshot header written by one ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersion {
    /// Database primary key
    pub id: VersionId,
    /// Owning file
    pub file_id: FileId,
    /// Monotonic per file, from 1
    pub version_number: u32,
    /// Previous version, `None` for version 1
    pub previous_version_id: Option<VersionId>,
    /// SHA-256 of the raw bytes
    pub raw_hash: String,
    /// SHA-256 of the serialized syntax tree
    pub tree_hash: String,
    /// Byte size
    pub size_bytes: u64,
    /// Number of components in the snapshot (all depths)
    pub component_count: u32,
    /// Human-readable drift summary
    pub change_summary: String,
    /// When the version was written (unix nanoseconds)
    pub created_at: i64,
}

/// Audit row tying a component to the version it belonged to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHistory {
    /// Component row in that version
    pub component_id: ComponentId,
    /// Version the row belongs to
    pub version_id: VersionId,
    /// Version number, for display
    pub version_number: u32,
    /// Identity key
    pub qualified_name: String,
    /// Classification against the previous version
    pub change: ChangeKind,
    /// How the identity was resolved
    pub resolution: IdentityResolution,
    /// Content hash observed at that version
    pub content_hash: String,
    /// Structure hash observed at that version
    pub structure_hash: String,
    /// Committed hash at that version
    pub committed_hash: String,
    /// Committed timestamp at that version
    pub committed_at: i64,
}

/// One detected structural change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEvent {
    /// Database primary key
    pub id: i64,
    /// Owning file
    pub file_id: FileId,
    /// Version in which the change was detected
    pub version_id: VersionId,
    /// Version compared against
    pub previous_version_id: Option<VersionId>,
    /// Identity key
    pub qualified_name: String,
    /// Added, removed or modified
    pub kind: ChangeKind,
    /// Finer classification
    pub category: DriftCategory,
    /// Severity tier
    pub severity: Severity,
    /// Value before the change (hash or signature)
    pub old_value: Option<String>,
    /// Value after the change
    pub new_value: Option<String>,
    /// Detection time (unix nanoseconds)
    pub detected_at: i64,
}

/// Audit record of one rebuild verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceProof {
    /// Database primary key
    pub id: i64,
    /// Verified file
    pub file_id: FileId,
    /// Version that was rebuilt
    pub version_id: VersionId,
    /// Raw hash recorded at ingestion
    pub original_raw_hash: String,
    /// Raw hash of the rebuilt text
    pub rebuilt_raw_hash: String,
    /// Tree hash recorded at ingestion
    pub original_tree_hash: String,
    /// Tree hash of the rebuilt text, `None` if it no longer parses
    pub rebuilt_tree_hash: Option<String>,
    /// Whether the raw hashes matched
    pub raw_match: bool,
    /// Whether the tree hashes matched
    pub tree_match: bool,
    /// Whether both hashes matched
    pub matched: bool,
    /// Verification status
    pub status: VerifyStatus,
    /// When the check ran (unix nanoseconds)
    pub verified_at: i64,
}

// ============================================================================
// Operation Results
// ============================================================================

/// Counts produced by one drift detection pass.
///
/// `added`, `removed` and `unchanged + modified` partition the union of both
/// versions' qualified names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    /// Names only in the new version
    pub added: usize,
    /// Names only in the previous version
    pub removed: usize,
    /// Names in both with different content
    pub modified: usize,
    /// Names in both with identical content
    pub unchanged: usize,
}

impl DriftSummary {
    /// Whether anything changed.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        self.added + self.removed + self.modified > 0
    }
}

impl fmt::Display for DriftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{} -{} ~{} ={}",
            self.added, self.removed, self.modified, self.unchanged
        )
    }
}

/// Result of one ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Logical path that was ingested
    pub path: PathBuf,
    /// Stable file id
    pub file_id: FileId,
    /// The new version row
    pub version_id: VersionId,
    /// Its version number
    pub version_number: u32,
    /// Components in the new snapshot (all depths)
    pub component_count: usize,
    /// Drift against the previous version
    pub drift: DriftSummary,
    /// Components whose text could not be recovered
    pub missing_segments: usize,
}

/// Result of a rebuild verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    /// Verified file
    pub file_id: FileId,
    /// Version that was rebuilt
    pub version_number: u32,
    /// Whether raw and tree hashes both matched
    pub matched: bool,
    /// Whether the raw hash matched
    pub raw_match: bool,
    /// Whether the tree hash matched
    pub tree_match: bool,
    /// Raw hash of the rebuilt text
    pub raw_hash: String,
    /// Tree hash of the rebuilt text, `None` if it no longer parses
    pub tree_hash: Option<String>,
    /// Classification of the outcome
    pub status: VerifyStatus,
}

/// Statistics about the database contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseStats {
    /// Tracked files
    pub file_count: usize,
    /// Versions across all files
    pub version_count: usize,
    /// Components in the latest version of every file, by kind
    pub live_components_by_kind: HashMap<ComponentKind, usize>,
    /// Components across all versions
    pub component_rows: usize,
    /// Drift events, all versions
    pub drift_event_count: usize,
    /// Equivalence proofs recorded
    pub proof_count: usize,
    /// Proofs that did not pass
    pub failed_proof_count: usize,
}
