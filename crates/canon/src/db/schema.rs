//! Database schema definition for Canon.

/// Database schema definition.
///
/// Ledger tables (`file_versions`, `component_history`, `drift_events`,
/// `equivalence_proofs`) are append-only: triggers abort any `UPDATE` or
/// `DELETE` against them.
pub(crate) const SCHEMA: &str = r"
-- Tracked source files (one row per logical path, updated in place)
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    raw_hash TEXT NOT NULL,
    tree_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Immutable snapshot headers
CREATE TABLE IF NOT EXISTS file_versions (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    version_number INTEGER NOT NULL,
    previous_version_id INTEGER REFERENCES file_versions(id),
    raw_hash TEXT NOT NULL,
    tree_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    component_count INTEGER NOT NULL,
    change_summary TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (file_id, version_number)
);

-- Components of every snapshot; a snapshot is all rows with one version_id
CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    version_id INTEGER NOT NULL REFERENCES file_versions(id),
    parent_id INTEGER REFERENCES components(id),
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    order_index INTEGER NOT NULL,
    depth INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    start_byte INTEGER NOT NULL,
    end_byte INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    structure_hash TEXT NOT NULL,
    committed_hash TEXT NOT NULL,
    committed_at INTEGER NOT NULL,
    signature TEXT,
    resolution TEXT NOT NULL,
    UNIQUE (version_id, qualified_name)
);

CREATE INDEX IF NOT EXISTS idx_components_file ON components(file_id);
CREATE INDEX IF NOT EXISTS idx_components_parent ON components(parent_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_components_sibling_order
    ON components(version_id, COALESCE(parent_id, 0), order_index);

-- Exact text of each component
-- leading: inter-statement text before a top-level component
-- trailing: text after the last top-level component
CREATE TABLE IF NOT EXISTS source_segments (
    component_id INTEGER PRIMARY KEY REFERENCES components(id),
    leading TEXT NOT NULL,
    text TEXT NOT NULL,
    trailing TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS symbols (
    id INTEGER PRIMARY KEY,
    component_id INTEGER NOT NULL REFERENCES components(id),
    name TEXT NOT NULL,
    scope TEXT NOT NULL,
    access TEXT NOT NULL,
    scope_level INTEGER NOT NULL,
    line INTEGER NOT NULL,
    type_annotation TEXT
);

CREATE INDEX IF NOT EXISTS idx_symbols_component ON symbols(component_id);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);

CREATE TABLE IF NOT EXISTS call_sites (
    id INTEGER PRIMARY KEY,
    component_id INTEGER NOT NULL REFERENCES components(id),
    callee TEXT NOT NULL,
    line INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_call_sites_component ON call_sites(component_id);
CREATE INDEX IF NOT EXISTS idx_call_sites_callee ON call_sites(callee);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    component_id INTEGER NOT NULL REFERENCES components(id),
    module TEXT NOT NULL,   -- e.g. os.path, empty for `from . import x`
    name TEXT,              -- imported name for `from` imports, * for wildcards
    alias TEXT,
    level INTEGER NOT NULL, -- leading dots of a relative import
    is_from INTEGER NOT NULL,
    line INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_imports_component ON imports(component_id);
CREATE INDEX IF NOT EXISTS idx_imports_module ON imports(module);

-- Writes/deletes of names declared `global` inside a function
CREATE TABLE IF NOT EXISTS global_accesses (
    id INTEGER PRIMARY KEY,
    component_id INTEGER NOT NULL REFERENCES components(id),
    name TEXT NOT NULL,
    access TEXT NOT NULL,
    line INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_global_accesses_component ON global_accesses(component_id);

CREATE TABLE IF NOT EXISTS decorators (
    component_id INTEGER NOT NULL REFERENCES components(id),
    position INTEGER NOT NULL,
    name TEXT NOT NULL,
    text TEXT NOT NULL,
    line INTEGER NOT NULL,
    PRIMARY KEY (component_id, position)
);

-- Per-version audit of every component's identity
CREATE TABLE IF NOT EXISTS component_history (
    id INTEGER PRIMARY KEY,
    component_id INTEGER NOT NULL UNIQUE REFERENCES components(id),
    file_id INTEGER NOT NULL REFERENCES files(id),
    version_id INTEGER NOT NULL REFERENCES file_versions(id),
    qualified_name TEXT NOT NULL,
    drift TEXT NOT NULL,
    resolution TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    structure_hash TEXT NOT NULL,
    committed_hash TEXT NOT NULL,
    committed_at INTEGER NOT NULL,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_version ON component_history(version_id);
CREATE INDEX IF NOT EXISTS idx_history_name ON component_history(file_id, qualified_name);

CREATE TABLE IF NOT EXISTS drift_events (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    version_id INTEGER NOT NULL REFERENCES file_versions(id),
    previous_version_id INTEGER REFERENCES file_versions(id),
    qualified_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    old_value TEXT,
    new_value TEXT,
    detected_at INTEGER NOT NULL,
    UNIQUE (version_id, qualified_name)
);

CREATE INDEX IF NOT EXISTS idx_drift_file ON drift_events(file_id);

CREATE TABLE IF NOT EXISTS equivalence_proofs (
    id INTEGER PRIMARY KEY,
    file_id INTEGER NOT NULL REFERENCES files(id),
    version_id INTEGER NOT NULL REFERENCES file_versions(id),
    original_raw_hash TEXT NOT NULL,
    rebuilt_raw_hash TEXT NOT NULL,
    original_tree_hash TEXT NOT NULL,
    rebuilt_tree_hash TEXT,
    raw_match INTEGER NOT NULL,
    tree_match INTEGER NOT NULL,
    matched INTEGER NOT NULL,
    status TEXT NOT NULL,   -- PASS or DRIFT_DETECTED
    mismatch TEXT,          -- formatting_only or structural
    verified_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_proofs_file ON equivalence_proofs(file_id);

-- Append-only ledgers
CREATE TRIGGER IF NOT EXISTS file_versions_no_update BEFORE UPDATE ON file_versions
BEGIN SELECT RAISE(ABORT, 'file_versions is append-only'); END;
CREATE TRIGGER IF NOT EXISTS file_versions_no_delete BEFORE DELETE ON file_versions
BEGIN SELECT RAISE(ABORT, 'file_versions is append-only'); END;

CREATE TRIGGER IF NOT EXISTS component_history_no_update BEFORE UPDATE ON component_history
BEGIN SELECT RAISE(ABORT, 'component_history is append-only'); END;
CREATE TRIGGER IF NOT EXISTS component_history_no_delete BEFORE DELETE ON component_history
BEGIN SELECT RAISE(ABORT, 'component_history is append-only'); END;

CREATE TRIGGER IF NOT EXISTS drift_events_no_update BEFORE UPDATE ON drift_events
BEGIN SELECT RAISE(ABORT, 'drift_events is append-only'); END;
CREATE TRIGGER IF NOT EXISTS drift_events_no_delete BEFORE DELETE ON drift_events
BEGIN SELECT RAISE(ABORT, 'drift_events is append-only'); END;

CREATE TRIGGER IF NOT EXISTS equivalence_proofs_no_update BEFORE UPDATE ON equivalence_proofs
BEGIN SELECT RAISE(ABORT, 'equivalence_proofs is append-only'); END;
CREATE TRIGGER IF NOT EXISTS equivalence_proofs_no_delete BEFORE DELETE ON equivalence_proofs
BEGIN SELECT RAISE(ABORT, 'equivalence_proofs is append-only'); END;

-- Components of each file's latest version
CREATE VIEW IF NOT EXISTS live_components AS
SELECT c.*
FROM components c
WHERE c.version_id = (
    SELECT v.id FROM file_versions v
    WHERE v.file_id = c.file_id
    ORDER BY v.version_number DESC
    LIMIT 1
);
";
