//! Structural drift between two snapshots of a file.
//!
//! Snapshots are compared by qualified name, never by row id or position:
//!
//! - only in the new snapshot: ADDED (`import_added` for imports)
//! - only in the old snapshot: REMOVED (`import_removed` for imports)
//! - in both, same content hash: unchanged, no event
//! - in both, different content hash: MODIFIED, categorized by the first
//!   signal that differs, in this order: structure hash (equal means
//!   `formatting_only`), signature, imports, calls, symbols, and otherwise
//!   `body_changed`
//!
//! A rename is a removal plus an addition. The result does not depend on the
//! order components are supplied in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::extract::Extraction;
use crate::types::{
    AccessKind, ChangeKind, ComponentKind, DriftCategory, DriftSummary, ScopeKind, Severity,
};

/// Everything drift detection needs to know about one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFacts {
    /// Identity key
    pub qualified_name: String,
    /// Structural kind
    pub kind: ComponentKind,
    /// SHA-256 of the exact text
    pub content_hash: String,
    /// SHA-256 of the serialized subtree
    pub structure_hash: String,
    /// Normalized signature
    pub signature: Option<String>,
    /// Callee keys
    pub calls: BTreeSet<String>,
    /// Import keys
    pub imports: BTreeSet<String>,
    /// Symbol keys
    pub symbols: BTreeSet<String>,
}

/// One classified change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftChange {
    /// Identity key
    pub qualified_name: String,
    /// Added, removed or modified
    pub kind: ChangeKind,
    /// Finer classification
    pub category: DriftCategory,
    /// Severity tier of the category
    pub severity: Severity,
    /// Value before the change
    pub old_value: Option<String>,
    /// Value after the change
    pub new_value: Option<String>,
}

/// Result of comparing two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Changes sorted by qualified name
    pub changes: Vec<DriftChange>,
    /// Added / removed / modified / unchanged counts
    pub summary: DriftSummary,
    /// Classification of every name in the new snapshot
    pub classification: BTreeMap<String, ChangeKind>,
}

impl DriftReport {
    /// Classification of a qualified name of the new snapshot.
    ///
    /// Names not in the new snapshot report [`ChangeKind::Removed`].
    #[must_use]
    pub fn change_for(&self, qualified_name: &str) -> ChangeKind {
        self.classification
            .get(qualified_name)
            .copied()
            .unwrap_or(ChangeKind::Removed)
    }

    /// Report for a first version: nothing to drift from.
    ///
    /// No changes and an all-zero summary; every component is still classified
    /// [`ChangeKind::Added`] for its history row.
    #[must_use]
    pub fn baseline(new: &[ComponentFacts]) -> Self {
        Self {
            changes: Vec::new(),
            summary: DriftSummary::default(),
            classification: new
                .iter()
                .map(|f| (f.qualified_name.clone(), ChangeKind::Added))
                .collect(),
        }
    }

    /// Human-readable summary stored on the version row.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!(
            "{} added, {} removed, {} modified, {} unchanged",
            self.summary.added, self.summary.removed, self.summary.modified, self.summary.unchanged
        );
        if let Some(highest) = self.changes.iter().map(|c| c.severity).max() {
            let _ = write!(out, "; highest severity {}", highest.as_str());
        }
        out
    }
}

// ============================================================================
// Fact keys
// ============================================================================

/// Comparable key for an import record.
#[must_use]
pub fn import_key(module: &str, name: Option<&str>, alias: Option<&str>, level: u32) -> String {
    let mut key = ".".repeat(level as usize);
    key.push_str(module);
    if let Some(name) = name {
        key.push(':');
        key.push_str(name);
    }
    if let Some(alias) = alias {
        key.push_str(" as ");
        key.push_str(alias);
    }
    key
}

/// Comparable key for a symbol access.
#[must_use]
pub fn symbol_key(name: &str, scope: ScopeKind, access: AccessKind) -> String {
    format!("{name}:{}:{}", scope.as_str(), access.as_str())
}

/// Collect facts for every component of a staged extraction.
#[must_use]
pub fn facts_from_extraction(extraction: &Extraction) -> Vec<ComponentFacts> {
    let mut facts: Vec<ComponentFacts> = extraction
        .components
        .iter()
        .map(|c| ComponentFacts {
            qualified_name: c.qualified_name.clone(),
            kind: c.kind,
            content_hash: c.content_hash.clone(),
            structure_hash: c.structure_hash.clone(),
            signature: c.signature.clone(),
            calls: BTreeSet::new(),
            imports: BTreeSet::new(),
            symbols: BTreeSet::new(),
        })
        .collect();

    for call in &extraction.calls {
        facts[call.component].calls.insert(call.callee.clone());
    }
    for import in &extraction.imports {
        facts[import.component].imports.insert(import_key(
            &import.module,
            import.name.as_deref(),
            import.alias.as_deref(),
            import.level,
        ));
    }
    for symbol in &extraction.symbols {
        facts[symbol.component]
            .symbols
            .insert(symbol_key(&symbol.name, symbol.scope, symbol.access));
    }
    facts
}

// ============================================================================
// Comparison
// ============================================================================

/// Compare two snapshots by qualified name.
#[must_use]
pub fn compare(old: &[ComponentFacts], new: &[ComponentFacts]) -> DriftReport {
    let old_by_name: BTreeMap<&str, &ComponentFacts> =
        old.iter().map(|f| (f.qualified_name.as_str(), f)).collect();
    let new_by_name: BTreeMap<&str, &ComponentFacts> =
        new.iter().map(|f| (f.qualified_name.as_str(), f)).collect();

    let mut report = DriftReport::default();

    for (name, current) in &new_by_name {
        match old_by_name.get(name) {
            None => {
                let category = if current.kind == ComponentKind::Import {
                    DriftCategory::ImportAdded
                } else {
                    DriftCategory::ComponentAdded
                };
                report.summary.added += 1;
                report.classification.insert((*name).to_string(), ChangeKind::Added);
                report.changes.push(DriftChange {
                    qualified_name: (*name).to_string(),
                    kind: ChangeKind::Added,
                    category,
                    severity: category.severity(),
                    old_value: None,
                    new_value: Some(current.content_hash.clone()),
                });
            }
            Some(previous) if previous.content_hash == current.content_hash => {
                report.summary.unchanged += 1;
                report
                    .classification
                    .insert((*name).to_string(), ChangeKind::Unchanged);
            }
            Some(previous) => {
                report.summary.modified += 1;
                report
                    .classification
                    .insert((*name).to_string(), ChangeKind::Modified);
                report.changes.push(classify_modification(previous, current));
            }
        }
    }

    for (name, previous) in &old_by_name {
        if new_by_name.contains_key(name) {
            continue;
        }
        let category = if previous.kind == ComponentKind::Import {
            DriftCategory::ImportRemoved
        } else {
            DriftCategory::ComponentRemoved
        };
        report.summary.removed += 1;
        report.changes.push(DriftChange {
            qualified_name: (*name).to_string(),
            kind: ChangeKind::Removed,
            category,
            severity: category.severity(),
            old_value: Some(previous.content_hash.clone()),
            new_value: None,
        });
    }

    report
        .changes
        .sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    report
}

fn classify_modification(previous: &ComponentFacts, current: &ComponentFacts) -> DriftChange {
    let category = if previous.structure_hash == current.structure_hash {
        DriftCategory::FormattingOnly
    } else if previous.signature != current.signature {
        DriftCategory::SignatureChanged
    } else if previous.imports != current.imports {
        DriftCategory::ImportsChanged
    } else if previous.calls != current.calls {
        DriftCategory::CallsChanged
    } else if previous.symbols != current.symbols {
        DriftCategory::SymbolsChanged
    } else {
        DriftCategory::BodyChanged
    };

    let (old_value, new_value) = if category == DriftCategory::SignatureChanged {
        (previous.signature.clone(), current.signature.clone())
    } else {
        (
            Some(previous.content_hash.clone()),
            Some(current.content_hash.clone()),
        )
    };

    DriftChange {
        qualified_name: current.qualified_name.clone(),
        kind: ChangeKind::Modified,
        category,
        severity: category.severity(),
        old_value,
        new_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractOptions, extract};
    use proptest::prelude::*;
    use rstest::rstest;
    use std::path::Path;

    fn facts(code: &str) -> Vec<ComponentFacts> {
        let extraction =
            extract(Path::new("m.py"), code, &ExtractOptions::default()).expect("extract");
        facts_from_extraction(&extraction)
    }

    fn categories(report: &DriftReport) -> Vec<(&str, ChangeKind, DriftCategory)> {
        report
            .changes
            .iter()
            .map(|c| (c.qualified_name.as_str(), c.kind, c.category))
            .collect()
    }

    #[test]
    fn baseline_has_no_drift_but_classifies_additions() {
        let report = DriftReport::baseline(&facts("import os\ndef f():\n    pass\n"));

        assert!(report.changes.is_empty());
        assert_eq!(report.summary, DriftSummary::default());
        assert_eq!(report.change_for("f"), ChangeKind::Added);
        assert_eq!(report.change_for("import:os"), ChangeKind::Added);
    }

    #[test]
    fn components_missing_from_old_snapshot_are_additions() {
        let report = compare(
            &facts("x = 1\n"),
            &facts("x = 1\nimport os\ndef f():\n    pass\n"),
        );

        assert_eq!(report.summary.added, 2);
        assert_eq!(
            categories(&report),
            vec![
                ("f", ChangeKind::Added, DriftCategory::ComponentAdded),
                ("import:os", ChangeKind::Added, DriftCategory::ImportAdded),
            ]
        );
    }

    #[test]
    fn identical_snapshots_have_no_changes() {
        let code = "def f():\n    return 1\n";
        let report = compare(&facts(code), &facts(code));

        assert!(report.changes.is_empty());
        assert_eq!(report.summary.unchanged, 1);
        assert_eq!(report.change_for("f"), ChangeKind::Unchanged);
    }

    #[test]
    fn rename_is_removal_plus_addition() {
        let report = compare(
            &facts("def old():\n    return 1\n"),
            &facts("def new():\n    return 1\n"),
        );

        assert_eq!(
            categories(&report),
            vec![
                ("new", ChangeKind::Added, DriftCategory::ComponentAdded),
                ("old", ChangeKind::Removed, DriftCategory::ComponentRemoved),
            ]
        );
    }

    #[rstest]
    #[case::formatting(
        "def f(a):\n    return g(a)\n",
        "def f( a ):\n    return g( a )  # same\n",
        DriftCategory::FormattingOnly
    )]
    #[case::signature(
        "def f(a):\n    return g(a)\n",
        "def f(a, b=1):\n    return g(a)\n",
        DriftCategory::SignatureChanged
    )]
    #[case::imports(
        "def f():\n    import os\n    return 1\n",
        "def f():\n    import sys\n    return 1\n",
        DriftCategory::ImportsChanged
    )]
    #[case::calls(
        "def f(a):\n    return g(a)\n",
        "def f(a):\n    return h(a)\n",
        DriftCategory::CallsChanged
    )]
    #[case::symbols(
        "def f(a):\n    x = a\n    return x\n",
        "def f(a):\n    y = a\n    return y\n",
        DriftCategory::SymbolsChanged
    )]
    #[case::body(
        "def f(a):\n    return a + 1\n",
        "def f(a):\n    return a + 2\n",
        DriftCategory::BodyChanged
    )]
    fn modifications_are_categorized_in_priority_order(
        #[case] before: &str,
        #[case] after: &str,
        #[case] expected: DriftCategory,
    ) {
        let report = compare(&facts(before), &facts(after));

        assert_eq!(report.summary.modified, 1);
        assert_eq!(
            categories(&report),
            vec![("f", ChangeKind::Modified, expected)]
        );
    }

    #[test]
    fn signature_change_records_old_and_new_signature() {
        let report = compare(
            &facts("def f(a):\n    pass\n"),
            &facts("def f(a, b):\n    pass\n"),
        );

        let change = &report.changes[0];
        assert_eq!(change.severity, Severity::High);
        assert_eq!(change.old_value.as_deref(), Some("(a)"));
        assert_eq!(change.new_value.as_deref(), Some("(a,b)"));
    }

    #[test]
    fn describe_mentions_highest_severity() {
        let report = compare(
            &facts("def f():\n    pass\n"),
            &facts("x = 1\n"),
        );

        let text = report.describe();
        assert!(text.starts_with("1 added, 1 removed, 0 modified, 0 unchanged"));
        assert!(text.ends_with("highest severity high"));
    }

    fn snapshot() -> impl Strategy<Value = Vec<ComponentFacts>> {
        prop::collection::btree_map("[a-e]", ("[xy]", "[pq]"), 0..6).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(name, (content, structure))| ComponentFacts {
                    qualified_name: name,
                    kind: ComponentKind::Function,
                    content_hash: content,
                    structure_hash: structure,
                    signature: None,
                    calls: BTreeSet::new(),
                    imports: BTreeSet::new(),
                    symbols: BTreeSet::new(),
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn counts_partition_the_union_of_names(old in snapshot(), new in snapshot()) {
            let report = compare(&old, &new);
            let union: BTreeSet<&str> = old
                .iter()
                .chain(new.iter())
                .map(|f| f.qualified_name.as_str())
                .collect();

            let s = report.summary;
            prop_assert_eq!(s.added + s.removed + s.modified + s.unchanged, union.len());
            prop_assert_eq!(s.added + s.modified + s.unchanged, new.len());
            prop_assert_eq!(s.removed + s.modified + s.unchanged, old.len());
        }

        #[test]
        fn comparison_ignores_input_order(old in snapshot(), new in snapshot()) {
            let mut old_rev = old.clone();
            old_rev.reverse();
            let mut new_rev = new.clone();
            new_rev.reverse();

            prop_assert_eq!(compare(&old, &new), compare(&old_rev, &new_rev));
        }
    }
}
