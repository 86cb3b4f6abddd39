//! Source text to staged extraction.
//!
//! [`extract`] parses, walks the tree with the language's
//! [`LanguageSupport`](crate::languages::LanguageSupport) implementation, and
//! finalizes the result:
//!
//! - qualified names are built from the parent chain and made unique within
//!   the file (`x`, `x#2`, ...), or rejected under [`DuplicatePolicy::Reject`];
//! - sibling order indices are assigned gap-free from 0.
//!
//! Nothing here touches the store. A failed extraction leaves no trace.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::{CanonConfig, DuplicatePolicy};
use crate::error::{Error, Result};
use crate::languages::{self, LanguageSupport};

pub use crate::languages::common::{
    ExtractedCall, ExtractedComponent, ExtractedDecorator, ExtractedGlobal, ExtractedImport,
    ExtractedSymbol, Extraction,
};

/// Separator between a base qualified name and its occurrence number.
pub const OCCURRENCE_SEPARATOR: char = '#';

/// Knobs that affect what an extraction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// What to do with duplicate function/class names.
    pub duplicate_names: DuplicatePolicy,
    /// Record reads of function-local names.
    pub record_reads: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            duplicate_names: DuplicatePolicy::Suffix,
            record_reads: true,
        }
    }
}

impl From<&CanonConfig> for ExtractOptions {
    fn from(config: &CanonConfig) -> Self {
        Self {
            duplicate_names: config.duplicate_names,
            record_reads: config.record_reads,
        }
    }
}

/// Parse and extract `text`, choosing the language from `path`.
///
/// # Errors
///
/// - [`Error::FatalParse`] if the text does not parse cleanly
/// - [`Error::IdentityAmbiguity`] for a duplicate named definition under
///   [`DuplicatePolicy::Reject`]
pub fn extract(path: &Path, text: &str, options: &ExtractOptions) -> Result<Extraction> {
    extract_with(languages::support_for_path(path), path, text, options)
}

/// [`extract`] with an explicit language.
///
/// # Errors
///
/// Same as [`extract`].
pub fn extract_with(
    language: &dyn LanguageSupport,
    path: &Path,
    text: &str,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let tree = language.parse(path, text)?;
    let mut extraction = language.extract(path, text, &tree, options);
    finalize(&mut extraction, options.duplicate_names)?;

    tracing::debug!(
        path = %path.display(),
        language = language.name(),
        components = extraction.components.len(),
        symbols = extraction.symbols.len(),
        calls = extraction.calls.len(),
        imports = extraction.imports.len(),
        missing_segments = extraction.missing_segments,
        "Extracted"
    );
    Ok(extraction)
}

/// Assign qualified names and sibling order.
///
/// Components are in pre-order, so every parent is finalized before its
/// children read its qualified name.
fn finalize(extraction: &mut Extraction, policy: DuplicatePolicy) -> Result<()> {
    let mut taken: HashSet<String> = HashSet::with_capacity(extraction.components.len());
    let mut occurrences: HashMap<String, u32> = HashMap::new();
    let mut named_bases: HashSet<String> = HashSet::new();
    let mut next_order: HashMap<Option<usize>, u32> = HashMap::new();

    for idx in 0..extraction.components.len() {
        let (parent, kind, name) = {
            let c = &extraction.components[idx];
            (c.parent, c.kind, c.name.clone())
        };
        let base = match parent {
            Some(p) => format!("{}.{name}", extraction.components[p].qualified_name),
            None => name,
        };

        if kind.is_named_definition() {
            let first_definition = named_bases.insert(base.clone());
            if !first_definition && policy == DuplicatePolicy::Reject {
                return Err(Error::IdentityAmbiguity {
                    path: extraction.path.clone(),
                    qualified_name: base,
                });
            }
        }

        let qualified_name = if taken.contains(&base) {
            let count = occurrences.entry(base.clone()).or_insert(1);
            loop {
                *count += 1;
                let candidate = format!("{base}{OCCURRENCE_SEPARATOR}{count}");
                if !taken.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            base
        };
        taken.insert(qualified_name.clone());

        let order = next_order.entry(parent).or_insert(0);
        let c = &mut extraction.components[idx];
        c.qualified_name = qualified_name;
        c.order_index = *order;
        *order += 1;
    }
    Ok(())
}
