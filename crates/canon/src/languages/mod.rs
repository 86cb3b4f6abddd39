//! Language-specific component extraction.
//!
//! Each supported language implements the `LanguageSupport` trait, which defines
//! how to parse source text, serialize a syntax tree deterministically, and walk
//! the tree into a staged [`Extraction`].
//!
//! ## Adding a New Language
//!
//! 1. Create a new module (e.g., `javascript.rs`)
//! 2. Implement `LanguageSupport` trait
//! 3. Register in `support_for_path()`
//!
//! Only Python is implemented today; every path resolves to it.

pub mod common;
pub mod python;
pub mod tree_sitter_utils;

use std::path::Path;

use crate::error::{Error, Result};
use crate::extract::ExtractOptions;
use crate::hashing;

pub use common::Extraction;

/// Get the language support implementation for a path.
///
/// Falls back to Python for unknown extensions, since Canon ingests whatever
/// it is pointed at and Python is the only grammar available.
#[must_use]
pub fn support_for_path(path: &Path) -> &'static dyn LanguageSupport {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !python::PythonLanguage.extensions().contains(&ext) {
        tracing::debug!(path = %path.display(), "Unknown extension, parsing as Python");
    }
    &python::PythonLanguage
}

/// Trait for language-specific parsing and extraction.
pub trait LanguageSupport: Send + Sync {
    /// Language name used in logs.
    fn name(&self) -> &'static str;

    /// File extensions this language handles.
    fn extensions(&self) -> &[&str];

    /// Get the tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Parse `text` into a complete syntax tree.
    ///
    /// A fresh parser is created per call so parsing never contends on shared
    /// state.
    ///
    /// # Errors
    ///
    /// [`Error::FatalParse`] if the tree contains any `ERROR` or `MISSING`
    /// node; [`Error::Parser`] if the grammar cannot be loaded.
    fn parse(&self, path: &Path, text: &str) -> Result<tree_sitter::Tree> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.tree_sitter_language())
            .map_err(|e| Error::Parser(e.to_string()))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| Error::Parser(format!("{} parser returned no tree", self.name())))?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(Error::fatal_parse(
                path,
                tree_sitter_utils::describe_error(root),
            ));
        }
        Ok(tree)
    }

    /// Deterministic serialization of a subtree (no positions, comments or
    /// whitespace).
    fn serialize(&self, node: tree_sitter::Node<'_>, source: &str) -> String {
        tree_sitter_utils::serialize_node(node, source)
    }

    /// Parse `text` and hash the serialization of the whole tree.
    ///
    /// # Errors
    ///
    /// Same as [`LanguageSupport::parse`].
    fn tree_hash(&self, path: &Path, text: &str) -> Result<String> {
        let tree = self.parse(path, text)?;
        Ok(hashing::tree_hash(&self.serialize(tree.root_node(), text)))
    }

    /// Walk a parsed tree into a staged extraction.
    ///
    /// Components come back unqualified (no `qualified_name` or
    /// `order_index`); [`crate::extract::extract`] finalizes them.
    fn extract(
        &self,
        path: &Path,
        text: &str,
        tree: &tree_sitter::Tree,
        options: &ExtractOptions,
    ) -> Extraction;
}
