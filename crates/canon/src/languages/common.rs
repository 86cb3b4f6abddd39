//! Common extraction types shared across language implementations.
//!
//! These types represent the staged output of one extraction, before it is
//! written to the store. Facts point at their component by index into
//! [`Extraction::components`]; the indices become `ComponentId`s when the
//! snapshot is inserted.

use std::path::PathBuf;

use crate::types::{AccessKind, ComponentKind, ScopeKind};

/// An extracted component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedComponent {
    /// Index of the enclosing component, `None` at top level.
    ///
    /// Always smaller than this component's own index.
    pub parent: Option<usize>,
    pub kind: ComponentKind,
    pub name: String,
    /// Filled in when the extraction is finalized.
    pub qualified_name: String,
    /// Filled in when the extraction is finalized.
    pub order_index: u32,
    pub depth: u32,
    pub start_line: u32,
    pub end_line: u32,
    pub start_byte: usize,
    pub end_byte: usize,
    pub content_hash: String,
    pub structure_hash: String,
    pub signature: Option<String>,
    /// Inter-statement text before the component (top level only)
    pub leading: String,
    /// Exact component text, empty when it could not be recovered
    pub text: String,
    /// Text after the last top-level component
    pub trailing: String,
}

/// An extracted name binding or access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSymbol {
    pub component: usize,
    pub name: String,
    pub scope: ScopeKind,
    pub access: AccessKind,
    pub scope_level: u32,
    pub line: u32,
    pub type_annotation: Option<String>,
}

/// An extracted call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCall {
    pub component: usize,
    pub callee: String,
    pub line: u32,
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImport {
    pub component: usize,
    pub module: String,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub level: u32,
    pub is_from: bool,
    pub line: u32,
}

/// A mutation of a declared global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedGlobal {
    pub component: usize,
    pub name: String,
    pub access: AccessKind,
    pub line: u32,
}

/// A decorator on a function or class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDecorator {
    pub component: usize,
    pub position: u32,
    pub name: String,
    pub text: String,
    pub line: u32,
}

/// Everything extracted from one source text, ready to be persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Logical path of the source
    pub path: PathBuf,
    /// SHA-256 of the raw bytes
    pub raw_hash: String,
    /// SHA-256 of the serialized syntax tree
    pub tree_hash: String,
    /// Byte length of the source
    pub size_bytes: u64,
    /// Components in pre-order (parents before children)
    pub components: Vec<ExtractedComponent>,
    pub symbols: Vec<ExtractedSymbol>,
    pub calls: Vec<ExtractedCall>,
    pub imports: Vec<ExtractedImport>,
    pub globals: Vec<ExtractedGlobal>,
    pub decorators: Vec<ExtractedDecorator>,
    /// Components whose text could not be recovered
    pub missing_segments: usize,
}

impl Extraction {
    /// Indices of the top-level components, in source order.
    pub fn top_level(&self) -> impl Iterator<Item = usize> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Reassemble the source from the top-level segments.
    ///
    /// Equal to the ingested text whenever `missing_segments == 0`.
    #[must_use]
    pub fn reconstruct(&self) -> String {
        let mut out = String::with_capacity(usize::try_from(self.size_bytes).unwrap_or(0));
        for idx in self.top_level() {
            let c = &self.components[idx];
            out.push_str(&c.leading);
            out.push_str(&c.text);
            out.push_str(&c.trailing);
        }
        out
    }
}
