//! Python language support for Canon.
//!
//! Walks a tree-sitter-python syntax tree into components and their facts.
//!
//! Every top-level statement becomes a component, so the top-level segments
//! tile the file: blank lines and comments between statements are stored as
//! the `leading` text of the next statement, and whatever follows the last
//! statement is its `trailing` text. Function and class definitions nested at
//! any depth, and assignments directly inside a class body, become child
//! components.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
// This is safe for practical source files (no file has 4 billion lines).
#![allow(clippy::cast_possible_truncation)]

use std::collections::HashSet;
use std::path::Path;

use tree_sitter::Node;

use super::common::{
    ExtractedCall, ExtractedComponent, ExtractedDecorator, ExtractedGlobal, ExtractedImport,
    ExtractedSymbol, Extraction,
};
use super::tree_sitter_utils::{compact_text, end_line, field_text, node_text, start_line};
use super::LanguageSupport;
use crate::extract::ExtractOptions;
use crate::hashing;
use crate::types::{AccessKind, ComponentKind, ScopeKind};

/// Tree-sitter node kind constants for the Python grammar.
mod node_kinds {
    // Definitions
    pub const FUNCTION_DEFINITION: &str = "function_definition";
    pub const CLASS_DEFINITION: &str = "class_definition";
    pub const DECORATED_DEFINITION: &str = "decorated_definition";
    pub const DECORATOR: &str = "decorator";

    // Parameters
    pub const TYPED_PARAMETER: &str = "typed_parameter";
    pub const DEFAULT_PARAMETER: &str = "default_parameter";
    pub const TYPED_DEFAULT_PARAMETER: &str = "typed_default_parameter";
    pub const LIST_SPLAT_PATTERN: &str = "list_splat_pattern";
    pub const DICTIONARY_SPLAT_PATTERN: &str = "dictionary_splat_pattern";

    // Imports
    pub const IMPORT_STATEMENT: &str = "import_statement";
    pub const IMPORT_FROM_STATEMENT: &str = "import_from_statement";
    pub const FUTURE_IMPORT_STATEMENT: &str = "future_import_statement";
    pub const DOTTED_NAME: &str = "dotted_name";
    pub const ALIASED_IMPORT: &str = "aliased_import";
    pub const RELATIVE_IMPORT: &str = "relative_import";
    pub const IMPORT_PREFIX: &str = "import_prefix";
    pub const WILDCARD_IMPORT: &str = "wildcard_import";

    // Statements
    pub const EXPRESSION_STATEMENT: &str = "expression_statement";
    pub const ASSIGNMENT: &str = "assignment";
    pub const AUGMENTED_ASSIGNMENT: &str = "augmented_assignment";
    pub const FOR_STATEMENT: &str = "for_statement";
    pub const DELETE_STATEMENT: &str = "delete_statement";
    pub const GLOBAL_STATEMENT: &str = "global_statement";
    pub const NONLOCAL_STATEMENT: &str = "nonlocal_statement";

    // Expressions
    pub const CALL: &str = "call";
    pub const ATTRIBUTE: &str = "attribute";
    pub const SUBSCRIPT: &str = "subscript";
    pub const IDENTIFIER: &str = "identifier";
    pub const KEYWORD_ARGUMENT: &str = "keyword_argument";
    pub const LAMBDA: &str = "lambda";
    pub const NAMED_EXPRESSION: &str = "named_expression";
    pub const AS_PATTERN: &str = "as_pattern";
    pub const AS_PATTERN_TARGET: &str = "as_pattern_target";
    pub const FOR_IN_CLAUSE: &str = "for_in_clause";

    // Target shapes
    pub const PATTERN_LIST: &str = "pattern_list";
    pub const TUPLE_PATTERN: &str = "tuple_pattern";
    pub const LIST_PATTERN: &str = "list_pattern";
    pub const EXPRESSION_LIST: &str = "expression_list";
    pub const TUPLE: &str = "tuple";
    pub const LIST: &str = "list";
    pub const PARENTHESIZED_EXPRESSION: &str = "parenthesized_expression";
    pub const LIST_SPLAT: &str = "list_splat";
}

use node_kinds as nk;

/// Python language support implementation.
pub struct PythonLanguage;

impl LanguageSupport for PythonLanguage {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn extract(
        &self,
        path: &Path,
        text: &str,
        tree: &tree_sitter::Tree,
        options: &ExtractOptions,
    ) -> Extraction {
        let root = tree.root_node();
        let mut ctx = ExtractCtx::new(self, text, options);
        ctx.extract_module(root);

        let mut extraction = ctx.out;
        extraction.path = path.to_path_buf();
        extraction.raw_hash = hashing::raw_hash(text);
        extraction.tree_hash = hashing::tree_hash(&self.serialize(root, text));
        extraction.size_bytes = text.len() as u64;
        extraction
    }
}

/// Kind of namespace a frame opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameScope {
    Module,
    Class,
    Function,
}

/// One level of the component nesting stack.
#[derive(Debug)]
struct Frame {
    component: usize,
    scope: FrameScope,
    level: u32,
    params: HashSet<String>,
    locals: HashSet<String>,
    globals: HashSet<String>,
}

/// Traversal state for one extraction.
struct ExtractCtx<'s> {
    language: &'s PythonLanguage,
    source: &'s str,
    record_reads: bool,
    stack: Vec<Frame>,
    out: Extraction,
}

/// Named, non-comment children of a node.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    named_children(node).into_iter().next()
}

fn is_definition(kind: &str) -> bool {
    matches!(
        kind,
        nk::FUNCTION_DEFINITION | nk::CLASS_DEFINITION | nk::DECORATED_DEFINITION
    )
}

fn is_assignment_statement(node: Node<'_>) -> bool {
    node.kind() == nk::EXPRESSION_STATEMENT
        && first_named(node)
            .is_some_and(|n| matches!(n.kind(), nk::ASSIGNMENT | nk::AUGMENTED_ASSIGNMENT))
}

/// Component kind for a (possibly decorated) definition or statement.
fn classify(def: Node<'_>, enclosing: Option<FrameScope>) -> ComponentKind {
    match def.kind() {
        nk::FUNCTION_DEFINITION if enclosing == Some(FrameScope::Class) => ComponentKind::Method,
        nk::FUNCTION_DEFINITION => ComponentKind::Function,
        nk::CLASS_DEFINITION => ComponentKind::Class,
        nk::IMPORT_STATEMENT | nk::IMPORT_FROM_STATEMENT | nk::FUTURE_IMPORT_STATEMENT => {
            ComponentKind::Import
        }
        nk::EXPRESSION_STATEMENT if is_assignment_statement(def) => ComponentKind::Assignment,
        nk::EXPRESSION_STATEMENT => ComponentKind::Expression,
        _ => ComponentKind::Block,
    }
}

/// `if_statement` -> `if`, `try_statement` -> `try`.
fn block_name(kind: &str) -> String {
    kind.strip_suffix("_statement").unwrap_or(kind).to_string()
}

impl<'s> ExtractCtx<'s> {
    fn new(language: &'s PythonLanguage, source: &'s str, options: &ExtractOptions) -> Self {
        Self {
            language,
            source,
            record_reads: options.record_reads,
            stack: Vec::new(),
            out: Extraction::default(),
        }
    }

    /// Source text for a byte range, or empty (logged and counted) if the
    /// range is not a valid slice.
    fn recover(&mut self, start: usize, end: usize, what: &str) -> String {
        if let Some(text) = self.source.get(start..end) {
            return text.to_string();
        }
        tracing::warn!(
            start,
            end,
            source_len = self.source.len(),
            what,
            "Cannot recover source text, storing empty segment"
        );
        self.out.missing_segments += 1;
        String::new()
    }

    fn line(node: &Node<'_>) -> u32 {
        start_line(node)
    }

    fn frame(&self) -> Option<&Frame> {
        self.stack.last()
    }

    fn current_component(&self) -> Option<usize> {
        self.frame().map(|f| f.component)
    }

    // === Module ===

    fn extract_module(&mut self, root: Node<'_>) {
        let statements = named_children(root);

        if statements.is_empty() {
            if !self.source.is_empty() {
                let idx =
                    self.push_component(root, ComponentKind::Block, "module".to_string(), None);
                // The root node may not span blank lines at either end.
                let leading = self.recover(0, root.start_byte(), "leading text");
                let trailing = self.recover(root.end_byte(), self.source.len(), "trailing text");
                self.out.components[idx].leading = leading;
                self.out.components[idx].trailing = trailing;
                tracing::trace!(component = idx, "File has no statements, stored as one block");
            }
            return;
        }

        let mut cursor = 0;
        let last = statements.len() - 1;
        for (i, stmt) in statements.into_iter().enumerate() {
            let leading = self.recover(cursor, stmt.start_byte(), "leading text");
            let idx = self.component(stmt);
            self.out.components[idx].leading = leading;
            cursor = stmt.end_byte();
            if i == last {
                let trailing = self.recover(cursor, self.source.len(), "trailing text");
                self.out.components[idx].trailing = trailing;
            }
        }
    }

    // === Components ===

    fn push_component(
        &mut self,
        node: Node<'_>,
        kind: ComponentKind,
        name: String,
        signature: Option<String>,
    ) -> usize {
        let parent = self.current_component();
        let depth = parent.map_or(0, |p| self.out.components[p].depth + 1);
        let text = self.recover(node.start_byte(), node.end_byte(), node.kind());
        let structure = self.language.serialize(node, self.source);

        self.out.components.push(ExtractedComponent {
            parent,
            kind,
            name,
            qualified_name: String::new(),
            order_index: 0,
            depth,
            start_line: start_line(&node),
            end_line: end_line(&node),
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            content_hash: hashing::raw_hash(&text),
            structure_hash: hashing::tree_hash(&structure),
            signature,
            leading: String::new(),
            text,
            trailing: String::new(),
        });
        self.out.components.len() - 1
    }

    /// Create the component for `node`, walk its contents, and return its index.
    fn component(&mut self, node: Node<'_>) -> usize {
        let (def, decorators) = if node.kind() == nk::DECORATED_DEFINITION {
            let decorators: Vec<_> = named_children(node)
                .into_iter()
                .filter(|c| c.kind() == nk::DECORATOR)
                .collect();
            (node.child_by_field_name("definition").unwrap_or(node), decorators)
        } else {
            (node, Vec::new())
        };

        let enclosing = self.frame().map(|f| f.scope);
        let kind = classify(def, enclosing);
        let name = self.component_name(def, kind);
        let signature = self.signature(def, kind, &decorators);

        if kind.is_named_definition() {
            self.bind_definition_name(&name, &def);
        }

        let idx = self.push_component(node, kind, name, signature);
        let parent_level = self.frame().map_or(0, |f| f.level);
        let scope = match kind {
            ComponentKind::Function | ComponentKind::Method => FrameScope::Function,
            ComponentKind::Class => FrameScope::Class,
            _ => enclosing.unwrap_or(FrameScope::Module),
        };
        let level = if kind.is_named_definition() {
            parent_level + 1
        } else {
            parent_level
        };
        self.stack.push(Frame {
            component: idx,
            scope,
            level,
            params: HashSet::new(),
            locals: HashSet::new(),
            globals: HashSet::new(),
        });

        for (position, decorator) in decorators.iter().enumerate() {
            self.record_decorator(idx, position as u32, *decorator);
        }

        match kind {
            ComponentKind::Function | ComponentKind::Method => self.walk_function(def),
            ComponentKind::Class => self.walk_class(def),
            _ => self.walk(def),
        }

        self.stack.pop();
        idx
    }

    fn component_name(&self, def: Node<'_>, kind: ComponentKind) -> String {
        let name = match kind {
            ComponentKind::Function | ComponentKind::Method | ComponentKind::Class => {
                field_text(&def, "name", self.source).map(str::to_string)
            }
            ComponentKind::Import => Some(self.import_component_name(def)),
            ComponentKind::Assignment => first_named(def)
                .and_then(|a| a.child_by_field_name("left"))
                .map(|left| compact_text(&left, self.source)),
            ComponentKind::Expression => Some(match first_named(def) {
                Some(expr) if expr.kind() == nk::CALL => expr
                    .child_by_field_name("function")
                    .map_or_else(|| "expr".to_string(), |f| {
                        format!("expr:{}", compact_text(&f, self.source))
                    }),
                _ => "expr".to_string(),
            }),
            ComponentKind::Block => Some(block_name(def.kind())),
        };
        match name {
            Some(name) if !name.is_empty() => name,
            _ => block_name(def.kind()),
        }
    }

    fn import_component_name(&self, def: Node<'_>) -> String {
        match def.kind() {
            nk::IMPORT_STATEMENT => {
                let mut cursor = def.walk();
                let modules: Vec<String> = def
                    .children_by_field_name("name", &mut cursor)
                    .map(|child| {
                        let module = if child.kind() == nk::ALIASED_IMPORT {
                            child.child_by_field_name("name").unwrap_or(child)
                        } else {
                            child
                        };
                        compact_text(&module, self.source)
                    })
                    .collect();
                format!("import:{}", modules.join(","))
            }
            nk::FUTURE_IMPORT_STATEMENT => "from:__future__".to_string(),
            _ => {
                let module = def
                    .child_by_field_name("module_name")
                    .map(|m| compact_text(&m, self.source))
                    .unwrap_or_default();
                format!("from:{module}")
            }
        }
    }

    /// Decorators, then parameters and return annotation (functions) or bases
    /// (classes), with layout removed.
    fn signature(
        &self,
        def: Node<'_>,
        kind: ComponentKind,
        decorators: &[Node<'_>],
    ) -> Option<String> {
        let mut parts: Vec<String> = decorators
            .iter()
            .map(|d| compact_text(d, self.source))
            .collect();
        match kind {
            ComponentKind::Function | ComponentKind::Method => {
                let params = def
                    .child_by_field_name("parameters")
                    .map(|p| compact_text(&p, self.source))
                    .unwrap_or_else(|| "()".to_string());
                match def.child_by_field_name("return_type") {
                    Some(ret) => {
                        parts.push(format!("{params}->{}", compact_text(&ret, self.source)));
                    }
                    None => parts.push(params),
                }
            }
            ComponentKind::Class => {
                if let Some(bases) = def.child_by_field_name("superclasses") {
                    parts.push(compact_text(&bases, self.source));
                }
            }
            _ => return None,
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// A nested `def`/`class` binds its name in the enclosing function.
    fn bind_definition_name(&mut self, name: &str, def: &Node<'_>) {
        if self.frame().is_some_and(|f| f.scope == FrameScope::Function) {
            self.record_write(name, Self::line(def), AccessKind::Write, None);
        }
    }

    fn record_decorator(&mut self, component: usize, position: u32, decorator: Node<'_>) {
        let Some(expr) = first_named(decorator) else {
            return;
        };
        let callee = if expr.kind() == nk::CALL {
            expr.child_by_field_name("function").unwrap_or(expr)
        } else {
            expr
        };
        let name = compact_text(&callee, self.source);
        let text = node_text(&expr, self.source).unwrap_or_default().to_string();
        self.out.decorators.push(ExtractedDecorator {
            component,
            position,
            name,
            text,
            line: Self::line(&decorator),
        });
        self.walk(expr);
    }

    fn walk_function(&mut self, def: Node<'_>) {
        if let Some(params) = def.child_by_field_name("parameters") {
            self.bind_parameters(params);
        }
        if let Some(body) = def.child_by_field_name("body") {
            self.walk(body);
        }
    }

    fn walk_class(&mut self, def: Node<'_>) {
        if let Some(bases) = def.child_by_field_name("superclasses") {
            self.walk(bases);
        }
        let Some(body) = def.child_by_field_name("body") else {
            return;
        };
        for stmt in named_children(body) {
            if is_definition(stmt.kind()) || is_assignment_statement(stmt) {
                self.component(stmt);
            } else {
                self.walk(stmt);
            }
        }
    }

    fn bind_parameters(&mut self, params: Node<'_>) {
        for param in named_children(params) {
            let (name_node, annotation, default) = match param.kind() {
                nk::IDENTIFIER => (Some(param), None, None),
                nk::TYPED_PARAMETER => (
                    first_named(param),
                    param.child_by_field_name("type"),
                    None,
                ),
                nk::DEFAULT_PARAMETER => (
                    param.child_by_field_name("name"),
                    None,
                    param.child_by_field_name("value"),
                ),
                nk::TYPED_DEFAULT_PARAMETER => (
                    param.child_by_field_name("name"),
                    param.child_by_field_name("type"),
                    param.child_by_field_name("value"),
                ),
                nk::LIST_SPLAT_PATTERN | nk::DICTIONARY_SPLAT_PATTERN => (Some(param), None, None),
                _ => (None, None, None),
            };
            if let Some(value) = default {
                self.walk(value);
            }
            let Some(mut name_node) = name_node else {
                continue;
            };
            // `*args` / `**kwargs` bind the inner identifier.
            if matches!(
                name_node.kind(),
                nk::LIST_SPLAT_PATTERN | nk::DICTIONARY_SPLAT_PATTERN
            ) {
                match first_named(name_node) {
                    Some(inner) => name_node = inner,
                    None => continue,
                }
            }
            let Some(name) = node_text(&name_node, self.source) else {
                continue;
            };
            let annotation = annotation.map(|t| compact_text(&t, self.source));
            let Some(frame) = self.stack.last_mut() else {
                continue;
            };
            frame.params.insert(name.to_string());
            frame.locals.insert(name.to_string());
            let (component, level) = (frame.component, frame.level);
            self.out.symbols.push(ExtractedSymbol {
                component,
                name: name.to_string(),
                scope: ScopeKind::Parameter,
                access: AccessKind::Write,
                scope_level: level,
                line: Self::line(&param),
                type_annotation: annotation,
            });
        }
    }

    // === Facts ===

    fn walk(&mut self, node: Node<'_>) {
        if node.is_extra() {
            return;
        }
        match node.kind() {
            kind if is_definition(kind) => {
                self.component(node);
            }
            nk::CALL => {
                self.record_call(node);
                self.walk_children(node);
            }
            nk::ASSIGNMENT => self.visit_assignment(node),
            nk::AUGMENTED_ASSIGNMENT => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(right);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_targets(left, AccessKind::Both, None);
                }
            }
            nk::FOR_STATEMENT | nk::FOR_IN_CLAUSE => {
                let left = node.child_by_field_name("left");
                for child in named_children(node) {
                    if Some(child) == left {
                        self.bind_targets(child, AccessKind::Write, None);
                    } else {
                        self.walk(child);
                    }
                }
            }
            nk::AS_PATTERN => {
                let alias = node.child_by_field_name("alias");
                for child in named_children(node) {
                    if Some(child) == alias || child.kind() == nk::AS_PATTERN_TARGET {
                        self.bind_targets(child, AccessKind::Write, None);
                    } else {
                        self.walk(child);
                    }
                }
            }
            nk::NAMED_EXPRESSION => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value);
                }
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind_targets(name, AccessKind::Write, None);
                }
            }
            nk::DELETE_STATEMENT => {
                for target in named_children(node) {
                    self.bind_targets(target, AccessKind::Delete, None);
                }
            }
            nk::GLOBAL_STATEMENT | nk::NONLOCAL_STATEMENT => self.declare_names(node),
            nk::IMPORT_STATEMENT | nk::IMPORT_FROM_STATEMENT | nk::FUTURE_IMPORT_STATEMENT => {
                self.visit_import(node);
            }
            nk::IDENTIFIER => self.record_read(node),
            nk::ATTRIBUTE => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.walk(object);
                }
            }
            nk::KEYWORD_ARGUMENT => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.walk(value);
                }
            }
            nk::LAMBDA => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.walk(body);
                }
            }
            _ => self.walk_children(node),
        }
    }

    fn walk_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.walk(child);
        }
    }

    fn visit_assignment(&mut self, node: Node<'_>) {
        if let Some(right) = node.child_by_field_name("right") {
            self.walk(right);
        }
        let annotation = node
            .child_by_field_name("type")
            .map(|t| compact_text(&t, self.source));
        if let Some(left) = node.child_by_field_name("left") {
            self.bind_targets(left, AccessKind::Write, annotation);
        }
    }

    fn bind_targets(&mut self, target: Node<'_>, access: AccessKind, annotation: Option<String>) {
        match target.kind() {
            nk::IDENTIFIER => {
                if let Some(name) = node_text(&target, self.source) {
                    self.record_write(name, Self::line(&target), access, annotation);
                }
            }
            nk::ATTRIBUTE => {
                let name = compact_text(&target, self.source);
                let line = Self::line(&target);
                self.push_symbol(name, ScopeKind::Attribute, access, line, annotation);
                if let Some(object) = target.child_by_field_name("object") {
                    self.walk(object);
                }
            }
            nk::SUBSCRIPT => {
                let value = target.child_by_field_name("value");
                if let Some(value) = value {
                    let name = compact_text(&value, self.source);
                    let line = Self::line(&target);
                    self.push_symbol(name, ScopeKind::Subscript, access, line, annotation);
                    self.walk(value);
                }
                let mut cursor = target.walk();
                let subscripts: Vec<_> = target
                    .children_by_field_name("subscript", &mut cursor)
                    .collect();
                for subscript in subscripts {
                    self.walk(subscript);
                }
            }
            nk::PATTERN_LIST
            | nk::TUPLE_PATTERN
            | nk::LIST_PATTERN
            | nk::EXPRESSION_LIST
            | nk::TUPLE
            | nk::LIST
            | nk::PARENTHESIZED_EXPRESSION
            | nk::LIST_SPLAT_PATTERN
            | nk::LIST_SPLAT
            | nk::AS_PATTERN_TARGET => {
                for child in named_children(target) {
                    self.bind_targets(child, access, None);
                }
            }
            _ => self.walk(target),
        }
    }

    /// Bind a bare name in the current frame.
    fn record_write(
        &mut self,
        name: &str,
        line: u32,
        access: AccessKind,
        annotation: Option<String>,
    ) {
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        let declared_global = frame.globals.contains(name);
        let scope = match frame.scope {
            FrameScope::Module => ScopeKind::Global,
            FrameScope::Class => ScopeKind::Attribute,
            FrameScope::Function if declared_global => ScopeKind::Global,
            FrameScope::Function => {
                if access != AccessKind::Delete {
                    frame.locals.insert(name.to_string());
                }
                ScopeKind::Local
            }
        };
        if frame.scope == FrameScope::Function && declared_global {
            let component = frame.component;
            self.out.globals.push(ExtractedGlobal {
                component,
                name: name.to_string(),
                access,
                line,
            });
        }
        self.push_symbol(name.to_string(), scope, access, line, annotation);
    }

    fn record_read(&mut self, node: Node<'_>) {
        if !self.record_reads {
            return;
        }
        let Some(name) = node_text(&node, self.source) else {
            return;
        };
        let scope = match self.frame() {
            Some(f) if f.scope == FrameScope::Function && f.params.contains(name) => {
                ScopeKind::Parameter
            }
            Some(f) if f.scope == FrameScope::Function && f.locals.contains(name) => {
                ScopeKind::Local
            }
            _ => return,
        };
        self.push_symbol(name.to_string(), scope, AccessKind::Read, Self::line(&node), None);
    }

    fn push_symbol(
        &mut self,
        name: String,
        scope: ScopeKind,
        access: AccessKind,
        line: u32,
        type_annotation: Option<String>,
    ) {
        let Some(frame) = self.frame() else {
            return;
        };
        let (component, scope_level) = (frame.component, frame.level);
        self.out.symbols.push(ExtractedSymbol {
            component,
            name,
            scope,
            access,
            scope_level,
            line,
            type_annotation,
        });
    }

    /// `global` / `nonlocal` declarations.
    fn declare_names(&mut self, node: Node<'_>) {
        let is_global = node.kind() == nk::GLOBAL_STATEMENT;
        let names: Vec<String> = named_children(node)
            .iter()
            .filter(|n| n.kind() == nk::IDENTIFIER)
            .filter_map(|n| node_text(n, self.source).map(str::to_string))
            .collect();
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        for name in names {
            if is_global {
                frame.globals.insert(name);
            } else {
                frame.locals.insert(name);
            }
        }
    }

    fn record_call(&mut self, node: Node<'_>) {
        let Some(component) = self.current_component() else {
            return;
        };
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        self.out.calls.push(ExtractedCall {
            component,
            callee: compact_text(&function, self.source),
            line: Self::line(&node),
        });
    }

    fn visit_import(&mut self, node: Node<'_>) {
        let Some(component) = self.current_component() else {
            return;
        };
        let line = Self::line(&node);
        let mut records = Vec::new();

        match node.kind() {
            nk::IMPORT_STATEMENT => {
                let mut cursor = node.walk();
                for child in node.children_by_field_name("name", &mut cursor) {
                    let (module, alias) = self.split_alias(child);
                    records.push(ExtractedImport {
                        component,
                        module,
                        name: None,
                        alias,
                        level: 0,
                        is_from: false,
                        line,
                    });
                }
            }
            kind => {
                let (module, level) = if kind == nk::FUTURE_IMPORT_STATEMENT {
                    ("__future__".to_string(), 0)
                } else {
                    self.from_module(node)
                };
                let mut cursor = node.walk();
                for child in node.children_by_field_name("name", &mut cursor) {
                    let (name, alias) = self.split_alias(child);
                    records.push(ExtractedImport {
                        component,
                        module: module.clone(),
                        name: Some(name),
                        alias,
                        level,
                        is_from: true,
                        line,
                    });
                }
                if named_children(node)
                    .iter()
                    .any(|c| c.kind() == nk::WILDCARD_IMPORT)
                {
                    records.push(ExtractedImport {
                        component,
                        module,
                        name: Some("*".to_string()),
                        alias: None,
                        level,
                        is_from: true,
                        line,
                    });
                }
            }
        }

        let in_function = self.frame().is_some_and(|f| f.scope == FrameScope::Function);
        for record in records {
            if in_function && record.name.as_deref() != Some("*") {
                let bound = match (&record.alias, &record.name) {
                    (Some(alias), _) => alias.clone(),
                    (None, Some(name)) => name.clone(),
                    (None, None) => record.module.split('.').next().unwrap_or_default().to_string(),
                };
                self.record_write(&bound, line, AccessKind::Write, None);
            }
            self.out.imports.push(record);
        }
    }

    /// `a.b as c` -> (`a.b`, Some(`c`)).
    fn split_alias(&self, node: Node<'_>) -> (String, Option<String>) {
        if node.kind() == nk::ALIASED_IMPORT {
            let name = node
                .child_by_field_name("name")
                .map(|n| compact_text(&n, self.source))
                .unwrap_or_default();
            let alias = field_text(&node, "alias", self.source).map(str::to_string);
            (name, alias)
        } else {
            (compact_text(&node, self.source), None)
        }
    }

    /// Module path and relative level of a `from` import.
    fn from_module(&self, node: Node<'_>) -> (String, u32) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return (String::new(), 0);
        };
        match module.kind() {
            nk::RELATIVE_IMPORT => {
                let mut level = 0;
                let mut name = String::new();
                for child in named_children(module) {
                    match child.kind() {
                        nk::IMPORT_PREFIX => {
                            level = node_text(&child, self.source)
                                .map_or(0, |p| p.matches('.').count() as u32);
                        }
                        nk::DOTTED_NAME => name = compact_text(&child, self.source),
                        _ => {}
                    }
                }
                (name, level)
            }
            _ => (compact_text(&module, self.source), 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageSupport;

    fn extract(code: &str) -> Extraction {
        let lang = PythonLanguage;
        let tree = lang
            .parse(Path::new("test.py"), code)
            .expect("test source should parse");
        lang.extract(Path::new("test.py"), code, &tree, &ExtractOptions::default())
    }

    fn names(extraction: &Extraction) -> Vec<(ComponentKind, &str, u32)> {
        extraction
            .components
            .iter()
            .map(|c| (c.kind, c.name.as_str(), c.depth))
            .collect()
    }

    fn symbols_of<'a>(extraction: &'a Extraction, component: &str) -> Vec<&'a ExtractedSymbol> {
        let idx = extraction
            .components
            .iter()
            .position(|c| c.name == component)
            .expect("component should exist");
        extraction
            .symbols
            .iter()
            .filter(|s| s.component == idx)
            .collect()
    }

    // === Components ===

    #[test]
    fn every_top_level_statement_is_a_component() {
        let code = "import os\nx = 1\nprint(x)\nif x:\n    pass\ndef f():\n    pass\nclass A:\n    pass\n";
        let extraction = extract(code);

        assert_eq!(
            names(&extraction),
            vec![
                (ComponentKind::Import, "import:os", 0),
                (ComponentKind::Assignment, "x", 0),
                (ComponentKind::Expression, "expr:print", 0),
                (ComponentKind::Block, "if", 0),
                (ComponentKind::Function, "f", 0),
                (ComponentKind::Class, "A", 0),
            ]
        );
    }

    #[test]
    fn methods_nested_functions_and_class_attributes_are_children() {
        let code = r#"class A:
    """Doc."""
    limit = 10

    def run(self):
        def helper():
            return 1
        return helper()
"#;
        let extraction = extract(code);

        assert_eq!(
            names(&extraction),
            vec![
                (ComponentKind::Class, "A", 0),
                (ComponentKind::Assignment, "limit", 1),
                (ComponentKind::Method, "run", 1),
                (ComponentKind::Function, "helper", 2),
            ]
        );
        assert_eq!(extraction.components[1].parent, Some(0));
        assert_eq!(extraction.components[3].parent, Some(2));
    }

    #[test]
    fn segments_tile_the_file() {
        let code = "# header\n\nimport os\n\n\ndef f():\n    return os.sep\n# tail\n";
        let extraction = extract(code);

        assert_eq!(extraction.components[0].leading, "# header\n\n");
        assert_eq!(extraction.components[1].leading, "\n\n\n");
        assert!(extraction.components[1].trailing.ends_with('\n'));
        assert!(extraction.components[0].trailing.is_empty());
        assert_eq!(extraction.reconstruct(), code);
        assert_eq!(extraction.missing_segments, 0);
    }

    #[test]
    fn comment_only_file_is_one_block() {
        let code = "# nothing here\n\n";
        let extraction = extract(code);

        assert_eq!(names(&extraction), vec![(ComponentKind::Block, "module", 0)]);
        assert_eq!(extraction.reconstruct(), code);
    }

    #[test]
    fn empty_file_has_no_components() {
        let extraction = extract("");

        assert!(extraction.components.is_empty());
        assert_eq!(extraction.reconstruct(), "");
    }

    // === Missing segments ===

    #[test]
    fn unrecoverable_ranges_become_empty_counted_segments() {
        let lang = PythonLanguage;
        let code = "x = 'é'\n";
        let tree = lang.parse(Path::new("t.py"), code).expect("parse");
        let mut ctx = ExtractCtx::new(&lang, code, &ExtractOptions::default());

        assert_eq!(ctx.recover(0, 64, "past the end"), "");
        // 'é' occupies bytes 5..7
        assert_eq!(ctx.recover(0, 6, "inside a character"), "");
        assert_eq!(ctx.out.missing_segments, 2);

        let stmt = first_named(tree.root_node()).expect("statement");
        let idx = ctx.push_component(stmt, ComponentKind::Assignment, "x".to_string(), None);

        assert_eq!(ctx.out.components[idx].text, "x = 'é'");
        assert_eq!(ctx.out.missing_segments, 2);
    }

    #[test]
    fn component_outside_source_is_stored_empty() {
        let lang = PythonLanguage;
        let parsed = "value = 1000\n";
        let tree = lang.parse(Path::new("t.py"), parsed).expect("parse");
        let mut ctx = ExtractCtx::new(&lang, "x = 1\n", &ExtractOptions::default());

        let stmt = first_named(tree.root_node()).expect("statement");
        let first =
            ctx.push_component(stmt, ComponentKind::Assignment, "value".to_string(), None);
        let second =
            ctx.push_component(stmt, ComponentKind::Assignment, "again".to_string(), None);

        assert_eq!(ctx.out.components[first].text, "");
        assert_eq!(ctx.out.components[first].content_hash, hashing::raw_hash(""));
        assert_eq!(ctx.out.components[second].name, "again");
        assert_eq!(ctx.out.missing_segments, 2);
    }

    #[test]
    fn blank_file_keeps_every_line() {
        let code = "\n\n# late comment\n\n";
        let extraction = extract(code);

        assert_eq!(extraction.components.len(), 1);
        assert_eq!(extraction.reconstruct(), code);
    }

    #[test]
    fn decorated_definition_text_includes_decorators() {
        let code = "@app.route(\"/users\")\n@cached\ndef users():\n    return []\n";
        let extraction = extract(code);

        let users = &extraction.components[0];
        assert_eq!(users.name, "users");
        assert!(users.text.starts_with("@app.route"));
        assert_eq!(users.signature.as_deref(), Some("@app.route(\"/users\") @cached ()"));

        let decorators: Vec<_> = extraction
            .decorators
            .iter()
            .map(|d| (d.position, d.name.as_str(), d.text.as_str()))
            .collect();
        assert_eq!(
            decorators,
            vec![(0, "app.route", "app.route(\"/users\")"), (1, "cached", "cached")]
        );
    }

    #[test]
    fn formatting_changes_keep_structure_hash() {
        let a = extract("def f(a, b):\n    return a + b\n");
        let b = extract("def f( a,b ):\n    # sum\n    return a+b\n");

        assert_ne!(a.components[0].content_hash, b.components[0].content_hash);
        assert_eq!(a.components[0].structure_hash, b.components[0].structure_hash);
        assert_eq!(a.tree_hash, b.tree_hash);
    }

    #[test]
    fn signature_covers_parameters_and_return_type() {
        let extraction = extract("def f(a: int, *args, b=2, **kw) -> str:\n    pass\nclass C(Base, metaclass=M):\n    pass\n");

        assert_eq!(
            extraction.components[0].signature.as_deref(),
            Some("(a:int,*args,b=2,**kw)->str")
        );
        assert_eq!(
            extraction.components[1].signature.as_deref(),
            Some("(Base,metaclass=M)")
        );
    }

    // === Symbols ===

    #[test]
    fn parameters_and_locals_are_recorded() {
        let code = "def f(a: int, b=1):\n    total = a + b\n    return total\n";
        let extraction = extract(code);
        let symbols = symbols_of(&extraction, "f");

        let params: Vec<_> = symbols
            .iter()
            .filter(|s| s.scope == ScopeKind::Parameter && s.access == AccessKind::Write)
            .map(|s| (s.name.as_str(), s.type_annotation.as_deref()))
            .collect();
        assert_eq!(params, vec![("a", Some("int")), ("b", None)]);

        assert!(symbols.iter().any(|s| s.name == "total"
            && s.scope == ScopeKind::Local
            && s.access == AccessKind::Write));
        assert!(symbols.iter().any(|s| s.name == "total"
            && s.scope == ScopeKind::Local
            && s.access == AccessKind::Read
            && s.line == 3));
        assert!(symbols.iter().all(|s| s.scope_level == 1));
    }

    #[test]
    fn reads_are_skipped_when_disabled() {
        let code = "def f(a):\n    return a\n";
        let lang = PythonLanguage;
        let tree = lang.parse(Path::new("t.py"), code).expect("parse");
        let options = ExtractOptions {
            record_reads: false,
            ..ExtractOptions::default()
        };
        let extraction = lang.extract(Path::new("t.py"), code, &tree, &options);

        assert!(extraction.symbols.iter().all(|s| s.access != AccessKind::Read));
    }

    #[test]
    fn attribute_subscript_augmented_and_delete_targets() {
        let code = "class A:\n    def m(self, key):\n        self.count += 1\n        self.cache[key] = 2\n        del self.cache[key]\n";
        let extraction = extract(code);
        let symbols = symbols_of(&extraction, "m");

        assert!(symbols.iter().any(|s| s.name == "self.count"
            && s.scope == ScopeKind::Attribute
            && s.access == AccessKind::Both));
        assert!(symbols.iter().any(|s| s.name == "self.cache"
            && s.scope == ScopeKind::Subscript
            && s.access == AccessKind::Write));
        assert!(symbols.iter().any(|s| s.name == "self.cache"
            && s.scope == ScopeKind::Subscript
            && s.access == AccessKind::Delete));
    }

    #[test]
    fn declared_globals_produce_global_accesses() {
        let code = "counter = 0\ndef bump():\n    global counter\n    counter += 1\n    local = counter\n";
        let extraction = extract(code);

        let globals: Vec<_> = extraction
            .globals
            .iter()
            .map(|g| (g.name.as_str(), g.access, g.line))
            .collect();
        assert_eq!(globals, vec![("counter", AccessKind::Both, 4)]);

        let symbols = symbols_of(&extraction, "bump");
        assert!(symbols.iter().any(|s| s.name == "counter" && s.scope == ScopeKind::Global));
        assert!(symbols.iter().any(|s| s.name == "local" && s.scope == ScopeKind::Local));
    }

    #[test]
    fn for_and_with_targets_bind_locals() {
        let code = "def f(paths):\n    for p in paths:\n        with open(p) as fh:\n            fh.read()\n";
        let extraction = extract(code);
        let symbols = symbols_of(&extraction, "f");

        for name in ["p", "fh"] {
            assert!(
                symbols.iter().any(|s| s.name == name
                    && s.scope == ScopeKind::Local
                    && s.access == AccessKind::Write),
                "{name} should be bound"
            );
        }
    }

    #[test]
    fn module_level_assignment_is_global() {
        let extraction = extract("x: int = 1\n");
        let symbols = symbols_of(&extraction, "x");

        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].scope, ScopeKind::Global);
        assert_eq!(symbols[0].type_annotation.as_deref(), Some("int"));
        assert_eq!(symbols[0].scope_level, 0);
    }

    // === Calls ===

    #[test]
    fn calls_are_tagged_with_innermost_component() {
        let code = "def outer():\n    os.path.join('a', 'b')\n    def inner():\n        helper( 1 )\n    return inner()\n";
        let extraction = extract(code);

        let calls: Vec<_> = extraction
            .calls
            .iter()
            .map(|c| (extraction.components[c.component].name.as_str(), c.callee.as_str()))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("outer", "os.path.join"),
                ("inner", "helper"),
                ("outer", "inner"),
            ]
        );
    }

    // === Imports ===

    #[test]
    fn import_forms_produce_one_record_per_name() {
        let code = "import os.path, sys as system\nfrom ..pkg import a, b as c\nfrom . import d\nfrom m import *\nfrom __future__ import annotations\n";
        let extraction = extract(code);

        let records: Vec<_> = extraction
            .imports
            .iter()
            .map(|i| {
                (
                    i.module.as_str(),
                    i.name.as_deref(),
                    i.alias.as_deref(),
                    i.level,
                    i.is_from,
                )
            })
            .collect();
        assert_eq!(
            records,
            vec![
                ("os.path", None, None, 0, false),
                ("sys", None, Some("system"), 0, false),
                ("pkg", Some("a"), None, 2, true),
                ("pkg", Some("b"), Some("c"), 2, true),
                ("", Some("d"), None, 1, true),
                ("m", Some("*"), None, 0, true),
                ("__future__", Some("annotations"), None, 0, true),
            ]
        );
        assert_eq!(extraction.components[0].name, "import:os.path,sys");
        assert_eq!(extraction.components[1].name, "from:..pkg");
        assert_eq!(extraction.components[4].name, "from:__future__");
    }

    #[test]
    fn function_level_import_binds_local() {
        let code = "def f():\n    import json as j\n    return j.dumps({})\n";
        let extraction = extract(code);
        let symbols = symbols_of(&extraction, "f");

        assert!(symbols.iter().any(|s| s.name == "j"
            && s.scope == ScopeKind::Local
            && s.access == AccessKind::Write));
        assert_eq!(extraction.imports[0].component, 0);
    }
}
