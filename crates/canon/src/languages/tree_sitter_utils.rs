//! Shared tree-sitter utilities for language support modules.
//!
//! Provides text extraction, positions, normalized text and the deterministic
//! tree serialization that tree hashes and structure hashes are taken over.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
// This is safe for practical source files (no file has 4 billion lines).
#![allow(clippy::cast_possible_truncation)]

use std::fmt::Write as _;

use tree_sitter::Node;

/// Get the exact source text of a node.
///
/// Returns `None` if the node's byte range lies outside `source` or does not
/// fall on character boundaries.
pub fn node_text<'s>(node: &Node<'_>, source: &'s str) -> Option<&'s str> {
    let text = source.get(node.byte_range());
    if text.is_none() {
        tracing::trace!(
            byte_range = ?node.byte_range(),
            node_kind = %node.kind(),
            "Node byte range is not a valid slice of the source"
        );
    }
    text
}

/// Text of the child stored under `field`, if present and recoverable.
pub fn field_text<'s>(node: &Node<'_>, field: &str, source: &'s str) -> Option<&'s str> {
    node.child_by_field_name(field)
        .and_then(|child| node_text(&child, source))
}

/// 1-indexed first line of a node.
pub fn start_line(node: &Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// 1-indexed last line of a node (inclusive).
///
/// A node ending at column 0 ends on the previous line's newline, so that line
/// is reported instead.
pub fn end_line(node: &Node<'_>) -> u32 {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row as u32
    } else {
        end.row as u32 + 1
    }
}

/// First `ERROR` or `MISSING` node in the tree, for diagnostics.
pub fn first_error<'t>(root: Node<'t>) -> Option<Node<'t>> {
    if root.is_error() || root.is_missing() {
        return Some(root);
    }
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

/// Human-readable description of the first syntax error in a tree.
pub fn describe_error(root: Node<'_>) -> String {
    match first_error(root) {
        Some(node) if node.is_missing() => format!(
            "missing `{}` at line {}, column {}",
            node.kind(),
            node.start_position().row + 1,
            node.start_position().column + 1
        ),
        Some(node) => format!(
            "syntax error at line {}, column {}",
            node.start_position().row + 1,
            node.start_position().column + 1
        ),
        None => "syntax error".to_string(),
    }
}

/// Whether a node's text is taken whole rather than through its children.
///
/// String bodies interleave raw text with escape sequences; only the raw text
/// between them is not represented by child nodes.
fn is_atomic(node: &Node<'_>) -> bool {
    node.child_count() == 0 || node.kind() == "string_content"
}

/// Node text with layout removed.
///
/// Concatenates the leaf tokens of `node`, skipping comments and other extras,
/// and keeps a single space only where two word characters would otherwise
/// merge (`lambda x` stays `lambda x`, `f( a , b )` becomes `f(a,b)`).
pub fn compact_text(node: &Node<'_>, source: &str) -> String {
    let mut out = String::new();
    push_compact(*node, source, &mut out);
    out
}

fn push_compact(node: Node<'_>, source: &str, out: &mut String) {
    if node.is_extra() {
        return;
    }
    if is_atomic(&node) {
        let text = node_text(&node, source).unwrap_or_default();
        let joins_word = out.chars().next_back().is_some_and(is_word_char)
            && text.chars().next().is_some_and(is_word_char);
        if joins_word {
            out.push(' ');
        }
        out.push_str(text);
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        push_compact(child, source, out);
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Deterministic serialization of a subtree.
///
/// Emits `(kind field:(kind "leaf text") ...)` for every node, named and
/// anonymous, skipping extras (comments, line continuations). Positions and
/// whitespace never appear, so two texts that differ only in layout or
/// comments serialize identically.
pub fn serialize_node(node: Node<'_>, source: &str) -> String {
    let mut out = String::with_capacity(node.byte_range().len() * 2);
    let mut cursor = node.walk();
    write_node(&mut cursor, source, &mut out);
    out
}

fn write_node(cursor: &mut tree_sitter::TreeCursor<'_>, source: &str, out: &mut String) {
    let node = cursor.node();
    out.push('(');
    out.push_str(node.kind());
    if is_atomic(&node) {
        // Anonymous leaves are their own kind; only named leaves carry text.
        if node.is_named() {
            let _ = write!(out, " {:?}", node_text(&node, source).unwrap_or_default());
        }
        out.push(')');
        return;
    }
    if cursor.goto_first_child() {
        loop {
            if !cursor.node().is_extra() {
                out.push(' ');
                if let Some(field) = cursor.field_name() {
                    out.push_str(field);
                    out.push(':');
                }
                write_node(cursor, source, out);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("python grammar should load");
        parser.parse(source, None).expect("parser should return a tree")
    }

    #[test]
    fn serialization_ignores_whitespace_and_comments() {
        let a = parse("def f(a, b):\n    return a + b\n");
        let b = parse("def f( a,b ):  # add\n\n    return a+b\n");

        assert_eq!(
            serialize_node(a.root_node(), "def f(a, b):\n    return a + b\n"),
            serialize_node(b.root_node(), "def f( a,b ):  # add\n\n    return a+b\n"),
        );
    }

    #[test]
    fn serialization_sees_identifier_changes() {
        let a_src = "x = alpha\n";
        let b_src = "x = beta\n";
        let a = parse(a_src);
        let b = parse(b_src);

        assert_ne!(
            serialize_node(a.root_node(), a_src),
            serialize_node(b.root_node(), b_src)
        );
    }

    #[test]
    fn serialization_keeps_string_bodies() {
        let a_src = "s = 'a\\nb c'\n";
        let b_src = "s = 'a\\nbc'\n";
        let a = parse(a_src);
        let b = parse(b_src);

        assert_ne!(
            serialize_node(a.root_node(), a_src),
            serialize_node(b.root_node(), b_src)
        );
    }

    #[test]
    fn compact_text_strips_layout_but_not_words() {
        let source = "f( a ,  b )  # trailing\n";
        let tree = parse(source);
        let call = tree
            .root_node()
            .named_child(0)
            .and_then(|stmt| stmt.named_child(0))
            .expect("expression statement with call");

        assert_eq!(compact_text(&call, source), "f(a,b)");
    }

    #[test]
    fn compact_text_separates_adjacent_words() {
        let source = "g = lambda  x: not  x\n";
        let tree = parse(source);
        let assignment = tree
            .root_node()
            .named_child(0)
            .and_then(|stmt| stmt.named_child(0))
            .expect("assignment");
        let right = assignment
            .child_by_field_name("right")
            .expect("right-hand side");

        assert_eq!(compact_text(&right, source), "lambda x:not x");
    }

    #[test]
    fn describe_error_reports_line() {
        let source = "def f(:\n    pass\n";
        let tree = parse(source);

        assert!(tree.root_node().has_error());
        assert!(describe_error(tree.root_node()).contains("line 1"));
    }

    #[test]
    fn end_line_excludes_trailing_newline() {
        let source = "class A:\n    pass\n";
        let tree = parse(source);
        let class = tree.root_node().named_child(0).expect("class");

        assert_eq!(start_line(&class), 1);
        assert_eq!(end_line(&class), 2);
    }
}
