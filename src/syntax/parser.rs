//! JavaScript front end: tree-sitter parse, lowered into the arena `Tree`.

use tree_sitter::{Language, Node, Parser};

use crate::error::{Result, SpecializeError, SyntaxError};
use crate::infra::line_index::NewlineIndex;
use crate::syntax::tree::{Literal, NodeId, NodeKind, Tree};

/// Display name used for expression snippets in diagnostics.
const EXPRESSION_NAME: &str = "<expression>";

/// Parses expression text into fresh nodes of an existing tree.
///
/// The patch engine only needs this one capability from the front end,
/// so tests and embedders can supply their own.
pub trait ExpressionParser {
    /// Parse `text` as a single expression; the returned node is detached.
    fn parse_expression(&mut self, tree: &mut Tree, text: &str) -> Result<NodeId>;
}

pub struct ScriptParser {
    parser: Parser,
}

impl ScriptParser {
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();

        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| SpecializeError::Parser(e.to_string()))?;

        Ok(Self { parser })
    }

    /// Parse a whole script. `name` only labels diagnostics.
    pub fn parse_program(&mut self, name: &str, source: &str) -> Result<Tree> {
        let ts = self
            .parser
            .parse(source, None)
            .ok_or_else(|| SpecializeError::Parser("parse was cancelled".to_string()))?;
        let root = ts.root_node();

        if root.has_error() {
            return Err(syntax_error(name, source, root).into());
        }

        let mut tree = Tree::new(NodeKind::Other(root.kind().to_string()));
        let tree_root = tree.root();
        let lower = Lowering { source };

        for child in significant_children(root) {
            let id = lower.node(&mut tree, child)?;
            tree.append_child(tree_root, id)?;
        }

        Ok(tree)
    }
}

impl ExpressionParser for ScriptParser {
    fn parse_expression(&mut self, tree: &mut Tree, text: &str) -> Result<NodeId> {
        // Parenthesize so object literals are not read as blocks
        let wrapped = format!("({text})");

        let ts = self
            .parser
            .parse(&wrapped, None)
            .ok_or_else(|| SpecializeError::Parser("parse was cancelled".to_string()))?;
        let root = ts.root_node();

        if root.has_error() {
            return Err(syntax_error(EXPRESSION_NAME, &wrapped, root).into());
        }

        let statements = significant_children(root);
        let inner = match statements.as_slice() {
            [stmt] if stmt.kind() == "expression_statement" => significant_children(*stmt)
                .into_iter()
                .find(|n| n.kind() == "parenthesized_expression")
                .and_then(|paren| {
                    significant_children(paren)
                        .into_iter()
                        .find(|n| n.is_named())
                }),
            _ => None,
        };

        let Some(inner) = inner else {
            return Err(SyntaxError {
                name: EXPRESSION_NAME.to_string(),
                line: 1,
                column: 1,
                reason: "expected a single expression".to_string(),
                src: wrapped.clone(),
                span: (0, wrapped.len()).into(),
            }
            .into());
        };

        Lowering { source: &wrapped }.node(tree, inner)
    }
}

/// Children of `node` minus comments and other extras.
fn significant_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| !c.is_extra())
        .collect()
}

/// True when `node` carries an optional-chain marker (`a?.b`, `f?.()`).
fn is_optional(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|c| c.kind() == "optional_chain")
}

struct Lowering<'s> {
    source: &'s str,
}

impl Lowering<'_> {
    fn text(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn node(&self, tree: &mut Tree, node: Node<'_>) -> Result<NodeId> {
        match node.kind() {
            "identifier" | "property_identifier" => {
                Ok(tree.alloc(NodeKind::Identifier(self.text(node).to_string())))
            }
            "string" => {
                let lit = Literal::string(self.string_value(node), self.text(node));
                Ok(tree.alloc(NodeKind::Literal(lit)))
            }
            "number" => Ok(tree.alloc(NodeKind::Literal(Literal::Number(
                self.text(node).to_string(),
            )))),
            "true" => Ok(tree.alloc(NodeKind::Literal(Literal::Bool(true)))),
            "false" => Ok(tree.alloc(NodeKind::Literal(Literal::Bool(false)))),
            "null" => Ok(tree.alloc(NodeKind::Literal(Literal::Null))),
            "call_expression" => self.call(tree, node),
            "member_expression" => self.member(tree, node),
            "arguments" => self.list(tree, node, NodeKind::Arguments),
            "object" => self.list(tree, node, NodeKind::Object),
            "pair" => self.pair(tree, node),
            "template_string" => self.template(tree, node),
            _ if node.child_count() == 0 => {
                Ok(tree.alloc(NodeKind::Token(self.text(node).to_string())))
            }
            kind => self.generic(tree, node, NodeKind::Other(kind.to_string())),
        }
    }

    /// Keep every child, punctuation included.
    fn generic(&self, tree: &mut Tree, node: Node<'_>, kind: NodeKind) -> Result<NodeId> {
        let id = tree.alloc(kind);
        for child in significant_children(node) {
            let c = self.node(tree, child)?;
            tree.append_child(id, c)?;
        }
        Ok(id)
    }

    /// Keep only named children; the printer supplies delimiters.
    fn list(&self, tree: &mut Tree, node: Node<'_>, kind: NodeKind) -> Result<NodeId> {
        let id = tree.alloc(kind);
        for child in significant_children(node) {
            if !child.is_named() {
                continue;
            }
            let c = self.node(tree, child)?;
            tree.append_child(id, c)?;
        }
        Ok(id)
    }

    fn call(&self, tree: &mut Tree, node: Node<'_>) -> Result<NodeId> {
        let function = node.child_by_field_name("function");
        let arguments = node.child_by_field_name("arguments");

        match (function, arguments) {
            (Some(function), Some(arguments))
                if arguments.kind() == "arguments" && !is_optional(node) =>
            {
                let id = tree.alloc(NodeKind::Call);
                let callee = self.node(tree, function)?;
                tree.append_child(id, callee)?;
                let args = self.node(tree, arguments)?;
                tree.append_child(id, args)?;
                Ok(id)
            }
            // Tagged templates and optional calls print verbatim
            _ => self.generic(tree, node, NodeKind::Other(node.kind().to_string())),
        }
    }

    fn member(&self, tree: &mut Tree, node: Node<'_>) -> Result<NodeId> {
        let object = node.child_by_field_name("object");
        let property = node.child_by_field_name("property");

        match (object, property) {
            (Some(object), Some(property)) if !is_optional(node) => {
                let id = tree.alloc(NodeKind::Member);
                let o = self.node(tree, object)?;
                tree.append_child(id, o)?;
                let p = self.node(tree, property)?;
                tree.append_child(id, p)?;
                Ok(id)
            }
            _ => self.generic(tree, node, NodeKind::Other(node.kind().to_string())),
        }
    }

    fn pair(&self, tree: &mut Tree, node: Node<'_>) -> Result<NodeId> {
        let key = node.child_by_field_name("key");
        let value = node.child_by_field_name("value");

        match (key, value) {
            (Some(key), Some(value)) => {
                let id = tree.alloc(NodeKind::Property);
                let k = self.node(tree, key)?;
                tree.append_child(id, k)?;
                let v = self.node(tree, value)?;
                tree.append_child(id, v)?;
                Ok(id)
            }
            _ => self.generic(tree, node, NodeKind::Other(node.kind().to_string())),
        }
    }

    /// Template literals keep every byte between their children as tokens.
    fn template(&self, tree: &mut Tree, node: Node<'_>) -> Result<NodeId> {
        let id = tree.alloc(NodeKind::Other(node.kind().to_string()));
        let mut offset = node.start_byte();

        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();

        for child in children {
            if child.start_byte() > offset {
                let gap = self.source.get(offset..child.start_byte()).unwrap_or_default();
                let g = tree.alloc(NodeKind::Token(gap.to_string()));
                tree.append_child(id, g)?;
            }
            let c = self.node(tree, child)?;
            tree.append_child(id, c)?;
            offset = child.end_byte();
        }

        if node.end_byte() > offset {
            let gap = self.source.get(offset..node.end_byte()).unwrap_or_default();
            let g = tree.alloc(NodeKind::Token(gap.to_string()));
            tree.append_child(id, g)?;
        }

        Ok(id)
    }

    /// Decoded contents of a string literal node.
    fn string_value(&self, node: Node<'_>) -> String {
        let mut value = String::new();
        for part in significant_children(node) {
            match part.kind() {
                "escape_sequence" => unescape_into(self.text(part), &mut value),
                "'" | "\"" => {}
                _ => value.push_str(self.text(part)),
            }
        }
        value
    }
}

/// Decode one JavaScript escape sequence (including its backslash).
fn unescape_into(seq: &str, out: &mut String) {
    let body = seq.strip_prefix('\\').unwrap_or(seq);
    let mut chars = body.chars();

    let Some(first) = chars.next() else {
        return;
    };

    let decoded = match first {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'v' => Some('\u{b}'),
        '0' if body.len() == 1 => Some('\0'),
        // Line continuation
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => return,
        'x' => u32::from_str_radix(&body[1..], 16)
            .ok()
            .and_then(char::from_u32),
        'u' => {
            let hex = body[1..].trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        }
        other => Some(other),
    };

    match decoded {
        Some(c) => out.push(c),
        None => out.push_str(seq),
    }
}

/// Build a diagnostic pointing at the first error or missing node.
fn syntax_error(name: &str, source: &str, root: Node<'_>) -> SyntaxError {
    let culprit = first_error(root).unwrap_or(root);

    let (reason, span) = if culprit.is_missing() {
        (
            format!("missing `{}`", culprit.kind()),
            (culprit.start_byte(), 0),
        )
    } else {
        (
            "unexpected input".to_string(),
            (
                culprit.start_byte(),
                culprit.end_byte().saturating_sub(culprit.start_byte()),
            ),
        )
    };

    let index = NewlineIndex::build(source.as_bytes());
    let (line, column) = index.line_col(span.0);

    SyntaxError {
        name: name.to_string(),
        line,
        column,
        reason,
        src: source.to_string(),
        span: span.into(),
    }
}

/// Depth-first search for the leftmost error or missing node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
