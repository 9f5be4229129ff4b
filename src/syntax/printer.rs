//! Compact printer: tree back to whitespace-free source.
//!
//! Only spaces required to keep adjacent tokens apart are emitted.
//! Statements lacking a terminating `;` (automatic semicolon insertion)
//! get one, so concatenated statements stay valid.

use crate::syntax::tree::{NodeId, NodeKind, Tree};

/// Statement kinds that end with a semicolon when printed compactly.
const TERMINATED_STATEMENTS: &[&str] = &[
    "expression_statement",
    "variable_declaration",
    "lexical_declaration",
    "return_statement",
    "throw_statement",
    "break_statement",
    "continue_statement",
    "debugger_statement",
    "do_statement",
    "import_statement",
    "export_statement",
    "field_definition",
];

/// Print a whole tree.
pub fn print(tree: &Tree) -> String
{
    print_node(tree, tree.root())
}

/// Print the subtree rooted at `id`.
pub fn print_node(
    tree: &Tree,
    id: NodeId,
) -> String
{
    let mut printer = CompactPrinter::default();
    printer.node(tree, id);
    printer.out
}

#[derive(Default)]
struct CompactPrinter
{
    out: String,

    /// Last token was an integer literal (`1.toString()` is a syntax error)
    after_integer: bool,

    /// Last text was template content, which must not be padded
    glued: bool,
}

impl CompactPrinter
{
    fn node(
        &mut self,
        tree: &Tree,
        id: NodeId,
    )
    {
        let children = tree.children(id);

        match tree.kind(id)
        {
            NodeKind::Identifier(name) => self.push(name),
            NodeKind::Token(text) => self.push_token(text),
            NodeKind::Literal(lit) =>
            {
                self.push(lit.raw());
                self.after_integer = lit
                    .raw()
                    .bytes()
                    .all(|b| b.is_ascii_digit());
            }
            NodeKind::Call =>
            {
                for &child in children
                {
                    self.node(tree, child);
                }
            }
            NodeKind::Arguments => self.list(tree, children, "(", ")"),
            NodeKind::Object => self.list(tree, children, "{", "}"),
            NodeKind::Member =>
            {
                if let [object, property] = children
                {
                    self.node(tree, *object);
                    self.push(".");
                    self.node(tree, *property);
                }
            }
            NodeKind::Property =>
            {
                if let [key, value] = children
                {
                    self.node(tree, *key);
                    self.push(":");
                    self.node(tree, *value);
                }
            }
            NodeKind::Other(kind) if kind == "template_string" => self.template(tree, children),
            NodeKind::Other(kind) =>
            {
                for &child in children
                {
                    self.node(tree, child);
                }

                if TERMINATED_STATEMENTS.contains(&kind.as_str()) && !self.out.ends_with(';')
                {
                    self.push(";");
                }
            }
        }
    }

    fn list(
        &mut self,
        tree: &Tree,
        items: &[NodeId],
        open: &str,
        close: &str,
    )
    {
        self.push(open);
        for (i, &item) in items
            .iter()
            .enumerate()
        {
            if i > 0
            {
                self.push(",");
            }
            self.node(tree, item);
        }
        self.push(close);
    }

    /// Template text is copied byte for byte; substitutions print normally.
    fn template(
        &mut self,
        tree: &Tree,
        children: &[NodeId],
    )
    {
        for &child in children
        {
            match tree.kind(child)
            {
                NodeKind::Token(text) =>
                {
                    self.out
                        .push_str(text);
                    self.after_integer = false;
                    self.glued = true;
                }
                _ => self.node(tree, child),
            }
        }
    }

    fn push_token(
        &mut self,
        text: &str,
    )
    {
        self.push(text);

        // Hashbang must stay on its own line
        if text.starts_with("#!")
        {
            self.out
                .push('\n');
        }
    }

    fn push(
        &mut self,
        piece: &str,
    )
    {
        let Some(next) = piece
            .chars()
            .next()
        else
        {
            return;
        };

        if let Some(prev) = self
            .out
            .chars()
            .next_back()
        {
            let fused = needs_space(prev, next) || (self.after_integer && next == '.');
            if fused && !self.glued
            {
                self.out
                    .push(' ');
            }
        }

        self.out
            .push_str(piece);
        self.after_integer = false;
        self.glued = false;
    }
}

fn is_word_char(c: char) -> bool
{
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\\'
}

/// Whether two adjacent characters would fuse into a different token.
fn needs_space(
    prev: char,
    next: char,
) -> bool
{
    (is_word_char(prev) && is_word_char(next))
        || (prev == '+' && next == '+')
        || (prev == '-' && next == '-')
        || (prev == '/' && next == '/')
        || (prev == '/' && next == '*')
}
