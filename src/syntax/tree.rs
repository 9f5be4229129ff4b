//! Arena-backed syntax tree consumed by the permutation engine.
//!
//! Nodes live in a single `Vec` and refer to each other by `NodeId`.
//! Every node records its parent, so replacing a child is an index rebinding
//! in the parent's child list that keeps sibling order intact.
//!
//! Nodes detached by a replacement stay allocated until the tree is dropped.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{Result, SpecializeError};

/// Index of a node inside its owning `Tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId
{
    /// Raw arena index
    pub fn index(self) -> usize
    {
        self.0
    }
}

impl fmt::Display for NodeId
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "#{}", self.0)
    }
}

/// Literal leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal
{
    /// String literal; `value` is unescaped, `raw` keeps the quotes as written
    Str
    {
        value: String,
        raw: String,
    },

    /// Numeric literal as written
    Number(String),

    Bool(bool),

    Null,
}

impl Literal
{
    /// Build a string literal from its raw source text and decoded value.
    pub fn string(
        value: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self
    {
        Literal::Str { value: value.into(), raw: raw.into() }
    }

    /// Source text of the literal.
    pub fn raw(&self) -> &str
    {
        match self
        {
            Literal::Str { raw, .. } => raw,
            Literal::Number(raw) => raw,
            Literal::Bool(true) => "true",
            Literal::Bool(false) => "false",
            Literal::Null => "null",
        }
    }

    /// Comparison token used when matching query values.
    ///
    /// Strings compare by their decoded value. Numbers are normalized so
    /// `3`, `3.0` and `0x3` compare equal.
    pub fn token(&self) -> String
    {
        match self
        {
            Literal::Str { value, .. } => value.clone(),
            Literal::Number(raw) => normalize_number(raw),
            Literal::Bool(b) => b.to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

/// Render a numeric literal the way it reads after evaluation.
fn normalize_number(raw: &str) -> String
{
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '_')
        .collect();

    let parsed = if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
            .ok()
            .map(|v| v as f64)
    }
    else
    {
        cleaned
            .parse::<f64>()
            .ok()
    };

    match parsed
    {
        Some(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        Some(n) if n.is_finite() => n.to_string(),
        _ => raw.to_string(),
    }
}

/// Closed set of node shapes the engine distinguishes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind
{
    /// Call expression; children are `[callee, Arguments]`
    Call,

    /// Argument list of a call; children are the argument expressions
    Arguments,

    /// Qualifier access `a.b`; children are `[object, property]`
    Member,

    /// Bare or property identifier
    Identifier(String),

    /// Object literal; children are its entries
    Object,

    /// `key: value` entry; children are `[key, value]`
    Property,

    Literal(Literal),

    /// Punctuation or keyword leaf
    Token(String),

    /// Any other construct, tagged with its grammar kind
    Other(String),
}

impl NodeKind
{
    /// Short type tag used in logs and error messages.
    pub fn tag(&self) -> &str
    {
        match self
        {
            NodeKind::Call => "call",
            NodeKind::Arguments => "arguments",
            NodeKind::Member => "member",
            NodeKind::Identifier(_) => "identifier",
            NodeKind::Object => "object",
            NodeKind::Property => "property",
            NodeKind::Literal(_) => "literal",
            NodeKind::Token(_) => "token",
            NodeKind::Other(kind) => kind,
        }
    }
}

/// One arena slot.
#[derive(Debug, Clone)]
pub struct Node
{
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: SmallVec<[NodeId; 4]>,
}

impl Node
{
    pub fn parent(&self) -> Option<NodeId>
    {
        self.parent
    }

    pub fn children(&self) -> &[NodeId]
    {
        &self.children
    }
}

/// A parsed script (or expression) as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Tree
{
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree
{
    /// Create a tree holding only a root of the given kind.
    pub fn new(root_kind: NodeKind) -> Self
    {
        let root = Node { kind: root_kind, parent: None, children: SmallVec::new() };
        Self { nodes: vec![root], root: NodeId(0) }
    }

    pub fn root(&self) -> NodeId
    {
        self.root
    }

    /// Number of allocated nodes, detached ones included.
    pub fn len(&self) -> usize
    {
        self.nodes
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.nodes
            .is_empty()
    }

    /// Allocate a detached node.
    pub fn alloc(
        &mut self,
        kind: NodeKind,
    ) -> NodeId
    {
        let id = NodeId(
            self.nodes
                .len(),
        );
        self.nodes
            .push(Node { kind, parent: None, children: SmallVec::new() });
        id
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<()>
    {
        self.check(parent)?;
        self.check(child)?;

        if let Some(existing) = self.nodes[child.0].parent
        {
            return Err(SpecializeError::Structural(format!(
                "node {child} already belongs to {existing}"
            )));
        }
        if child == parent || self.is_ancestor(child, parent)
        {
            return Err(SpecializeError::Structural(format!(
                "appending {child} under {parent} would create a cycle"
            )));
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0]
            .children
            .push(child);
        Ok(())
    }

    /// Lookup that tolerates ids from another tree.
    pub fn get(
        &self,
        id: NodeId,
    ) -> Option<&Node>
    {
        self.nodes
            .get(id.0)
    }

    /// Kind of `id`; ids must come from this tree.
    pub fn kind(
        &self,
        id: NodeId,
    ) -> &NodeKind
    {
        &self.nodes[id.0].kind
    }

    pub fn children(
        &self,
        id: NodeId,
    ) -> &[NodeId]
    {
        &self.nodes[id.0].children
    }

    pub fn parent(
        &self,
        id: NodeId,
    ) -> Option<NodeId>
    {
        self.nodes[id.0].parent
    }

    /// The `n`-th child of `id`, if any.
    pub fn child(
        &self,
        id: NodeId,
        n: usize,
    ) -> Option<NodeId>
    {
        self.nodes[id.0]
            .children
            .get(n)
            .copied()
    }

    /// Identifier name of `id`, if it is one.
    pub fn identifier(
        &self,
        id: NodeId,
    ) -> Option<&str>
    {
        match self.kind(id)
        {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Literal payload of `id`, if it is one.
    pub fn literal(
        &self,
        id: NodeId,
    ) -> Option<&Literal>
    {
        match self.kind(id)
        {
            NodeKind::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Replace `old` (a child of `parent`) with `new`, in the same position.
    ///
    /// `new` is detached from wherever it currently hangs first, which lets
    /// callers splice a subtree taken from elsewhere in the same tree.
    /// `old` ends up detached.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<()>
    {
        self.check(parent)?;
        self.check(old)?;
        self.check(new)?;

        if self.position(parent, old)
            .is_none()
        {
            return Err(SpecializeError::Structural(format!(
                "node {old} is not a child of {parent}"
            )));
        }
        if new == old
        {
            return Ok(());
        }
        if new == parent || self.is_ancestor(new, parent)
        {
            return Err(SpecializeError::Structural(format!(
                "replacing {old} with {new} would create a cycle under {parent}"
            )));
        }

        self.detach(new);

        // Position may have shifted if `new` was an earlier sibling
        let Some(pos) = self.position(parent, old)
        else
        {
            return Err(SpecializeError::Structural(format!(
                "node {old} vanished from {parent} during replacement"
            )));
        };

        self.nodes[parent.0].children[pos] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    /// Remove `id` from its parent's child list.
    pub fn detach(
        &mut self,
        id: NodeId,
    )
    {
        if let Some(parent) = self.nodes[id.0]
            .parent
            .take()
        {
            self.nodes[parent.0]
                .children
                .retain(|c| *c != id);
        }
    }

    /// Nodes reachable from `id`, in pre-order.
    pub fn descendants(
        &self,
        id: NodeId,
    ) -> Vec<NodeId>
    {
        let mut out = Vec::new();
        let mut stack = vec![id];

        while let Some(next) = stack.pop()
        {
            out.push(next);

            // Reverse so the leftmost child is visited first
            stack.extend(
                self.children(next)
                    .iter()
                    .rev()
                    .copied(),
            );
        }

        out
    }

    /// Verify that every child of `id` links back to it.
    pub fn check_links(
        &self,
        id: NodeId,
    ) -> Result<()>
    {
        for &child in self.children(id)
        {
            if self.parent(child) != Some(id)
            {
                return Err(SpecializeError::Structural(format!(
                    "child {child} of {id} has parent link {:?}",
                    self.parent(child)
                )));
            }
        }
        Ok(())
    }

    fn position(
        &self,
        parent: NodeId,
        child: NodeId,
    ) -> Option<usize>
    {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == child)
    }

    /// True when `ancestor` is on the parent chain of `id`.
    fn is_ancestor(
        &self,
        ancestor: NodeId,
        id: NodeId,
    ) -> bool
    {
        let mut cursor = self.nodes[id.0].parent;
        while let Some(p) = cursor
        {
            if p == ancestor
            {
                return true;
            }
            cursor = self.nodes[p.0].parent;
        }
        false
    }

    fn check(
        &self,
        id: NodeId,
    ) -> Result<()>
    {
        if id.0 < self.nodes.len()
        {
            Ok(())
        }
        else
        {
            Err(SpecializeError::Structural(format!(
                "node {id} does not exist in a tree of {} nodes",
                self.nodes
                    .len()
            )))
        }
    }
}

/// Corrupt links on purpose, for structural error tests.
#[cfg(test)]
impl Tree
{
    /// List `child` under `parent` without linking it back.
    pub(crate) fn push_unlinked(
        &mut self,
        parent: NodeId,
        child: NodeId,
    )
    {
        self.nodes[parent.0]
            .children
            .push(child);
    }
}
