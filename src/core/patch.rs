//! In-place specialization of query calls.
//!
//! Each node is classified, rewritten if it is a well-formed query, and
//! then its children are visited last-to-first. Arguments therefore get
//! specialized before a call that may be replaced by one of them.
//! Shapes that do not fit (wrong arity, non-literal key, non-object map)
//! are left alone for runtime.

use smallvec::SmallVec;
use tracing::{instrument, trace};

use crate::core::permutation::Permutation;
use crate::core::query::{QueryDetector, QueryFunction, QueryShape, call_arguments, string_argument};
use crate::error::{Result, SpecializeError};
use crate::syntax::parser::{ExpressionParser, ScriptParser};
use crate::syntax::printer::print_node;
use crate::syntax::tree::{NodeId, NodeKind, Tree};

/// Rewrites query calls of one tree for one permutation.
pub struct PatchEngine<'a, P: ExpressionParser = ScriptParser>
{
    permutation: &'a Permutation,
    detector: &'a QueryDetector,
    parser: P,
}

impl<'a, P: ExpressionParser> PatchEngine<'a, P>
{
    pub fn new(
        permutation: &'a Permutation,
        detector: &'a QueryDetector,
        parser: P,
    ) -> Self
    {
        Self { permutation, detector, parser }
    }

    /// Patch the whole tree; true when anything was rewritten.
    #[instrument(level = "debug", skip_all, fields(permutation = %self.permutation.checksum()))]
    pub fn patch(
        &mut self,
        tree: &mut Tree,
    ) -> Result<bool>
    {
        let root = tree.root();
        self.patch_node(tree, root)
    }

    /// Patch the subtree rooted at `node`.
    pub fn patch_node(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
    ) -> Result<bool>
    {
        let mut modified = match self
            .detector
            .classify(tree, node)
        {
            Some(QueryShape::DotCall(function)) => self.rewrite_dotcall(tree, node, function)?,
            Some(QueryShape::GlobalCall) => self.rewrite_globalcall(tree, node)?,
            None => false,
        };

        // Snapshot: rewrites below may rebind slots of this list
        let children: SmallVec<[NodeId; 8]> = tree
            .children(node)
            .iter()
            .copied()
            .collect();

        for child in children
            .into_iter()
            .rev()
        {
            if tree.parent(child) != Some(node)
            {
                return Err(SpecializeError::Structural(format!(
                    "child {child} of {node} ({}) is not linked back to it",
                    tree.kind(node)
                        .tag()
                )));
            }

            modified |= self.patch_node(tree, child)?;
        }

        Ok(modified)
    }

    fn rewrite_dotcall(
        &mut self,
        tree: &mut Tree,
        member: NodeId,
        function: QueryFunction,
    ) -> Result<bool>
    {
        let Some(call) = tree.parent(member)
        else
        {
            return Ok(false);
        };
        let args = call_arguments(tree, call);

        match function
        {
            QueryFunction::IsSet => self.rewrite_is_set(tree, call, &args),
            QueryFunction::GetValue => self.rewrite_get_value(tree, call, &args),
            QueryFunction::Select => self.rewrite_select(tree, call, &args),
        }
    }

    /// `isSet(key, expected)`; a single argument means `expected == true`.
    fn rewrite_is_set(
        &mut self,
        tree: &mut Tree,
        call: NodeId,
        args: &[NodeId],
    ) -> Result<bool>
    {
        let (key_node, expected_node) = match args
        {
            [key] => (*key, None),
            [key, expected] => (*key, Some(*expected)),
            _ => return Ok(false),
        };

        let Some(key) = string_argument(tree, key_node).map(str::to_string)
        else
        {
            return Ok(false);
        };

        let expected = match expected_node
        {
            None => "true".to_string(),
            Some(id) => match tree.literal(id)
            {
                Some(lit) => lit.token(),
                None => return Ok(false),
            },
        };

        let Some(actual) = self.actual_value(&key)?
        else
        {
            return Ok(false);
        };

        let matched = actual.is_some_and(|actual| {
            expected
                .split('|')
                .any(|alternative| alternative == actual)
        });
        let code = if matched { "true" } else { "false" };

        trace!(%key, %expected, matched, "isSet");
        self.splice(tree, call, code)?;
        Ok(true)
    }

    /// `getValue(key)` becomes the rendered value.
    fn rewrite_get_value(
        &mut self,
        tree: &mut Tree,
        call: NodeId,
        args: &[NodeId],
    ) -> Result<bool>
    {
        let [key_node] = args
        else
        {
            return Ok(false);
        };
        let Some(key) = string_argument(tree, *key_node)
        else
        {
            return Ok(false);
        };
        let Some(code) = self
            .permutation
            .get_code(key)
        else
        {
            return Ok(false);
        };

        trace!(%key, %code, "getValue");
        self.splice(tree, call, &code)?;
        Ok(true)
    }

    /// `select(key, {name: expr, "a|b": expr, default: expr})`.
    ///
    /// The first property whose `|`-separated name lists the actual value
    /// wins; otherwise `default` if present; otherwise no change.
    fn rewrite_select(
        &mut self,
        tree: &mut Tree,
        call: NodeId,
        args: &[NodeId],
    ) -> Result<bool>
    {
        let [key_node, map] = args
        else
        {
            return Ok(false);
        };
        let Some(key) = string_argument(tree, *key_node).map(str::to_string)
        else
        {
            return Ok(false);
        };
        if !matches!(tree.kind(*map), NodeKind::Object)
        {
            return Ok(false);
        }

        let Some(actual) = self.actual_value(&key)?
        else
        {
            return Ok(false);
        };

        let mut fallback = None;
        let mut winner = None;

        for &entry in tree.children(*map)
        {
            if !matches!(tree.kind(entry), NodeKind::Property)
            {
                continue;
            }
            let (Some(name), Some(value)) = (property_name(tree, entry), tree.child(entry, 1))
            else
            {
                continue;
            };

            if name == "default"
            {
                fallback = Some(value);
            }
            else if let Some(actual) = actual.as_deref()
            {
                if name
                    .split('|')
                    .any(|alternative| alternative == actual)
                {
                    winner = Some(value);
                    break;
                }
            }
        }

        let Some(replacement) = winner.or(fallback)
        else
        {
            return Ok(false);
        };

        trace!(
            %key,
            actual = actual.as_deref().unwrap_or("<non-literal>"),
            defaulted = winner.is_none(),
            "select"
        );
        self.replace(tree, call, replacement)?;
        Ok(true)
    }

    /// `has(key)` is replaced only when the value renders as a boolean.
    fn rewrite_globalcall(
        &mut self,
        tree: &mut Tree,
        call: NodeId,
    ) -> Result<bool>
    {
        let args = call_arguments(tree, call);
        let [key_node] = args.as_slice()
        else
        {
            return Ok(false);
        };
        let Some(key) = string_argument(tree, *key_node)
        else
        {
            return Ok(false);
        };
        let Some(code) = self
            .permutation
            .get_code(key)
        else
        {
            return Ok(false);
        };
        if code != "true" && code != "false"
        {
            return Ok(false);
        }

        trace!(%key, %code, "feature test");
        self.splice(tree, call, &code)?;
        Ok(true)
    }

    /// Actual value of `key` as a comparison token.
    ///
    /// Outer `None`: key undefined. Inner `None`: the value is not a plain
    /// literal (object or array source), which matches nothing.
    fn actual_value(
        &mut self,
        key: &str,
    ) -> Result<Option<Option<String>>>
    {
        let Some(code) = self
            .permutation
            .get_code(key)
        else
        {
            return Ok(None);
        };

        let mut scratch = Tree::new(NodeKind::Other("expression".to_string()));
        let id = self
            .parser
            .parse_expression(&mut scratch, &code)?;

        Ok(Some(
            scratch
                .literal(id)
                .map(|lit| lit.token()),
        ))
    }

    /// Replace `call` with `code` parsed as an expression.
    fn splice(
        &mut self,
        tree: &mut Tree,
        call: NodeId,
        code: &str,
    ) -> Result<()>
    {
        let replacement = self
            .parser
            .parse_expression(tree, code)?;
        self.replace(tree, call, replacement)
    }

    fn replace(
        &self,
        tree: &mut Tree,
        call: NodeId,
        replacement: NodeId,
    ) -> Result<()>
    {
        let parent = tree
            .parent(call)
            .ok_or_else(|| {
                SpecializeError::Structural(format!(
                    "query call `{}` has no parent to be replaced in",
                    print_node(tree, call)
                ))
            })?;

        let replacement = if is_primary(tree.kind(replacement))
        {
            replacement
        }
        else
        {
            parenthesize(tree, replacement)?
        };

        tree.replace_child(parent, call, replacement)
    }
}

/// Expressions that bind at least as tightly as the call they replace.
///
/// Objects are excluded: `{` in statement position opens a block.
fn is_primary(kind: &NodeKind) -> bool
{
    match kind
    {
        NodeKind::Literal(_) | NodeKind::Identifier(_) | NodeKind::Member | NodeKind::Call => true,
        NodeKind::Other(tag) => matches!(
            tag.as_str(),
            "array" | "parenthesized_expression" | "template_string" | "subscript_expression" | "this"
        ),
        _ => false,
    }
}

/// Move `expr` into a fresh `( expr )` node.
fn parenthesize(
    tree: &mut Tree,
    expr: NodeId,
) -> Result<NodeId>
{
    tree.detach(expr);

    let group = tree.alloc(NodeKind::Other("parenthesized_expression".to_string()));
    let open = tree.alloc(NodeKind::Token("(".to_string()));
    let close = tree.alloc(NodeKind::Token(")".to_string()));

    tree.append_child(group, open)?;
    tree.append_child(group, expr)?;
    tree.append_child(group, close)?;
    Ok(group)
}

/// Name of an object property: identifier, string or number key.
fn property_name(
    tree: &Tree,
    property: NodeId,
) -> Option<String>
{
    let key = tree.child(property, 0)?;
    match tree.kind(key)
    {
        NodeKind::Identifier(name) => Some(name.clone()),
        NodeKind::Literal(lit) => Some(lit.token()),
        _ => None,
    }
}
