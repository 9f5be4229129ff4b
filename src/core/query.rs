//! Query-call recognition: which tree nodes are build-time queries.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::syntax::tree::{Literal, NodeId, NodeKind, Tree};

/// Recognized query names, grouped by what they do.
///
/// Plain data so the config file can extend or replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryVocabulary
{
    /// `isSet(key, expected)` style boolean tests
    pub is_set: Vec<String>,

    /// `getValue(key)` style value reads
    pub get_value: Vec<String>,

    /// `select(key, {value: expr, default: expr})` style switches
    pub select: Vec<String>,

    /// Bare global feature tests such as `has("key")`
    pub feature_test: Vec<String>,
}

impl Default for QueryVocabulary
{
    fn default() -> Self
    {
        Self {
            is_set: owned(&["jasy.Permutation.isSet", "core.Env.isSet", "qx.core.Variant.isSet"]),
            get_value: owned(&["jasy.Permutation.getValue", "core.Env.getValue", "qx.core.Setting.get"]),
            select: owned(&["core.Env.select", "qx.core.Variant.select"]),
            feature_test: owned(&["has"]),
        }
    }
}

fn owned(names: &[&str]) -> Vec<String>
{
    names
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl QueryVocabulary
{
    /// Every name that can start or end a query, for cheap text pre-filtering.
    ///
    /// Dotted names contribute their last segment since whitespace or
    /// comments may sit between the segments in source.
    pub fn needles(&self) -> Vec<String>
    {
        let mut out: Vec<String> = self
            .is_set
            .iter()
            .chain(&self.get_value)
            .chain(&self.select)
            .filter_map(|name| {
                name.rsplit('.')
                    .next()
            })
            .chain(
                self.feature_test
                    .iter()
                    .map(String::as_str),
            )
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        out.sort();
        out.dedup();
        out
    }
}

/// The three dotted query families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFunction
{
    IsSet,
    GetValue,
    Select,
}

/// Classification of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape
{
    /// A qualifier-access callee whose dotted name is a known query
    DotCall(QueryFunction),

    /// A call to a bare feature-test identifier
    GlobalCall,
}

/// Matches tree nodes against a vocabulary.
#[derive(Debug, Clone)]
pub struct QueryDetector
{
    dotcalls: HashMap<String, QueryFunction>,
    globalcalls: HashSet<String>,
}

impl Default for QueryDetector
{
    fn default() -> Self
    {
        Self::new(&QueryVocabulary::default())
    }
}

impl QueryDetector
{
    pub fn new(vocabulary: &QueryVocabulary) -> Self
    {
        let mut dotcalls = HashMap::new();

        // A name listed under several families keeps the first one
        let families = [
            (QueryFunction::IsSet, &vocabulary.is_set),
            (QueryFunction::GetValue, &vocabulary.get_value),
            (QueryFunction::Select, &vocabulary.select),
        ];
        for (function, names) in families
        {
            for name in names
            {
                dotcalls
                    .entry(name.clone())
                    .or_insert(function);
            }
        }

        let globalcalls = vocabulary
            .feature_test
            .iter()
            .cloned()
            .collect();

        Self { dotcalls, globalcalls }
    }

    /// Classify `id`, or `None` when it is not a query.
    pub fn classify(
        &self,
        tree: &Tree,
        id: NodeId,
    ) -> Option<QueryShape>
    {
        match tree.kind(id)
        {
            NodeKind::Member =>
            {
                let call = tree.parent(id)?;
                if !matches!(tree.kind(call), NodeKind::Call) || tree.child(call, 0) != Some(id)
                {
                    return None;
                }

                let name = assemble_dotted_path(tree, id)?;
                self.dotcalls
                    .get(&name)
                    .copied()
                    .map(QueryShape::DotCall)
            }
            NodeKind::Call =>
            {
                let callee = tree.child(id, 0)?;
                let name = tree.identifier(callee)?;
                self.globalcalls
                    .contains(name)
                    .then_some(QueryShape::GlobalCall)
            }
            _ => None,
        }
    }

    /// The call expression a classified node belongs to.
    pub fn call_of(
        tree: &Tree,
        id: NodeId,
        shape: QueryShape,
    ) -> Option<NodeId>
    {
        match shape
        {
            QueryShape::DotCall(_) => tree.parent(id),
            QueryShape::GlobalCall => Some(id),
        }
    }
}

/// Rebuild the dotted name of a qualifier-access chain.
///
/// Absent when any link is not an identifier (computed access, calls, ...).
pub fn assemble_dotted_path(
    tree: &Tree,
    id: NodeId,
) -> Option<String>
{
    let mut parts = Vec::new();
    if collect_path(tree, id, &mut parts)
    {
        Some(parts.join("."))
    }
    else
    {
        None
    }
}

fn collect_path<'t>(
    tree: &'t Tree,
    id: NodeId,
    parts: &mut Vec<&'t str>,
) -> bool
{
    for &child in tree.children(id)
    {
        match tree.kind(child)
        {
            NodeKind::Identifier(name) => parts.push(name),
            NodeKind::Member =>
            {
                if !collect_path(tree, child, parts)
                {
                    return false;
                }
            }
            _ => return false,
        }
    }
    true
}

/// Argument expressions of a call, empty when it has no argument list.
pub fn call_arguments(
    tree: &Tree,
    call: NodeId,
) -> Vec<NodeId>
{
    tree.child(call, 1)
        .filter(|args| matches!(tree.kind(*args), NodeKind::Arguments))
        .map(|args| tree.children(args).to_vec())
        .unwrap_or_default()
}

/// Decoded value of a string-literal node.
pub fn string_argument(
    tree: &Tree,
    id: NodeId,
) -> Option<&str>
{
    match tree.literal(id)?
    {
        Literal::Str { value, .. } => Some(value),
        _ => None,
    }
}

/// The flag key a classified query reads, if it is a string literal.
pub fn query_key<'t>(
    tree: &'t Tree,
    id: NodeId,
    shape: QueryShape,
) -> Option<&'t str>
{
    let call = QueryDetector::call_of(tree, id, shape)?;
    let first = *call_arguments(tree, call).first()?;
    string_argument(tree, first)
}
