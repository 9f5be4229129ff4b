//! Read-only scan for the flag keys a tree depends on.

use std::collections::BTreeSet;

use tracing::trace;

use crate::core::query::{QueryDetector, call_arguments, query_key};
use crate::error::Result;
use crate::syntax::tree::{NodeId, Tree};

/// Collect the keys queried anywhere under the root of `tree`.
///
/// `keys` seeds the result, which lets callers accumulate across files.
pub fn preflight(
    tree: &Tree,
    keys: Option<BTreeSet<String>>,
) -> Result<BTreeSet<String>>
{
    let mut keys = keys.unwrap_or_default();
    Preflight::new(&QueryDetector::default()).collect(tree, tree.root(), &mut keys)?;
    Ok(keys)
}

/// Key collector bound to a query vocabulary.
pub struct Preflight<'a>
{
    detector: &'a QueryDetector,
}

impl<'a> Preflight<'a>
{
    pub fn new(detector: &'a QueryDetector) -> Self
    {
        Self { detector }
    }

    /// Add every literal key queried under `node` to `keys`.
    ///
    /// Returns how many queries take a computed key, which no literal
    /// scan can name.
    pub fn collect(
        &self,
        tree: &Tree,
        node: NodeId,
        keys: &mut BTreeSet<String>,
    ) -> Result<usize>
    {
        let mut stack = vec![node];
        let mut computed = 0;

        while let Some(id) = stack.pop()
        {
            if let Some(shape) = self
                .detector
                .classify(tree, id)
            {
                match query_key(tree, id, shape)
                {
                    Some(key) =>
                    {
                        trace!(%key, ?shape, "query");
                        keys.insert(key.to_string());
                    }
                    None =>
                    {
                        let keyed = QueryDetector::call_of(tree, id, shape)
                            .is_some_and(|call| !call_arguments(tree, call).is_empty());
                        if keyed
                        {
                            trace!(?shape, "query with computed key");
                            computed += 1;
                        }
                    }
                }
            }

            tree.check_links(id)?;
            stack.extend(
                tree.children(id)
                    .iter()
                    .copied(),
            );
        }

        Ok(computed)
    }
}
