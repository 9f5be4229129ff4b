//! Batch pipeline: one source, many permutations, one artifact each.
//!
//! Every permutation gets a fresh parse, so no tree is ever shared across
//! threads. Output is memoized per (source hash, checksum).

use std::collections::BTreeSet;
use std::sync::Arc;

use aho_corasick::AhoCorasick;
use indexmap::IndexMap;
use moka::sync::Cache;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, trace};
use xxhash_rust::xxh64::xxh64;

use crate::core::combination::Combination;
use crate::core::patch::PatchEngine;
use crate::core::permutation::{Permutation, PermutationCache};
use crate::core::preflight::Preflight;
use crate::core::query::{QueryDetector, QueryVocabulary};
use crate::error::{Result, SpecializeError};
use crate::syntax::parser::ScriptParser;
use crate::syntax::printer::print;

/// Compact outputs kept in memory.
const PACK_CACHE_CAPACITY: u64 = 1_024;

/// Cheap text test run before parsing.
///
/// A file that never mentions the tail of any query name cannot contain a
/// query, so it needs neither a preflight parse nor a patch pass.
pub struct QuickFilter
{
    matcher: Option<AhoCorasick>,
}

impl QuickFilter
{
    pub fn new(vocabulary: &QueryVocabulary) -> Result<Self>
    {
        let needles = vocabulary.needles();
        if needles.is_empty()
        {
            return Ok(Self { matcher: None });
        }

        let matcher = AhoCorasick::new(&needles)
            .map_err(|e| SpecializeError::Configuration(format!("query names: {e}")))?;

        Ok(Self { matcher: Some(matcher) })
    }

    pub fn may_contain_queries(
        &self,
        source: &str,
    ) -> bool
    {
        self.matcher
            .as_ref()
            .is_some_and(|m| m.is_match(source))
    }
}

#[derive(Clone)]
struct Packed
{
    code: Arc<str>,
    modified: bool,
}

/// Memoized compact output keyed by source hash and checksum.
pub struct PackCache
{
    cache: Cache<(u64, String), Packed>,
}

impl PackCache
{
    pub fn new(capacity: u64) -> Self
    {
        Self { cache: Cache::new(capacity) }
    }

    fn get(
        &self,
        source_hash: u64,
        checksum: &str,
    ) -> Option<Packed>
    {
        self.cache
            .get(&(source_hash, checksum.to_string()))
    }

    fn insert(
        &self,
        source_hash: u64,
        checksum: &str,
        packed: Packed,
    )
    {
        self.cache
            .insert((source_hash, checksum.to_string()), packed);
    }
}

/// One specialized artifact.
#[derive(Debug, Clone, Serialize)]
pub struct Specialized
{
    #[serde(skip)]
    pub permutation: Arc<Permutation>,
    pub checksum: String,
    pub key: String,
    pub modified: bool,
    #[serde(skip)]
    pub code: Arc<str>,
}

/// Permutations to build for one source, after filtering and dedup.
#[derive(Debug, Clone)]
pub struct Plan
{
    /// Keys the source queries; `None` when filtering was disabled or a
    /// query key is computed
    pub keys: Option<BTreeSet<String>>,

    /// Number of combinations asked for
    pub requested: usize,

    /// Distinct permutations, in first-seen order
    pub permutations: Vec<Arc<Permutation>>,
}

/// Specializes sources for permutations using one query vocabulary.
pub struct Specializer
{
    detector: QueryDetector,
    quick: QuickFilter,
    permutations: PermutationCache,
    packs: PackCache,
    filter_permutations: bool,
}

impl Specializer
{
    pub fn new(vocabulary: &QueryVocabulary) -> Result<Self>
    {
        Ok(Self {
            detector: QueryDetector::new(vocabulary),
            quick: QuickFilter::new(vocabulary)?,
            permutations: PermutationCache::default(),
            packs: PackCache::new(PACK_CACHE_CAPACITY),
            filter_permutations: true,
        })
    }

    /// Restrict combinations to the keys a source uses before building.
    pub fn with_filtering(
        mut self,
        on: bool,
    ) -> Self
    {
        self.filter_permutations = on;
        self
    }

    /// Keys `source` queries. `name` labels diagnostics.
    #[instrument(level = "debug", skip(self, source))]
    pub fn scan(
        &self,
        name: &str,
        source: &str,
    ) -> Result<BTreeSet<String>>
    {
        self.scan_keys(name, source)
            .map(|(keys, _)| keys)
    }

    /// Literal keys plus the number of queries with a computed key.
    fn scan_keys(
        &self,
        name: &str,
        source: &str,
    ) -> Result<(BTreeSet<String>, usize)>
    {
        let mut keys = BTreeSet::new();

        if !self
            .quick
            .may_contain_queries(source)
        {
            trace!("no query names in text");
            return Ok((keys, 0));
        }

        let tree = ScriptParser::new()?.parse_program(name, source)?;
        let computed = Preflight::new(&self.detector).collect(&tree, tree.root(), &mut keys)?;

        debug!(keys = keys.len(), computed, "preflight done");
        Ok((keys, computed))
    }

    /// Resolve `combinations` into the distinct permutations worth building.
    #[instrument(level = "debug", skip(self, source, combinations))]
    pub fn plan(
        &self,
        name: &str,
        source: &str,
        combinations: Vec<Combination>,
    ) -> Result<Plan>
    {
        let requested = combinations.len();
        let keys = if self.filter_permutations
        {
            let (keys, computed) = self.scan_keys(name, source)?;
            if computed > 0
            {
                // Any flag may feed a computed key, so keep them all
                debug!(computed, "computed query keys, not filtering");
                None
            }
            else
            {
                Some(keys)
            }
        }
        else
        {
            None
        };

        let mut unique: IndexMap<String, Arc<Permutation>> = IndexMap::new();
        for combination in combinations
        {
            let combination = match &keys
            {
                Some(keys) => combination.retain(|flag| keys.contains(flag)),
                None => combination,
            };

            let permutation = self
                .permutations
                .get_permutation(combination);
            unique
                .entry(
                    permutation
                        .checksum()
                        .to_string(),
                )
                .or_insert(permutation);
        }

        debug!(requested, distinct = unique.len(), "planned");
        Ok(Plan {
            keys,
            requested,
            permutations: unique
                .into_values()
                .collect(),
        })
    }

    /// Parse, patch and print `source` for one permutation.
    pub fn specialize(
        &self,
        name: &str,
        source: &str,
        permutation: Arc<Permutation>,
    ) -> Result<Specialized>
    {
        let hash = xxh64(source.as_bytes(), 0);

        let packed = match self
            .packs
            .get(hash, permutation.checksum())
        {
            Some(hit) =>
            {
                trace!(checksum = permutation.checksum(), "pack cache hit");
                hit
            }
            None =>
            {
                let mut parser = ScriptParser::new()?;
                let mut tree = parser.parse_program(name, source)?;

                let modified = if self
                    .quick
                    .may_contain_queries(source)
                {
                    PatchEngine::new(&permutation, &self.detector, parser).patch(&mut tree)?
                }
                else
                {
                    false
                };

                let packed = Packed { code: Arc::from(print(&tree)), modified };
                self.packs
                    .insert(hash, permutation.checksum(), packed.clone());
                packed
            }
        };

        Ok(Specialized {
            checksum: permutation
                .checksum()
                .to_string(),
            key: permutation
                .key()
                .to_string(),
            modified: packed.modified,
            code: packed.code,
            permutation,
        })
    }

    /// Specialize every planned permutation in parallel, in plan order.
    pub fn build(
        &self,
        name: &str,
        source: &str,
        permutations: &[Arc<Permutation>],
    ) -> Result<Vec<Specialized>>
    {
        self.build_with(name, source, permutations, |_| {})
    }

    /// Like `build`, calling `on_done` as each artifact completes.
    pub fn build_with<F>(
        &self,
        name: &str,
        source: &str,
        permutations: &[Arc<Permutation>],
        on_done: F,
    ) -> Result<Vec<Specialized>>
    where
        F: Fn(&Specialized) + Sync,
    {
        permutations
            .par_iter()
            .map(|permutation| {
                let artifact = self.specialize(name, source, Arc::clone(permutation))?;
                on_done(&artifact);
                Ok(artifact)
            })
            .collect()
    }
}

/// Expand an output file pattern (`{stem}`, `{checksum}`).
pub fn render_file_name(
    pattern: &str,
    stem: &str,
    checksum: &str,
) -> String
{
    pattern
        .replace("{stem}", stem)
        .replace("{checksum}", checksum)
}
