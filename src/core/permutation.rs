//! Permutations: a combination plus its canonical key and checksum.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use adler2::Adler32;
use moka::sync::Cache;
use serde::Serialize;
use serde_json::Value;

use crate::core::combination::{Combination, FlagValue};
use crate::core::patch::PatchEngine;
use crate::core::query::QueryDetector;
use crate::error::Result;
use crate::syntax::parser::ScriptParser;
use crate::syntax::tree::Tree;

/// Default number of permutations kept by `PermutationCache`.
const DEFAULT_CACHE_CAPACITY: u64 = 4_096;

/// One build variant. Key and checksum are computed once, at construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Permutation {
    combination: Combination,
    key: String,
    checksum: String,
}

impl Permutation {
    pub fn new(combination: Combination) -> Self {
        let key = combination.canonical_key();
        let checksum = checksum_of_key(&key);

        Self {
            combination,
            key,
            checksum,
        }
    }

    /// Build from a JSON object of scalars.
    pub fn from_json(value: Value) -> Result<Self> {
        Ok(Self::new(Combination::from_json(value)?))
    }

    pub fn has(&self, key: &str) -> bool {
        self.combination.contains_key(key)
    }

    /// Raw value of `key`, absent when undefined.
    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.combination.get(key)
    }

    /// Value of `key` rendered as script source, absent when undefined or null.
    pub fn get_code(&self, key: &str) -> Option<String> {
        self.combination.get(key).and_then(FlagValue::to_code)
    }

    /// Canonical `name:value;...` encoding.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Filename-safe identifier derived from the key.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    /// A new permutation restricted to the flag names in `keys`.
    pub fn filter(&self, keys: &BTreeSet<String>) -> Permutation {
        Permutation::new(self.combination.retain(|name| keys.contains(name)))
    }

    /// Specialize `tree` in place with the default query vocabulary.
    ///
    /// Returns whether anything was rewritten.
    pub fn patch(&self, tree: &mut Tree) -> Result<bool> {
        self.patch_with(tree, &QueryDetector::default())
    }

    /// Specialize `tree` in place with a caller-supplied detector.
    pub fn patch_with(&self, tree: &mut Tree, detector: &QueryDetector) -> Result<bool> {
        let parser = ScriptParser::new()?;
        let mut engine = PatchEngine::new(self, detector, parser);
        engine.patch(tree)
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Adler-32 of `key`, read as a signed 32-bit value.
///
/// Negative sums encode as `a` + hex of the magnitude, the rest as `b` + hex.
pub fn checksum_of_key(key: &str) -> String {
    let mut adler = Adler32::new();
    adler.write_slice(key.as_bytes());

    let signed = adler.checksum() as i32;
    if signed < 0 {
        format!("a{:x}", signed.unsigned_abs())
    } else {
        format!("b{signed:x}")
    }
}

/// Shared permutations, one per canonical key.
pub struct PermutationCache {
    cache: Cache<String, Arc<Permutation>>,
}

impl Default for PermutationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl PermutationCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::new(capacity),
        }
    }

    /// The shared permutation for `combination`, created on first request.
    pub fn get_permutation(&self, combination: Combination) -> Arc<Permutation> {
        let key = combination.canonical_key();
        self.cache
            .get_with(key, || Arc::new(Permutation::new(combination)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Permutation {
        Permutation::new(
            Combination::new()
                .with("debug", false)
                .with("engine", "webkit")
                .with("legacy", true)
                .with("version", 3),
        )
    }

    #[test]
    fn known_checksums() {
        assert_eq!(checksum_of_key(""), "b1");
        assert_eq!(checksum_of_key("a:1;b:2"), "b7b701d6");
        assert_eq!(checksum_of_key("engine:webkit"), "b244b0537");
        assert_eq!(checksum_of_key("engine:gecko"), "b1ecd04ba");
        assert_eq!(
            checksum_of_key("debug:false;engine:webkit;legacy:true;version:3"),
            "a4b60edea"
        );
    }

    #[test]
    fn key_and_checksum_are_derived_once() {
        let p = sample();
        assert_eq!(p.key(), "debug:false;engine:webkit;legacy:true;version:3");
        assert_eq!(p.checksum(), "a4b60edea");
        assert_eq!(p.to_string(), p.key());
    }

    #[test]
    fn lookups() {
        let p = sample();
        assert!(p.has("engine"));
        assert!(!p.has("missing"));
        assert_eq!(p.get("legacy"), Some(&FlagValue::Bool(true)));
        assert_eq!(p.get_code("engine").as_deref(), Some("\"webkit\""));
        assert_eq!(p.get_code("debug").as_deref(), Some("false"));
        assert_eq!(p.get_code("missing"), None);
    }

    #[test]
    fn null_is_defined_but_has_no_code() {
        let p = Permutation::new(Combination::new().with("mode", FlagValue::Null));
        assert!(p.has("mode"));
        assert_eq!(p.get("mode"), Some(&FlagValue::Null));
        assert_eq!(p.get_code("mode"), None);
        assert_eq!(p.key(), "mode:null");
    }

    #[test]
    fn filter_keeps_only_relevant_keys() {
        let keys: BTreeSet<String> = ["engine", "unknown"].iter().map(|s| s.to_string()).collect();
        let filtered = sample().filter(&keys);

        assert_eq!(filtered.key(), "engine:webkit");
        assert_eq!(filtered.checksum(), "b244b0537");
    }

    #[test]
    fn cache_shares_instances_per_key() {
        let cache = PermutationCache::new(16);
        let a = cache.get_permutation(Combination::new().with("x", 1).with("y", true));
        let b = cache.get_permutation(Combination::new().with("y", true).with("x", 1));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
