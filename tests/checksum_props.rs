// Property tests for canonical keys and checksums.
use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use specializer::core::checksum_of_key;
use specializer::{Combination, FlagValue, Permutation};

fn flag_value() -> impl Strategy<Value = FlagValue>
{
    prop_oneof![
        Just(FlagValue::Null),
        any::<bool>().prop_map(FlagValue::from),
        any::<i32>().prop_map(FlagValue::from),
        "[a-z0-9|-]{0,8}".prop_map(FlagValue::from),
    ]
}

fn entries() -> impl Strategy<Value = BTreeMap<String, FlagValue>>
{
    prop::collection::btree_map("[a-z][a-zA-Z0-9_]{0,6}", flag_value(), 0..8)
}

proptest! {
    // Insertion order never reaches the key
    #[test]
    fn key_ignores_insertion_order(map in entries())
    {
        let forward: Combination = map.clone().into_iter().collect();
        let backward: Combination = map.into_iter().rev().collect();

        let a = Permutation::new(forward);
        let b = Permutation::new(backward);
        prop_assert_eq!(a.key(), b.key());
        prop_assert_eq!(a.checksum(), b.checksum());
    }

    // a/b sign letter followed by lowercase hex that fits in 31 bits (32 for `a`)
    #[test]
    fn checksum_shape(key in ".{0,64}")
    {
        let checksum = checksum_of_key(&key);
        let (sign, digits) = checksum.split_at(1);

        prop_assert!(sign == "a" || sign == "b");
        prop_assert!(!digits.is_empty());
        prop_assert!(digits.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let magnitude = u64::from_str_radix(digits, 16).expect("hex");
        if sign == "a"
        {
            prop_assert!(magnitude >= 1 && magnitude <= 1 << 31);
        }
        else
        {
            prop_assert!(magnitude < 1 << 31);
        }
    }

    #[test]
    fn checksum_is_stable(map in entries())
    {
        let combination: Combination = map.into_iter().collect();
        let first = Permutation::new(combination.clone());
        let second = Permutation::new(combination);
        prop_assert_eq!(first.checksum(), second.checksum());
        let expected = checksum_of_key(first.key());
        prop_assert_eq!(first.checksum(), expected.as_str());
    }

    // Filtering keeps exactly the requested keys that were defined
    #[test]
    fn filter_keeps_a_subset(map in entries(), picks in prop::collection::vec(any::<prop::sample::Index>(), 0..4))
    {
        let names: Vec<String> = map.keys().cloned().collect();
        let wanted: BTreeSet<String> = if names.is_empty()
        {
            BTreeSet::new()
        }
        else
        {
            picks.iter().map(|i| names[i.index(names.len())].clone()).collect()
        };

        let permutation = Permutation::new(map.into_iter().collect());
        let filtered = permutation.filter(&wanted);

        let kept: BTreeSet<String> = filtered.combination().keys().map(str::to_string).collect();
        prop_assert_eq!(&kept, &wanted);
        for key in &kept
        {
            prop_assert_eq!(filtered.get(key), permutation.get(key));
        }
    }
}

#[test]
fn known_keys_and_checksums()
{
    let combination = Combination::new()
        .with("version", 3)
        .with("legacy", true)
        .with("engine", "webkit")
        .with("debug", false);
    let permutation = Permutation::new(combination);

    assert_eq!(permutation.key(), "debug:false;engine:webkit;legacy:true;version:3");
    assert_eq!(permutation.checksum(), "a4b60edea");
    assert_eq!(checksum_of_key(""), "b1");
    assert_eq!(checksum_of_key("engine:gecko"), "b1ecd04ba");
}
