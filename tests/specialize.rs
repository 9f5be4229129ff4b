// End-to-end behavior of the library: parse a script, patch it for one
// combination, print it back. Expected outputs are in the compact form
// produced by the printer.
use std::collections::BTreeSet;
use std::sync::Arc;

use specializer::core::preflight;
use specializer::syntax::{ScriptParser, print};
use specializer::{Combination, FlagValue, Permutation, QueryVocabulary, Specializer};

// Helper: specialize `src` for `combination` through the public pipeline.
fn run(
    src: &str,
    combination: Combination,
) -> (String, bool)
{
    let specializer = Specializer::new(&QueryVocabulary::default()).expect("specializer");
    let artifact = specializer
        .specialize("test.js", src, Arc::new(Permutation::new(combination)))
        .expect("specialize");
    (artifact.code.to_string(), artifact.modified)
}

fn engine(value: &str) -> Combination
{
    Combination::new().with("engine", value)
}

#[test]
fn is_set_matches_the_stored_value()
{
    let src = r#"if (core.Env.isSet("engine", "webkit")) { go(); }"#;

    let (out, modified) = run(src, engine("webkit"));
    assert!(modified);
    assert_eq!(out, "if(true){go();}");

    let (out, modified) = run(src, engine("gecko"));
    assert!(modified);
    assert_eq!(out, "if(false){go();}");
}

#[test]
fn is_set_accepts_alternatives()
{
    let src = r#"var w = core.Env.isSet("engine", "gecko|webkit");"#;

    assert_eq!(run(src, engine("webkit")).0, "var w=true;");
    assert_eq!(run(src, engine("gecko")).0, "var w=true;");
    assert_eq!(run(src, engine("trident")).0, "var w=false;");
}

#[test]
fn is_set_compares_booleans_and_numbers_by_token()
{
    let src = r#"a = core.Env.isSet("debug", true); b = core.Env.isSet("version", 3);"#;
    let combination = Combination::new()
        .with("debug", true)
        .with("version", 3);

    assert_eq!(run(src, combination).0, "a=true;b=true;");
}

#[test]
fn get_value_renders_a_literal()
{
    let src = r#"var e = core.Env.getValue("engine");"#;
    let (out, modified) = run(src, engine("webkit"));
    assert!(modified);
    assert_eq!(out, r#"var e="webkit";"#);

    let numbers = Combination::new().with("version", 3);
    assert_eq!(run(r#"v = core.Env.getValue("version");"#, numbers).0, "v=3;");
}

#[test]
fn object_and_array_values_are_spliced_unquoted()
{
    let combination = Combination::new()
        .with("opts", "{a:1}")
        .with("list", "[1,2]");
    let src = r#"x = core.Env.getValue("opts"); y = core.Env.getValue("list");"#;

    assert_eq!(run(src, combination).0, "x=({a:1});y=[1,2];");
}

#[test]
fn select_picks_the_matching_property()
{
    let src = r#"var p = core.Env.select("engine", { webkit: "Webkit", gecko: "Moz" });"#;

    assert_eq!(run(src, engine("webkit")).0, r#"var p="Webkit";"#);
    assert_eq!(run(src, engine("gecko")).0, r#"var p="Moz";"#);
}

#[test]
fn select_without_match_or_default_is_left_alone()
{
    let src = r#"var p = core.Env.select("engine", { webkit: "Webkit", gecko: "Moz" });"#;
    let (out, modified) = run(src, engine("presto"));

    assert!(!modified);
    assert_eq!(out, r#"var p=core.Env.select("engine",{webkit:"Webkit",gecko:"Moz"});"#);
}

#[test]
fn select_falls_back_to_default()
{
    let src = r#"var p = core.Env.select("engine", { default: "Other", webkit: "Webkit" });"#;

    assert_eq!(run(src, engine("presto")).0, r#"var p="Other";"#);
    // default is only a fallback, a later match still wins
    assert_eq!(run(src, engine("webkit")).0, r#"var p="Webkit";"#);
}

#[test]
fn select_first_matching_property_wins()
{
    let src = r#"x = core.Env.select("engine", { "gecko|webkit": 1, webkit: 2 });"#;
    assert_eq!(run(src, engine("webkit")).0, "x=1;");
}

#[test]
fn undefined_keys_pass_through()
{
    let src = r#"a = core.Env.isSet("engine", "webkit"); b = core.Env.getValue("engine"); c = core.Env.select("engine", { default: 1 }); d = has("engine");"#;

    let (untouched, modified) = run(src, Combination::new().with("other", true));
    let (baseline, _) = run(src, Combination::new());

    assert!(!modified);
    assert_eq!(untouched, baseline);
}

#[test]
fn feature_test_is_boolean_only()
{
    let src = r#"t = has("touch"); s = has("engine");"#;
    let combination = Combination::new()
        .with("touch", true)
        .with("engine", "webkit");

    let (out, modified) = run(src, combination);
    assert!(modified);
    assert_eq!(out, r#"t=true;s=has("engine");"#);
}

#[test]
fn malformed_shapes_are_not_rewritten()
{
    let src = r#"a = core.Env.getValue(name); b = core.Env.getValue("engine", 1); c = core.Env.select("engine", map); d = core["Env"].isSet("engine");"#;
    let (out, modified) = run(src, engine("webkit"));

    assert!(!modified);
    assert_eq!(
        out,
        r#"a=core.Env.getValue(name);b=core.Env.getValue("engine",1);c=core.Env.select("engine",map);d=core["Env"].isSet("engine");"#
    );
}

#[test]
fn compatibility_names_are_recognized()
{
    let src = r#"a = qx.core.Variant.isSet("engine", "webkit"); b = jasy.Permutation.getValue("engine");"#;
    assert_eq!(run(src, engine("webkit")).0, r#"a=true;b="webkit";"#);
}

#[test]
fn patching_is_idempotent()
{
    let src = r#"if (core.Env.isSet("engine", "webkit")) { x = core.Env.getValue("engine"); }"#;
    let (first, modified) = run(src, engine("webkit"));
    assert!(modified);

    let (second, modified) = run(&first, engine("webkit"));
    assert!(!modified);
    assert_eq!(first, second);
}

#[test]
fn permutation_patch_on_a_parsed_tree()
{
    let mut tree = ScriptParser::new()
        .expect("parser")
        .parse_program("t.js", r#"var d = core.Env.getValue("debug");"#)
        .expect("parse");
    let permutation = Permutation::new(Combination::new().with("debug", false));

    assert!(permutation.patch(&mut tree).expect("patch"));
    assert_eq!(print(&tree), "var d=false;");
    assert!(!permutation.patch(&mut tree).expect("patch"));
}

#[test]
fn preflight_collects_every_key()
{
    let tree = ScriptParser::new()
        .expect("parser")
        .parse_program(
            "t.js",
            r#"
            if (core.Env.isSet("a", true)) {}
            var b = core.Env.getValue("b");
            var c = core.Env.select("c", { x: 1 });
            "#,
        )
        .expect("parse");

    let keys = preflight(&tree, None).expect("preflight");
    let expected: BTreeSet<String> = ["a", "b", "c"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn preflight_extends_given_keys()
{
    let tree = ScriptParser::new()
        .expect("parser")
        .parse_program("t.js", r#"has("touch");"#)
        .expect("parse");

    let seed: BTreeSet<String> = BTreeSet::from(["debug".to_string()]);
    let keys = preflight(&tree, Some(seed)).expect("preflight");
    assert_eq!(keys.len(), 2);
    assert!(keys.contains("touch"));
}

#[test]
fn plan_filters_and_dedupes_permutations()
{
    let specializer = Specializer::new(&QueryVocabulary::default()).expect("specializer");
    let src = r#"x = core.Env.getValue("engine");"#;

    // Two combinations that only differ in an unused flag collapse into one
    let combinations = vec![
        engine("webkit").with("debug", true),
        engine("webkit").with("debug", false),
        engine("gecko"),
    ];

    let plan = specializer
        .plan("t.js", src, combinations)
        .expect("plan");
    assert_eq!(plan.requested, 3);
    assert_eq!(plan.permutations.len(), 2);
    assert_eq!(plan.permutations[0].key(), "engine:webkit");

    let built = specializer
        .build("t.js", src, &plan.permutations)
        .expect("build");
    let codes: Vec<&str> = built
        .iter()
        .map(|a| a.code.as_ref())
        .collect();
    assert_eq!(codes, vec![r#"x="webkit";"#, r#"x="gecko";"#]);
    assert_eq!(built[0].checksum, "b244b0537");
}

#[test]
fn unfiltered_plan_keeps_every_distinct_combination()
{
    let specializer = Specializer::new(&QueryVocabulary::default())
        .expect("specializer")
        .with_filtering(false);
    let combinations = vec![
        engine("webkit").with("debug", true),
        engine("webkit").with("debug", false),
    ];

    let plan = specializer
        .plan("t.js", "x = 1;", combinations)
        .expect("plan");
    assert_eq!(plan.permutations.len(), 2);
    assert!(plan.keys.is_none());
}

#[test]
fn null_values_leave_queries_for_runtime()
{
    let combination = Combination::new().with("mode", FlagValue::Null);
    let src = r#"a = core.Env.getValue("mode"); b = core.Env.isSet("mode", null); c = core.Env.select("mode", { default: 1 });"#;

    let (out, modified) = run(src, combination);
    assert!(!modified);
    assert_eq!(
        out,
        r#"a=core.Env.getValue("mode");b=core.Env.isSet("mode",null);c=core.Env.select("mode",{default:1});"#
    );
}

#[test]
fn computed_keys_keep_every_flag_in_the_plan()
{
    let specializer = Specializer::new(&QueryVocabulary::default()).expect("specializer");
    let src = r#"x = core.Env.select(core.Env.getValue("which"), { a: 1, b: 2 });"#;

    // `b` is only named through the value of `which`
    let combinations = vec![
        Combination::new().with("which", "b").with("b", "b"),
        Combination::new().with("which", "b").with("b", "a"),
    ];

    let plan = specializer
        .plan("t.js", src, combinations)
        .expect("plan");
    assert!(plan.keys.is_none());
    assert_eq!(plan.permutations.len(), 2);

    let built = specializer
        .build("t.js", src, &plan.permutations)
        .expect("build");
    let codes: Vec<&str> = built
        .iter()
        .map(|a| a.code.as_ref())
        .collect();
    assert_eq!(codes, vec!["x=2;", "x=1;"]);
}
