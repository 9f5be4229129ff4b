// Black-box tests of the `spz` binary against on-disk fixtures.
use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;

// Helper: a small project with two scripts and a combinations file.
fn make_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("app.js")
        .write_str(
            "if (core.Env.isSet(\"engine\", \"webkit\")) { prefix = \"-webkit-\"; }\n\
             var touch = has(\"touch\");\n",
        )
        .expect("write app.js");
    tmp.child("lib/util.js")
        .write_str("var debug = core.Env.getValue(\"debug\");\n")
        .expect("write util.js");
    // Ignored by default config
    tmp.child("node_modules/dep/index.js")
        .write_str("core.Env.getValue(\"hidden\");\n")
        .expect("write dep");
    tmp.child("combinations.json")
        .write_str(
            r#"[
                {"engine": "webkit", "touch": true, "debug": true},
                {"engine": "webkit", "touch": true, "debug": false},
                {"engine": "gecko", "touch": false}
            ]"#,
        )
        .expect("write combinations");

    tmp
}

fn spz() -> Command
{
    let mut cmd = Command::cargo_bin("spz").expect("bin");
    cmd.env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn preflight_json_lists_keys_per_file()
{
    let tmp = make_fixture();

    let out = spz()
        .current_dir(tmp.path())
        .args(["preflight", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: Value = serde_json::from_slice(&out).expect("json");
    insta::assert_json_snapshot!(v, @r###"
    {
      "files": {
        "app.js": [
          "engine",
          "touch"
        ],
        "lib/util.js": [
          "debug"
        ]
      },
      "keys": [
        "debug",
        "engine",
        "touch"
      ]
    }
    "###);
}

#[test]
fn preflight_tree_view()
{
    let tmp = make_fixture();

    spz()
        .current_dir(tmp.path())
        .arg("preflight")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 keys in 2 files"))
        .stdout(predicate::str::contains("lib/util.js"));
}

#[test]
fn patch_prints_to_stdout()
{
    let tmp = make_fixture();

    spz()
        .current_dir(tmp.path())
        .args(["patch", "app.js", "--set", "engine=gecko", "--set", "touch=true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("if(false){prefix=\"-webkit-\";}var touch=true;"));
}

#[test]
fn patch_writes_output_file()
{
    let tmp = make_fixture();
    tmp.child("combo.json")
        .write_str(r#"{"debug": false}"#)
        .expect("write combo");

    spz()
        .current_dir(tmp.path())
        .args(["patch", "lib/util.js", "--combination", "combo.json", "-o", "out/util.js"])
        .assert()
        .success();

    tmp.child("out/util.js")
        .assert(predicate::str::contains("var debug=false;"));
}

#[test]
fn patch_reports_syntax_errors()
{
    let tmp = make_fixture();
    tmp.child("broken.js")
        .write_str("var = ;\n")
        .expect("write broken");

    spz()
        .current_dir(tmp.path())
        .args(["patch", "broken.js", "--set", "debug=true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("syntax error"));
}

#[test]
fn build_writes_one_artifact_per_distinct_permutation()
{
    let tmp = make_fixture();

    let out = spz()
        .current_dir(tmp.path())
        .args(["build", "app.js", "--combinations", "combinations.json", "--out-dir", "dist", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let v: Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(v["requested"], 3);

    // debug is never queried by app.js, so the first two collapse
    let artifacts = v["artifacts"]
        .as_array()
        .expect("artifacts");
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0]["key"], "engine:webkit;touch:true");
    assert_eq!(artifacts[1]["key"], "engine:gecko;touch:false");

    for artifact in artifacts
    {
        let checksum = artifact["checksum"]
            .as_str()
            .expect("checksum");
        tmp.child(format!("dist/app.{checksum}.js"))
            .assert(predicate::path::exists());
    }
}

#[test]
fn build_dry_run_writes_nothing()
{
    let tmp = make_fixture();

    spz()
        .current_dir(tmp.path())
        .args(["--dry-run", "build", "app.js", "--combinations", "combinations.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"));

    tmp.child("dist")
        .assert(predicate::path::missing());
}

#[test]
fn checksum_of_assignments()
{
    spz()
        .args(["checksum", "--set", "engine=webkit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("b244b0537  engine:webkit\n"));
}

#[test]
fn checksum_rejects_bad_assignments()
{
    spz()
        .args(["checksum", "--set", "engine"])
        .assert()
        .failure();
}

#[test]
fn init_creates_config_once()
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    spz()
        .current_dir(tmp.path())
        .args(["init", "."])
        .assert()
        .success();
    tmp.child("specializer.toml")
        .assert(predicate::str::contains("file_pattern"));

    spz()
        .current_dir(tmp.path())
        .args(["init", "."])
        .assert()
        .failure();
}

#[test]
fn completions_to_stdout()
{
    spz()
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spz"));
}
