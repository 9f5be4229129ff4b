//! `spz preflight`: which flag keys each script depends on.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Context, Result};
use ptree::TreeBuilder;
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, instrument};

use crate::cli::{AppContext, PreflightArgs};
use crate::core::specialize::Specializer;
use crate::infra::config::load_config;
use crate::infra::io::read_file_smart;
use crate::infra::utils::{Paint, PathUtils};
use crate::infra::walk::FileWalker;

#[instrument(skip_all)]
pub fn run(args: PreflightArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let specializer = Specializer::new(&config.queries)?;

    let walker = FileWalker::new(&config.ignore_patterns)?.with_extensions(&config.extensions);
    let roots: Vec<PathBuf> = args.paths.iter().map(|p| PathUtils::expand(p)).collect();
    let files = walker.expand(&roots);
    let cwd = std::env::current_dir().context("Failed to read current directory")?;

    debug!(files = files.len(), "scanning");

    // Parse in parallel; order restored by the sorted map below
    let scanned: Vec<Result<(String, BTreeSet<String>)>> = files
        .par_iter()
        .map(|file| {
            let shown = PathUtils::display_relative(file, &cwd);
            let content = read_file_smart(file)?;
            let keys = specializer
                .scan(&shown, content.as_ref())
                .with_context(|| format!("Failed to scan {shown}"))?;
            Ok((shown, keys))
        })
        .collect();

    let mut per_file: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for entry in scanned {
        let (file, keys) = entry?;
        per_file.insert(file, keys);
    }

    let all: BTreeSet<&String> = per_file.values().flatten().collect();

    if args.json {
        let out = json!({
            "files": per_file,
            "keys": all,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if ctx.quiet {
        for key in &all {
            println!("{key}");
        }
        return Ok(());
    }

    let paint = Paint::new(ctx);
    let mut builder = TreeBuilder::new(format!(
        "{} keys in {} files",
        all.len(),
        per_file.len()
    ));

    for (file, keys) in &per_file {
        if keys.is_empty() {
            builder.add_empty_child(file.clone());
            continue;
        }
        builder.begin_child(file.clone());
        for key in keys {
            builder.add_empty_child(paint.accent(key));
        }
        builder.end_child();
    }

    ptree::print_tree(&builder.build())?;
    Ok(())
}
