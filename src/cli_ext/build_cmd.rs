//! `spz build`: one artifact per distinct permutation of one script.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use tabled::{Table, Tabled};
use tracing::{debug, instrument};

use crate::cli::{AppContext, BuildArgs};
use crate::core::combination::Combination;
use crate::core::specialize::{Specializer, render_file_name};
use crate::infra::config::load_config;
use crate::infra::io::{read_file_smart, write_output};
use crate::infra::utils::{Paint, PathUtils};

/// One manifest row.
#[derive(Debug, Serialize, Tabled)]
struct ManifestEntry
{
    checksum: String,
    key: String,
    file: String,
    modified: bool,
    bytes: usize,
}

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn run(
    args: BuildArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config().unwrap_or_default();

    let file = PathUtils::expand(&args.file);
    let content = read_file_smart(&file)?;
    let source = content.as_ref();
    let name = file
        .display()
        .to_string();

    let combinations_path = PathUtils::expand(&args.combinations);
    let text = std::fs::read_to_string(&combinations_path).with_context(|| {
        format!("Failed to read combinations {}", combinations_path.display())
    })?;
    let combinations = Combination::list_from_json_str(&text).with_context(|| {
        format!("Failed to parse combinations {}", combinations_path.display())
    })?;

    let filtering = config
        .output
        .filter_permutations
        && !args.no_filter;
    let specializer = Specializer::new(&config.queries)?.with_filtering(filtering);

    let plan = specializer
        .plan(&name, source, combinations)
        .with_context(|| format!("Failed to plan {name}"))?;

    let out_dir = args
        .out_dir
        .as_deref()
        .map(PathUtils::expand)
        .unwrap_or_else(|| {
            config
                .output
                .dir
                .clone()
        });
    let stem = PathUtils::stem(&file);
    let target_of = |checksum: &str| {
        out_dir.join(render_file_name(
            &config
                .output
                .file_pattern,
            &stem,
            checksum,
        ))
    };

    let paint = Paint::new(ctx);

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!(
                "{}",
                paint.warn(&format!(
                    "DRY RUN: would build {} artifacts from {} combinations:",
                    plan.permutations
                        .len(),
                    plan.requested
                ))
            );
            for permutation in &plan.permutations
            {
                println!(
                    "  {} {}  {}",
                    paint.accent(permutation.checksum()),
                    target_of(permutation.checksum()).display(),
                    permutation.key()
                );
            }
        }
        return Ok(());
    }

    let progress = if ctx.quiet || args.json
    {
        ProgressBar::hidden()
    }
    else
    {
        let pb = ProgressBar::new(
            plan.permutations
                .len() as u64,
        );
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    };

    let artifacts = specializer
        .build_with(&name, source, &plan.permutations, |artifact| {
            progress.inc(1);
            progress.set_message(
                artifact
                    .checksum
                    .clone(),
            );
        })
        .with_context(|| format!("Failed to specialize {name}"))?;

    progress.finish_and_clear();

    let mut manifest = Vec::with_capacity(artifacts.len());
    for artifact in &artifacts
    {
        let target = target_of(&artifact.checksum);
        write_output(&target, &artifact.code)?;
        debug!(path = %target.display(), "wrote artifact");

        manifest.push(ManifestEntry {
            checksum: artifact
                .checksum
                .clone(),
            key: artifact
                .key
                .clone(),
            file: target
                .display()
                .to_string(),
            modified: artifact.modified,
            bytes: artifact
                .code
                .len(),
        });
    }

    if args.json
    {
        let out = json!({
            "source": name,
            "keys": plan.keys,
            "requested": plan.requested,
            "artifacts": manifest,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if !ctx.quiet
    {
        println!("{}", Table::new(&manifest));
        println!(
            "{} Built {} artifacts from {} combinations into {}",
            paint.ok("✓"),
            manifest.len(),
            plan.requested,
            out_dir.display()
        );
    }

    Ok(())
}
