//! `spz patch`: specialize one script for one combination.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::cli::{AppContext, PatchArgs};
use crate::cli_ext::checksum_cmd::load_combination;
use crate::core::permutation::Permutation;
use crate::core::specialize::Specializer;
use crate::infra::config::load_config;
use crate::infra::io::{read_file_smart, write_output};
use crate::infra::utils::{Paint, PathUtils};

#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn run(args: PatchArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let permutation = Arc::new(Permutation::new(load_combination(&args.combination)?));

    let file = PathUtils::expand(&args.file);
    let content = read_file_smart(&file)?;
    let name = file.display().to_string();

    let specializer = Specializer::new(&config.queries)?;
    let artifact = specializer
        .specialize(&name, content.as_ref(), permutation)
        .with_context(|| format!("Failed to specialize {name}"))?;

    debug!(
        checksum = %artifact.checksum,
        modified = artifact.modified,
        bytes = artifact.code.len(),
        "specialized"
    );

    let Some(output) = args.output else {
        println!("{}", artifact.code);
        return Ok(());
    };

    let output = PathUtils::expand(&output);
    let paint = Paint::new(ctx);

    if ctx.dry_run {
        if !ctx.quiet {
            println!(
                "{}",
                paint.warn(&format!(
                    "DRY RUN: would write {} bytes to {} ({})",
                    artifact.code.len(),
                    output.display(),
                    artifact.checksum
                ))
            );
        }
        return Ok(());
    }

    write_output(&output, &artifact.code)?;

    if !ctx.quiet {
        eprintln!(
            "{} Wrote {} ({})",
            paint.ok("✓"),
            output.display(),
            paint.accent(&artifact.checksum)
        );
    }
    Ok(())
}
