//! `spz checksum`: canonical key and checksum of one combination.

use anyhow::{Context, Result};
use serde_json::json;

use crate::cli::{AppContext, ChecksumArgs, CombinationArgs};
use crate::core::combination::Combination;
use crate::core::permutation::Permutation;
use crate::infra::utils::{Paint, PathUtils};

/// Build the combination described by `--combination FILE` and `--set` flags.
pub fn load_combination(args: &CombinationArgs) -> Result<Combination> {
    let base = match &args.combination {
        Some(path) => {
            let path = PathUtils::expand(path);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read combination {}", path.display()))?;
            Combination::from_json_str(&text)
                .with_context(|| format!("Failed to parse combination {}", path.display()))?
        }
        None => Combination::new(),
    };

    Ok(base.merge_assignments(&args.set)?)
}

pub fn run(args: ChecksumArgs, ctx: &AppContext) -> Result<()> {
    let permutation = Permutation::new(load_combination(&args.combination)?);

    if args.json {
        let out = json!({
            "key": permutation.key(),
            "checksum": permutation.checksum(),
            "values": permutation.combination(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let paint = Paint::new(ctx);
    println!("{}  {}", paint.accent(permutation.checksum()), permutation.key());
    Ok(())
}
