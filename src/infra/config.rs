use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::query::QueryVocabulary;

/// Config file names probed in the working directory, first hit wins
const CONFIG_FILES: [&str; 4] = [
    "specializer.toml",
    "specializer.yaml",
    "specializer.json",
    ".specializer.toml",
];

/// File written by `spz init`
const INIT_FILE: &str = "specializer.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Ignore patterns applied while walking (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// File extensions treated as scripts
    pub extensions: Vec<String>,

    /// Query names recognized in scripts
    pub queries: QueryVocabulary,

    /// Artifact output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig
{
    /// Directory artifacts are written to
    pub dir: PathBuf,

    /// Artifact file name; `{stem}` and `{checksum}` are substituted
    pub file_pattern: String,

    /// Drop flags a script never queries before computing checksums
    pub filter_permutations: bool,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "node_modules/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                ".git/**".to_string(),
                "**/*.min.js".to_string(),
            ],
            extensions: vec!["js".to_string(), "mjs".to_string(), "cjs".to_string()],
            queries: QueryVocabulary::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for OutputConfig
{
    fn default() -> Self
    {
        Self {
            dir: PathBuf::from("dist"),
            file_pattern: "{stem}.{checksum}.js".to_string(),
            filter_permutations: true,
        }
    }
}

pub fn load_config() -> Result<Config>
{
    load_config_in(Path::new("."))
}

/// Load configuration from the first config file found in `dir`.
pub fn load_config_in(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            tracing::debug!(path = %path.display(), "loading config");
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // Add environment variables with SPECIALIZER_ prefix
    builder = builder.add_source(config::Environment::with_prefix("SPECIALIZER").separator("_"));

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(INIT_FILE);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("DRY RUN: would write {}:\n{toml_string}", config_path.display());
        }
        return Ok(());
    }

    std::fs::create_dir_all(&args.path).context("Failed to create config directory")?;
    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
