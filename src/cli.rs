use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "spz")]
#[command(
    about = "Build-time permutation specializer: rewrites conditional-build queries in JavaScript into literals"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the flag keys each script queries
    Preflight(PreflightArgs),

    /// Specialize one script for one combination
    Patch(PatchArgs),

    /// Specialize one script for every combination in a file
    Build(BuildArgs),

    /// Print the canonical key and checksum of a combination
    Checksum(ChecksumArgs),

    /// Initialize a specializer.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// How a single combination is given on the command line
#[derive(Args, Debug, Default)]
pub struct CombinationArgs {
    /// Flag assignment; the value is read as JSON when it parses, else as text
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// JSON file holding one combination object (applied before --set)
    #[arg(long, value_name = "FILE")]
    pub combination: Option<PathBuf>,
}

#[derive(Parser)]
pub struct PreflightArgs {
    /// Script files or directories to scan
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Emit JSON instead of a tree view
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct PatchArgs {
    /// Script to specialize
    pub file: PathBuf,

    #[command(flatten)]
    pub combination: CombinationArgs,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Script to specialize
    pub file: PathBuf,

    /// JSON file with an array of combinations (or a single one)
    #[arg(long, value_name = "FILE")]
    pub combinations: PathBuf,

    /// Output directory (defaults to the configured one)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Keep flags the script never queries (one artifact per distinct combination)
    #[arg(long)]
    pub no_filter: bool,

    /// Emit the manifest as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ChecksumArgs {
    #[command(flatten)]
    pub combination: CombinationArgs,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
