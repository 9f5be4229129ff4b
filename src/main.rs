use std::process::ExitCode;

use clap::Parser;
use miette::{GraphicalReportHandler, GraphicalTheme};
use specializer::cli::{AppContext, Cli, Commands};
use specializer::cli_ext::{build_cmd, checksum_cmd, patch_cmd, preflight_cmd};
use specializer::error::SpecializeError;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Commands::Preflight(args) => preflight_cmd::run(args, &ctx),
        Commands::Patch(args) => patch_cmd::run(args, &ctx),
        Commands::Build(args) => build_cmd::run(args, &ctx),
        Commands::Checksum(args) => checksum_cmd::run(args, &ctx),
        Commands::Init(args) => specializer::infra::config::init(args, &ctx),
        Commands::Completions(args) => specializer::completion::run(args, &ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, &ctx);
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins; otherwise `-v` picks the level. Logs go to stderr.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report(err: &anyhow::Error, ctx: &AppContext) {
    let diagnostic = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<SpecializeError>());

    if let Some(diagnostic) = diagnostic {
        let theme = if ctx.no_color {
            GraphicalTheme::unicode_nocolor()
        } else {
            GraphicalTheme::default()
        };
        let mut rendered = String::new();
        if GraphicalReportHandler::new_themed(theme)
            .render_report(&mut rendered, diagnostic)
            .is_ok()
        {
            if err.chain().count() > 1 {
                eprintln!("{err}");
            }
            eprint!("{rendered}");
            return;
        }
    }

    eprintln!("Error: {err:#}");
}
