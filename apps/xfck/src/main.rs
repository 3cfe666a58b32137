//! xfck - resumable content verification for large file copies
//!
//! Populates a ledger from the destination tree, then hashes every file in
//! both trees through the ops crate. Rerunning picks up where a previous run
//! stopped.

mod cli;
mod display;
mod error;

use crate::cli::{Cli, Commands};
use crate::display::OutputRenderer;
use crate::error::CliError;
use clap::Parser;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xfck_config::Config;
use xfck_ops::{ledger_status, open_ledger, run_pipeline, PipelineOptions, VerifyContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!(error = %e, "xfck failed");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting xfck v{}", env!("CARGO_PKG_VERSION"));

    // file < env < flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.command)?;

    let renderer = OutputRenderer::new(cli.global.json);

    match &cli.command {
        Commands::Run(args) => {
            let ctx = VerifyContext::open(&config).await?;
            let options = PipelineOptions {
                skip_new: args.skip_new,
                skip_old: args.skip_old,
                enumerate_only: args.enumerate_only,
            };
            let result = run_pipeline(&ctx, &options).await;
            // Close the pool on success and failure alike
            ctx.close().await;
            renderer.render_run(&result?)?;
        }
        Commands::Status { .. } => {
            let ledger = open_ledger(&config.ledger).await?;
            let result = ledger_status(&ledger, config.ledger.filter()).await;
            ledger.close().await;
            renderer.render_status(&result?)?;
        }
    }

    info!("Command completed successfully");
    Ok(())
}

/// Apply command-line overrides on top of file and environment settings
fn apply_cli_config(config: &mut Config, command: &Commands) -> Result<(), CliError> {
    if let Some(clause) = command.where_clause() {
        if clause.trim().is_empty() {
            return Err(CliError::InvalidArguments(
                "--where needs a non-empty SQL predicate".to_string(),
            ));
        }
        config.ledger.where_clause = Some(clause.to_string());
    }

    if let Commands::Run(args) = command {
        if let Some(workers) = args.hash_workers {
            config.workers.hash_workers = workers;
        }
        if let Some(workers) = args.walk_workers {
            config.workers.walk_workers = workers;
        }
    }

    Ok(())
}

/// Initialize tracing
///
/// Logs go to stderr so stdout carries only the command result. `RUST_LOG`
/// overrides the built-in filter.
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "info,xfck=debug,xfck_ops=debug,xfck_ledger=debug,xfck_config=debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_mode {
        builder.json().init();
    } else {
        builder.with_target(debug_enabled).init();
    }
}
