//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// xfck - verify a large file copy by content hash, resumably
#[derive(Parser)]
#[command(name = "xfck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify a large file copy by content hash, resumably")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file (default: ./xfck.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Populate the ledger if empty, then hash both trees
    Run(RunArgs),

    /// Show ledger progress counts
    Status {
        /// Restrict counts with a raw SQL predicate
        #[arg(long = "where", value_name = "SQL")]
        where_clause: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Restrict the hash phases with a raw SQL predicate
    #[arg(long = "where", value_name = "SQL")]
    pub where_clause: Option<String>,

    /// Number of concurrent hash workers per phase
    #[arg(long, value_name = "N")]
    pub hash_workers: Option<usize>,

    /// Number of concurrent directory walkers
    #[arg(long, value_name = "N")]
    pub walk_workers: Option<usize>,

    /// Skip hashing the destination tree
    #[arg(long)]
    pub skip_new: bool,

    /// Skip hashing the source tree
    #[arg(long)]
    pub skip_old: bool,

    /// Stop once the ledger is populated
    #[arg(long, conflicts_with_all = ["skip_new", "skip_old"])]
    pub enumerate_only: bool,
}

impl Commands {
    /// Filter override given on the command line, if any
    pub fn where_clause(&self) -> Option<&str> {
        match self {
            Commands::Run(args) => args.where_clause.as_deref(),
            Commands::Status { where_clause } => where_clause.as_deref(),
        }
    }
}
