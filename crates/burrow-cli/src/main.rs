//! # burrow-cli
//!
//! Command line for the Burrow package manager.
//!
//! This is the main entry point for the `burrow` tool. It handles command parsing,
//! sets up logging and error handling, and dispatches to the appropriate command handlers.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info};

use burrow_config::SettingsOverrides;
use burrow_core::error::{BurrowError, BurrowResult};
use burrow_core::types::Category;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Reproducible dependency locking for CRAN-style package repositories
#[derive(Parser)]
#[command(name = "burrow", version, about = "Resolve and lock R package dependencies")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Flags overriding user settings
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Maximum concurrent downloads
    #[arg(short, long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Runtime version that constraints on R are checked against
    #[arg(long, global = true, value_name = "VERSION")]
    pub runtime_version: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve dependencies and write burrow.lock
    Lock {
        /// Re-resolve even if the lock is up to date
        #[arg(long)]
        overwrite: bool,
        /// Keep the versions pinned by the existing lock where possible
        #[arg(long)]
        conservative: bool,
        /// Recompute archive fingerprints of the existing lock
        #[arg(long, conflicts_with_all = ["overwrite", "conservative"])]
        fix_hashes: bool,
    },
    /// Fetch locked packages and print the install plan
    Install {
        /// Fail instead of re-locking when the lock is missing or stale
        #[arg(long)]
        frozen: bool,
        /// Only install these categories (main, dev, doc)
        #[arg(long = "category", value_name = "CATEGORY")]
        categories: Vec<Category>,
    },
    /// Inspect or prune the download cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// List cached entries
    List,
    /// Remove one entry by digest
    Remove { digest: String },
    /// Remove every entry
    Clear,
}

impl From<SettingsArgs> for SettingsOverrides {
    fn from(args: SettingsArgs) -> Self {
        SettingsOverrides {
            cache_dir: args.cache_dir,
            max_concurrent_fetches: args.jobs,
            request_timeout_secs: args.timeout,
            index_ttl_secs: None,
            runtime_version: args.runtime_version,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting burrow v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> BurrowResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BurrowError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.settings.into()).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "burrow={level},burrow_core={level},burrow_cache={level},burrow_registry={level},\
             burrow_resolver={level},burrow_lockfile={level},burrow_config={level}"
        ))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("burrow encountered an unexpected error: {}", panic_info);
        eprintln!("burrow crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/burrow-pm/burrow/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
