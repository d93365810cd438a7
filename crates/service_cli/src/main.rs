//! Valuation CLI - Command Line Operations for Scenario Valuation
//!
//! This is the operational entry point for the scenario valuation engine.
//!
//! # Commands
//!
//! - `valuation evaluate --request <file>` - Build the forecast table and value it
//! - `valuation sensitivity --request <file>` - Two-axis sensitivity grid
//! - `valuation scenario --request <file>` - Manual or heuristic scenario generation
//! - `valuation check` - Print the effective configuration
//!
//! Requests are JSON files in the engine's request shapes. Results go to
//! stdout as JSON or tables; logs go to stderr.
//!
//! # Architecture
//!
//! As part of the **S**ervice layer, this crate owns configuration and
//! tracing initialisation and delegates all computation to `valuation_engine`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod render;

pub use error::{CliError, Result};

use config::{build_config, CliArgs, LogLevel};

/// Scenario valuation CLI
#[derive(Parser)]
#[command(name = "valuation")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (ignored when --log-level is given)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (defaults to ./valuation.toml when present)
    #[arg(short, long, global = true, env = "VALUATION_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (json, table)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Dedicated thread pool size for sensitivity grids
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Minimum grid cells before running in parallel
    #[arg(long, global = true)]
    parallel_threshold: Option<usize>,

    /// Per-cell timeout in milliseconds
    #[arg(long, global = true)]
    cell_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the forecast table and run the DCF valuation
    Evaluate {
        /// Path to an evaluate request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Compute a sensitivity grid around a base case
    Sensitivity {
        /// Path to a sensitivity request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Generate or validate a scenario
    Scenario {
        /// Path to a scenario request (JSON)
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Print the effective configuration
    Check,
}

fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config_file: cli.config.clone(),
        log_level: cli
            .log_level
            .clone()
            .or_else(|| cli.verbose.then(|| "debug".to_string())),
        format: cli.format.clone(),
        threads: cli.threads,
        parallel_threshold: cli.parallel_threshold,
        cell_timeout_ms: cli.cell_timeout_ms,
    };
    let config = build_config(&args)?;
    init_tracing(config.log_level);
    info!(format = %config.output_format, "Configuration loaded");

    match cli.command {
        Commands::Evaluate { request } => commands::evaluate::run(&request, &config),
        Commands::Sensitivity { request } => commands::sensitivity::run(&request, &config),
        Commands::Scenario { request } => commands::scenario::run(&request, &config),
        Commands::Check => commands::check::run(&config),
    }
}
