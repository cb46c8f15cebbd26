//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod config_cmd;
mod url;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings, LoadOptions};
use crate::services::ExportFormat;

#[derive(Parser)]
#[command(name = "amachecker")]
#[command(about = "Check product pages for a price-per-unit text")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Check every product listed in a marketplace export file
    Check {
        /// CSV/TSV export containing an identifier column
        file: PathBuf,
        /// Regular expression the price element text must match
        #[arg(short, long)]
        pattern: Option<String>,
        /// Column name fragment identifying the identifier column
        #[arg(long)]
        column: Option<String>,
        /// Output file (default: AmaChecker_<timestamp>.<format> in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: ExportFormat,
        /// Number of concurrent fetch workers
        #[arg(long)]
        fetch_workers: Option<usize>,
        /// Number of concurrent verify workers
        #[arg(long)]
        verify_workers: Option<usize>,
        /// Skip the randomized pause after each request
        #[arg(long)]
        no_delay: bool,
        /// Hide the progress bar and per-item messages
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the product URL for one or more identifiers
    Url {
        /// Product identifiers
        #[arg(required = true)]
        identifiers: Vec<String>,
    },

    /// Show the effective configuration
    Config,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut settings, config) = load_settings(LoadOptions {
        config_path: cli.config.clone(),
    })
    .await?;

    match cli.command {
        Commands::Check {
            file,
            pattern,
            column,
            output,
            format,
            fetch_workers,
            verify_workers,
            no_delay,
            quiet,
        } => {
            if let Some(pattern) = pattern {
                settings.pattern = pattern;
            }
            if let Some(column) = column {
                settings.identifier_column = column;
            }
            if let Some(workers) = fetch_workers {
                settings.fetch_workers = workers;
            }
            if let Some(workers) = verify_workers {
                settings.verify_workers = workers;
            }
            if no_delay {
                settings.delay_min_ms = 0;
                settings.delay_max_ms = 0;
            }

            check::cmd_check(
                &settings,
                check::CheckArgs {
                    file,
                    output,
                    format,
                    quiet,
                },
            )
            .await
        }
        Commands::Url { identifiers } => url::cmd_url(&settings, &identifiers),
        Commands::Config => config_cmd::cmd_config_show(&settings, config.source_path.as_deref()),
    }
}
