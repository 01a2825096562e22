//! Pastry CLI
//!
//! Prints the cached results table, rebuilding it when missing.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pastry::config::{PastryConfig, CONFIG_FILE};
use pastry::experiment::display::{export_rows, print_display};
use pastry::experiment::{CacheDisplay, ResultsDisplay, ResultsRepo, ResultsStore};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pastry")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect tracked experiment results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the most recent results
    Print {
        /// Number of rows to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Also write the shown rows to this file
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Config file
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },
    /// Rebuild the results cache from the results directory
    Refresh {
        /// Config file
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },
}

fn load_config(path: &Path) -> Result<PastryConfig> {
    PastryConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pastry=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match Cli::parse().command {
        Command::Print {
            limit,
            export,
            config,
        } => {
            let config = load_config(&config)?;
            let limit = limit.or(config.display_limit);
            print_display(&config, limit).context("Failed to print results")?;
            if let Some(dest) = export {
                export_rows(&config.cache_path, limit, &dest)
                    .with_context(|| format!("Failed to export to {}", dest.display()))?;
                info!(dest = %dest.display(), "Exported results");
            }
        }
        Command::Refresh { config } => {
            let config = load_config(&config)?;
            let store = ResultsRepo::new(&config.results_dir);
            CacheDisplay::new(&config.cache_path)
                .refresh(store.list()?)
                .context("Failed to refresh results cache")?;
        }
    }

    Ok(())
}
