//! CLI for the rangefetch downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rangefetch_core::config;

pub use commands::GetArgs;
use commands::{run_config, run_get, run_probe};

/// Top-level CLI for rangefetch.
#[derive(Debug, Parser)]
#[command(name = "rangefetch")]
#[command(about = "rangefetch: concurrent range-based file downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL into the output directory.
    Get(GetArgs),

    /// Show file name, size and range support without downloading.
    Probe(GetArgs),

    /// Print the config file path and the effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get(args) => run_get(cfg, args).await?,
            CliCommand::Probe(args) => run_probe(cfg, args).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
