//! CLI for the MLT task core.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mlt_core::config;

use commands::{run_config, run_console};

/// Top-level CLI for the MLT transfer bot core.
#[derive(Debug, Parser)]
#[command(name = "mlt")]
#[command(about = "MLT: task registry, queueing and cancellation console", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Drive the task core from stdin with simulated engines.
    Console {
        /// Act as this user id (defaults to the configured owner).
        #[arg(long, value_name = "ID")]
        user: Option<i64>,
        /// Chat id used for /status views.
        #[arg(long, default_value = "1", value_name = "ID", allow_negative_numbers = true)]
        chat: i64,
        /// Print replies as JSON lines.
        #[arg(long)]
        json: bool,
    },

    /// Show the config file location and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Console { user, chat, json } => {
                run_console(&cfg, user.unwrap_or(cfg.owner_id), chat, json).await?
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
