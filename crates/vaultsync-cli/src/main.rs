//! VaultSync CLI - Command-line interface for VaultSync
//!
//! Provides commands for:
//! - Authorizing access to Google Drive
//! - Running a one-off sync pass
//! - Watching the vault and syncing continuously
//! - Inspecting and creating the configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vaultsync_core::config::Config;

mod commands;
mod output;

use commands::{
    auth::AuthCommand, config::ConfigCommand, sync::SyncCommand, watch::WatchCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "vaultsync", version, about = "Sync a notes vault with Google Drive")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Authorization commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Run one full sync pass
    Sync(SyncCommand),
    /// Watch the vault and sync changes as they happen
    Watch(WatchCommand),
    /// View and create configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Log filter: `RUST_LOG` wins, then `-v`, then `logging.level`
    fn env_filter(&self, config_path: &std::path::Path) -> EnvFilter {
        let level = match self.verbose {
            0 => Config::load_or_default(config_path).logging.level,
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path();

    tracing_subscriber::fmt()
        .with_env_filter(cli.env_filter(&config_path))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match &cli.command {
        Commands::Auth(cmd) => cmd.execute(format, &config_path).await,
        Commands::Sync(cmd) => cmd.execute(format, &config_path).await,
        Commands::Watch(cmd) => cmd.execute(format, &config_path).await,
        Commands::Config(cmd) => cmd.execute(format, &config_path).await,
    }
}
