//! CLI subcommands and the wiring they share

pub mod auth;
pub mod config;
pub mod sync;
pub mod watch;

use std::{path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use tracing::info;
use vaultsync_core::config::Config;
use vaultsync_drive::provider::DriveRemoteStore;
use vaultsync_sync::{
    filesystem::LocalFileSystemAdapter,
    reconciler::Reconciler,
    scheduler::{SchedulerOptions, SyncScheduler},
};

/// Loads the config file, falling back to defaults when it doesn't exist
///
/// A file that exists but doesn't parse is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!(config_path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Loads the config and rejects it if any field is invalid
pub fn load_valid_config(path: &Path) -> Result<Config> {
    let config = load_config(path)?;
    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        bail!("Invalid configuration: {}", messages.join("; "));
    }
    if config.auth.client_id.is_empty() {
        bail!("auth.client_id is not set in {}", path.display());
    }
    Ok(config)
}

/// Builds the drive adapter, the vault adapter and the scheduler from config
pub fn build_scheduler(config: &Config) -> Result<SyncScheduler> {
    let root = &config.sync.vault_root;
    if !root.is_dir() {
        bail!("Vault root {} is not a directory", root.display());
    }

    let remote = DriveRemoteStore::from_config(config)?;
    let local = LocalFileSystemAdapter::new(root.clone());
    let reconciler = Reconciler::new(Arc::new(local), Arc::new(remote), config.storage_mode());

    Ok(SyncScheduler::new(
        reconciler,
        SchedulerOptions::from(&config.sync),
    ))
}

/// Hint printed when the drive rejects the stored credentials
pub const LOGIN_HINT: &str = "Run 'vaultsync auth url' and 'vaultsync auth login --code <CODE>'";
