//! Sync command - one full pass over the vault
//!
//! Loads the configuration, wires the Drive and filesystem adapters into a
//! scheduler and fires a manual trigger, so the `manual_sync` toggle applies.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{build_scheduler, load_valid_config, LOGIN_HINT};
use crate::output::{get_formatter, print_report, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let fmt = get_formatter(format);
        let config = load_valid_config(config_path)?;
        info!(
            config_path = %config_path.display(),
            vault = %config.sync.vault_root.display(),
            "Loaded configuration"
        );

        let scheduler = build_scheduler(&config)?;
        fmt.info(&format!("Syncing {}...", config.sync.vault_root.display()));

        match scheduler.trigger_manual().await {
            Ok(Some(report)) => {
                print_report(&*fmt, format, &report);
                Ok(())
            }
            Ok(None) => {
                fmt.warn("Manual sync is disabled (sync.manual_sync: false)");
                Ok(())
            }
            Err(e) => {
                if e.is_auth() {
                    fmt.error(LOGIN_HINT);
                }
                Err(e.into())
            }
        }
    }
}
