//! Watch command - continuous sync until Ctrl-C
//!
//! Runs an initial full pass, starts the timer when `auto_sync` is on and
//! feeds watcher events to the scheduler.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use vaultsync_sync::watcher::FileWatcher;

use super::{build_scheduler, load_valid_config, LOGIN_HINT};
use crate::output::{get_formatter, print_report, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Skip the full pass at startup
    #[arg(long)]
    pub no_initial_sync: bool,
}

impl WatchCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let fmt = get_formatter(format);
        let config = load_valid_config(config_path)?;
        let scheduler = build_scheduler(&config)?;

        let (mut watcher, events) = FileWatcher::new(config.sync.vault_root.clone())?;
        watcher.watch()?;

        if !self.no_initial_sync {
            match scheduler.trigger_manual().await {
                Ok(Some(report)) => print_report(&*fmt, format, &report),
                Ok(None) => {}
                Err(e) if e.is_auth() => {
                    fmt.error(LOGIN_HINT);
                    return Err(e.into());
                }
                Err(e) => fmt.warn(&format!("Initial sync failed: {e}")),
            }
        }

        if config.sync.auto_sync {
            scheduler.start_timer(config.sync_interval());
        }

        let shutdown = CancellationToken::new();
        let ctrl_c = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            info!("Ctrl-C received");
            ctrl_c.cancel();
        });

        fmt.success(&format!(
            "Watching {} (Ctrl-C to stop)",
            config.sync.vault_root.display()
        ));
        scheduler.run(events, shutdown).await;

        drop(watcher);
        fmt.success("Stopped");
        Ok(())
    }
}
