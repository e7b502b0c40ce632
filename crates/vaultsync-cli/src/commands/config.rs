//! Config command - view, create and check the configuration file

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;
use vaultsync_core::config::{Config, ConfigBuilder, StorageLocation};

use super::load_config;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Write a starter configuration file
    Init {
        /// OAuth client id
        #[arg(long)]
        client_id: String,
        /// OAuth client secret
        #[arg(long)]
        client_secret: String,
        /// Vault directory to sync
        #[arg(long)]
        vault: Option<std::path::PathBuf>,
        /// Store files in a visible Drive folder with this name instead of
        /// the hidden app space
        #[arg(long)]
        folder: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
    /// Check the configuration file for errors
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(format, config_path),
            ConfigCommand::Init {
                client_id,
                client_secret,
                vault,
                folder,
                force,
            } => {
                let mut builder = ConfigBuilder::new().client(client_id, client_secret);
                if let Some(vault) = vault {
                    builder = builder.vault_root(vault.clone());
                }
                if let Some(folder) = folder {
                    builder = builder.storage(StorageLocation::Visible, folder.clone());
                }
                execute_init(builder, *force, format, config_path)
            }
            ConfigCommand::Path => {
                let fmt = get_formatter(format);
                if format.is_json() {
                    fmt.print_json(&serde_json::json!({ "path": config_path.display().to_string() }));
                } else {
                    println!("{}", config_path.display());
                }
                Ok(())
            }
            ConfigCommand::Validate => execute_validate(format, config_path),
        }
    }
}

fn execute_show(format: OutputFormat, config_path: &Path) -> Result<()> {
    let fmt = get_formatter(format);
    let mut config = load_config(config_path)?;
    info!(config_path = %config_path.display(), "Showing configuration");

    // Secrets never reach the terminal
    if !config.auth.client_secret.is_empty() {
        config.auth.client_secret = "<redacted>".into();
    }
    if config.auth.refresh_token.is_some() {
        config.auth.refresh_token = Some("<redacted>".into());
    }

    if format.is_json() {
        let json = serde_json::to_value(&config).context("Failed to serialize configuration")?;
        fmt.print_json(&json);
    } else {
        fmt.success(&format!("Configuration ({})", config_path.display()));
        let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
        for line in yaml.lines() {
            fmt.info(line);
        }
    }
    Ok(())
}

fn execute_init(
    builder: ConfigBuilder,
    force: bool,
    format: OutputFormat,
    config_path: &Path,
) -> Result<()> {
    let fmt = get_formatter(format);
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config: Config = builder
        .build_validated()
        .map_err(|errors| {
            let messages: Vec<String> = errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            anyhow::anyhow!("Invalid configuration: {}", messages.join("; "))
        })?;
    config.save(config_path)?;
    info!(config_path = %config_path.display(), "Wrote configuration");

    if format.is_json() {
        fmt.print_json(&serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        fmt.success(&format!("Wrote {}", config_path.display()));
        fmt.info("Next: vaultsync auth url --open");
    }
    Ok(())
}

fn execute_validate(format: OutputFormat, config_path: &Path) -> Result<()> {
    let fmt = get_formatter(format);
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let errors = config.validate();

    if format.is_json() {
        let errors: Vec<_> = errors
            .iter()
            .map(|e| serde_json::json!({ "field": e.field, "message": e.message }))
            .collect();
        fmt.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "errors": errors,
        }));
    } else if errors.is_empty() {
        fmt.success(&format!("{} is valid", config_path.display()));
    } else {
        fmt.error(&format!("{} has {} problem(s):", config_path.display(), errors.len()));
        for e in &errors {
            fmt.info(&format!("{}: {}", e.field, e.message));
        }
    }
    Ok(())
}
