//! Auth commands - authorize, store and remove Drive credentials
//!
//! The flow is copy-paste: `auth url` prints the consent URL, the user
//! approves access in the browser and pastes the code shown into
//! `auth login --code`. The refresh token ends up in the system keyring.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::{info, warn};
use vaultsync_core::config::Config;
use vaultsync_drive::auth::{KeyringTokenStorage, OAuth2Config, TokenStore};

use super::{load_config, LOGIN_HINT};
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Print the URL that grants VaultSync access to Drive
    Url {
        /// Also open the URL in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Exchange an authorization code and store the refresh token
    Login {
        /// Code shown by Google after approving access
        #[arg(long)]
        code: String,
    },
    /// Remove the stored refresh token
    Logout,
    /// Check whether the stored credentials still work
    Status,
}

impl AuthCommand {
    pub async fn execute(&self, format: OutputFormat, config_path: &Path) -> Result<()> {
        let fmt = get_formatter(format);
        let config = load_config(config_path)?;
        if config.auth.client_id.is_empty() {
            bail!("auth.client_id is not set in {}", config_path.display());
        }

        match self {
            AuthCommand::Url { open } => execute_url(&config, *open, &*fmt, format),
            AuthCommand::Login { code } => execute_login(&config, code, &*fmt).await,
            AuthCommand::Logout => execute_logout(&config, &*fmt),
            AuthCommand::Status => execute_status(&config, &*fmt, format).await,
        }
    }
}

fn token_store(config: &Config, refresh_token: Option<String>) -> Result<TokenStore> {
    TokenStore::new(&OAuth2Config::from_config(config), refresh_token)
        .context("Failed to set up OAuth2 client")
}

fn execute_url(
    config: &Config,
    open: bool,
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let url = token_store(config, None)?.authorization_url();

    if format.is_json() {
        fmt.print_json(&serde_json::json!({ "url": url }));
    } else {
        fmt.success("Open this URL and approve access:");
        println!("{url}");
        fmt.info("Then run: vaultsync auth login --code <CODE>");
    }

    if open {
        if let Err(e) = webbrowser::open(&url) {
            warn!(error = %e, "Failed to open browser");
            fmt.warn("Could not open a browser, copy the URL instead");
        }
    }
    Ok(())
}

async fn execute_login(config: &Config, code: &str, fmt: &dyn OutputFormatter) -> Result<()> {
    let store = token_store(config, None)?;
    let creds = store
        .exchange_code(code)
        .await
        .context("Authorization failed")?;

    let Some(refresh_token) = creds.refresh_token else {
        bail!("Google returned no refresh token; revoke VaultSync's access and authorize again");
    };

    KeyringTokenStorage::store(&config.auth.client_id, &refresh_token)?;
    info!(client_id = %config.auth.client_id, "Stored refresh token");

    fmt.success("Authorized");
    fmt.info("Refresh token stored in the system keyring");
    if config.auth.refresh_token.is_some() {
        fmt.warn("auth.refresh_token in the config file takes precedence over the keyring");
    }
    Ok(())
}

fn execute_logout(config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
    KeyringTokenStorage::clear(&config.auth.client_id)?;
    fmt.success("Logged out");
    fmt.info("Refresh token removed from the system keyring");
    Ok(())
}

async fn execute_status(
    config: &Config,
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let source = if config.auth.refresh_token.as_deref().is_some_and(|t| !t.is_empty()) {
        "config"
    } else {
        "keyring"
    };

    let Some(refresh_token) = KeyringTokenStorage::resolve(&config.auth) else {
        if format.is_json() {
            fmt.print_json(&serde_json::json!({ "authorized": false }));
        } else {
            fmt.info("Not authorized");
            fmt.info(LOGIN_HINT);
        }
        return Ok(());
    };

    let store = token_store(config, Some(refresh_token))?;
    let result = store.refresh().await;

    if format.is_json() {
        fmt.print_json(&serde_json::json!({
            "authorized": result.is_ok(),
            "token_source": source,
            "error": result.as_ref().err().map(ToString::to_string),
        }));
        return Ok(());
    }

    match result {
        Ok(_) => {
            fmt.success("Authorized");
            fmt.info(&format!("Refresh token from: {source}"));
        }
        Err(e) => {
            fmt.error(&format!("Stored credentials were rejected: {e}"));
            fmt.info(LOGIN_HINT);
        }
    }
    Ok(())
}
