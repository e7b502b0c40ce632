//! Configuration module for VaultSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, saving, validation, defaults, and a builder pattern for
//! programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::storage::StorageMode;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for VaultSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// OAuth client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID. Empty until the user configures it.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Long-lived refresh token. When unset, the system keyring is consulted.
    pub refresh_token: Option<String>,
    /// Scopes requested during authorization.
    pub scopes: Vec<String>,
}

/// Which part of the drive holds the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLocation {
    /// Application-private space, invisible in the drive UI.
    Hidden,
    /// A named, user-visible folder.
    Visible,
}

/// Storage location settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub location: StorageLocation,
    /// Folder name used when `location` is `visible`.
    pub folder_name: String,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Root directory of the local vault.
    pub vault_root: PathBuf,
    /// Run a full pass on a timer.
    pub auto_sync: bool,
    /// Minutes between timer-driven passes (1-60).
    pub interval_minutes: u64,
    /// Push a file as soon as it is saved.
    pub sync_on_save: bool,
    /// Allow manually triggered passes.
    pub manual_sync: bool,
    /// Seconds a file must be quiet after a change before it is pushed.
    pub debounce_delay: u64,
}

/// Remote endpoint settings. Overridable for testing and proxies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL for metadata requests.
    pub api_base: String,
    /// Base URL for content uploads.
    pub upload_base: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// OAuth authorization endpoint.
    pub auth_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading and saving
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vaultsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultsync")
            .join("config.yaml")
    }

    /// Storage mode derived from the `storage` section.
    pub fn storage_mode(&self) -> StorageMode {
        match self.storage.location {
            StorageLocation::Hidden => StorageMode::Hidden,
            StorageLocation::Visible => StorageMode::Visible {
                folder_name: self.storage.folder_name.clone(),
            },
        }
    }

    /// Timer interval for automatic passes, clamped to 1-60 minutes.
    pub fn sync_interval(&self) -> Duration {
        let minutes = self
            .sync
            .interval_minutes
            .clamp(MIN_INTERVAL_MINUTES, MAX_INTERVAL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    /// Quiet period before a watched change is pushed.
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_secs(self.sync.debounce_delay)
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default OAuth scopes: files created by the app and the hidden app space.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/drive.appdata",
];

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            location: StorageLocation::Hidden,
            folder_name: "Obsidian".to_string(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            vault_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Vault"),
            auto_sync: false,
            interval_minutes: 5,
            sync_on_save: true,
            manual_sync: true,
            debounce_delay: 2,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.googleapis.com/drive/v3".to_string(),
            upload_base: "https://www.googleapis.com/upload/drive/v3".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.interval_minutes"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Bounds for `sync.interval_minutes`.
const MIN_INTERVAL_MINUTES: u64 = 1;
const MAX_INTERVAL_MINUTES: u64 = 60;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Credentials are not
    /// checked here; commands that need them report their absence.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- storage ---
        if self.storage.location == StorageLocation::Visible
            && self.storage.folder_name.trim().is_empty()
        {
            errors.push(ValidationError {
                field: "storage.folder_name".into(),
                message: "must not be empty when location is visible".into(),
            });
        }

        // --- sync ---
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.sync.interval_minutes) {
            errors.push(ValidationError {
                field: "sync.interval_minutes".into(),
                message: format!(
                    "must be in range {MIN_INTERVAL_MINUTES}..={MAX_INTERVAL_MINUTES}"
                ),
            });
        }

        if self.sync.debounce_delay == 0 {
            errors.push(ValidationError {
                field: "sync.debounce_delay".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        if self.remote.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        for (field, value) in [
            ("remote.api_base", &self.remote.api_base),
            ("remote.upload_base", &self.remote.upload_base),
            ("remote.token_url", &self.remote.token_url),
            ("remote.auth_url", &self.remote.auth_url),
        ] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.into(),
                    message: format!("not an http(s) URL: '{value}'"),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use vaultsync_core::config::{ConfigBuilder, StorageLocation};
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .vault_root(PathBuf::from("/home/user/Notes"))
///     .storage(StorageLocation::Visible, "Notes")
///     .interval_minutes(10)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- auth ---

    pub fn client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.auth.client_id = id.into();
        self.config.auth.client_secret = secret.into();
        self
    }

    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth.refresh_token = Some(token.into());
        self
    }

    // --- storage ---

    pub fn storage(mut self, location: StorageLocation, folder_name: impl Into<String>) -> Self {
        self.config.storage.location = location;
        self.config.storage.folder_name = folder_name.into();
        self
    }

    // --- sync ---

    pub fn vault_root(mut self, root: PathBuf) -> Self {
        self.config.sync.vault_root = root;
        self
    }

    pub fn auto_sync(mut self, enabled: bool) -> Self {
        self.config.sync.auto_sync = enabled;
        self
    }

    pub fn interval_minutes(mut self, minutes: u64) -> Self {
        self.config.sync.interval_minutes = minutes;
        self
    }

    pub fn sync_on_save(mut self, enabled: bool) -> Self {
        self.config.sync.sync_on_save = enabled;
        self
    }

    pub fn manual_sync(mut self, enabled: bool) -> Self {
        self.config.sync.manual_sync = enabled;
        self
    }

    pub fn sync_debounce_delay(mut self, seconds: u64) -> Self {
        self.config.sync.debounce_delay = seconds;
        self
    }

    // --- remote ---

    /// Point every endpoint at one server, as test doubles do.
    pub fn remote_base(mut self, base: &str) -> Self {
        self.config.remote.api_base = base.to_string();
        self.config.remote.upload_base = format!("{base}/upload");
        self.config.remote.token_url = format!("{base}/token");
        self.config.remote.auth_url = format!("{base}/auth");
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.remote.timeout_secs = secs;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
