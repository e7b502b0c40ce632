//! VaultSync Drive - Drive API client and remote adapter
//!
//! Provides async components for:
//! - OAuth2 token lifecycle (code exchange, serialized refresh)
//! - Authenticated Drive requests with refresh-and-retry-once on 401
//! - Resolution of the hidden app namespace or a visible container folder
//! - File operations (list, multipart create, media update, rename,
//!   delete, download)
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 configuration, token store and keyring persistence
//! - [`client`] - Authenticated HTTP client for the API and upload endpoints
//! - [`files`] - Drive file operations
//! - [`namespace`] - Container resolution and caching
//! - [`provider`] - [`IRemoteDrive`](vaultsync_core::ports::IRemoteDrive) adapter

pub mod auth;
pub mod client;
pub mod files;
pub mod namespace;
pub mod provider;

use thiserror::Error;

/// Errors that can occur when talking to the drive
#[derive(Debug, Error)]
pub enum DriveError {
    /// Credentials are missing or were rejected, including a second 401
    /// after a refresh
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any non-2xx response other than 401
    #[error("Remote error (HTTP {status}): {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Error message reported by the API, or the raw body
        message: String,
    },

    /// The container for the configured storage mode could not be resolved
    #[error("Namespace resolution failed: {0}")]
    Namespace(String),

    /// A network-level error occurred (connection, TLS, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// True for authentication failures the user has to act on
    pub fn is_auth(&self) -> bool {
        matches!(self, DriveError::Unauthorized(_))
    }

    /// HTTP status of a remote error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            DriveError::Remote { status, .. } => Some(*status),
            DriveError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
