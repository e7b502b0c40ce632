//! VaultSync Sync - Reconciliation engine and scheduling
//!
//! Provides:
//! - Name-based reconciliation of the vault against the drive
//! - Manual, on-save and timer-driven sync triggers behind one session gate
//! - A local filesystem adapter and a vault file watcher
//!
//! ## Modules
//!
//! - [`reconciler`] - Full passes and per-file create/update/rename/delete
//! - [`scheduler`] - Trigger handling, timer and event loop
//! - [`filesystem`] - Local filesystem adapter (atomic writes)
//! - [`watcher`] - `notify`-based vault watcher

pub mod filesystem;
pub mod reconciler;
pub mod scheduler;
pub mod watcher;

use thiserror::Error;
use vaultsync_drive::DriveError;

/// Errors that abort a whole sync pass
///
/// Per-file failures never surface here; they are collected in the
/// pass's [`SyncReport`](reconciler::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote container could not be resolved, so nothing can be addressed
    #[error("Namespace resolution failed: {0:#}")]
    Namespace(anyhow::Error),

    /// The drive rejected our credentials; every further request would too
    #[error("Drive rejected the credentials: {0:#}")]
    Unauthorized(anyhow::Error),

    /// The vault could not be enumerated
    #[error("Local vault error: {0:#}")]
    Local(anyhow::Error),

    /// An I/O error occurred during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A domain-level error propagated from vaultsync-core
    #[error("Domain error: {0}")]
    Domain(#[from] vaultsync_core::domain::DomainError),
}

impl SyncError {
    /// True when the pass failed because the drive rejected our credentials
    pub fn is_auth(&self) -> bool {
        match self {
            SyncError::Unauthorized(_) => true,
            SyncError::Namespace(e) | SyncError::Local(e) => is_auth_error(e),
            _ => false,
        }
    }
}

/// True if any cause in the chain is a [`DriveError`] credential rejection
pub(crate) fn is_auth_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<DriveError>().is_some_and(DriveError::is_auth))
}
