//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! validation of vault paths, remote identifiers and configuration values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid vault-relative path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Storage location is misconfigured (e.g. empty visible folder name)
    #[error("Invalid storage location: {0}")]
    InvalidStorage(String),
}
