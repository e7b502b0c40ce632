//! Domain entities and business logic
//!
//! This module contains the core domain types for VaultSync:
//! - Newtypes for validated vault paths and remote identifiers
//! - Storage mode and namespace addressing
//! - Local and remote file references
//! - Domain-specific error types

pub mod errors;
pub mod file_ref;
pub mod newtypes;
pub mod storage;

// Re-export commonly used types
pub use errors::DomainError;
pub use file_ref::{LocalFileRef, RemoteFileRef};
pub use newtypes::{RemoteId, VaultPath};
pub use storage::{NamespaceHandle, StorageMode, FOLDER_MIME_TYPE, HIDDEN_SPACE};
