//! Local filesystem port (driven/secondary port)
//!
//! This module defines the capabilities the sync engine needs from the
//! vault: enumerate files, read a file, and create (or overwrite) a file.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - All paths are [`VaultPath`]s; the adapter owns the mapping to the
//!   vault root on disk.
//! - Reads are snapshots: the engine never holds a file open between calls.

use crate::domain::newtypes::VaultPath;

/// Port trait for vault file operations
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Lists every synchronizable file in the vault, in enumeration order
    async fn list_files(&self) -> anyhow::Result<Vec<VaultPath>>;

    /// Reads the entire contents of a file
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be read
    async fn read(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>>;

    /// Creates a file with the given content, replacing any existing one
    ///
    /// Parent directories are created as needed.
    async fn create(&self, path: &VaultPath, content: &[u8]) -> anyhow::Result<()>;

    /// Returns true if a regular file exists at `path`
    async fn exists(&self, path: &VaultPath) -> anyhow::Result<bool>;
}
