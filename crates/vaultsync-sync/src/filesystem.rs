//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] over a vault root directory using
//! `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: downloads are written to a temp file next to the
//!   target and renamed into place, so the editor never sees partial content.
//! - **Ignored entries**: dot-files, dot-directories (editor metadata) and
//!   leftover `.tmp` files are never listed.
//! - **Ordering**: listings are sorted, so a pass visits files in a stable
//!   order.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use vaultsync_core::{domain::VaultPath, ports::ILocalFileSystem};

/// Suffix of in-flight atomic writes
const TMP_SUFFIX: &str = ".tmp";

/// Adapter that bridges the [`ILocalFileSystem`] port to a vault on disk.
#[derive(Debug, Clone)]
pub struct LocalFileSystemAdapter {
    root: PathBuf,
}

impl LocalFileSystemAdapter {
    /// Create an adapter for the vault at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Returns true for entry names the sync engine never touches
pub(crate) fn is_ignored(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(TMP_SUFFIX)
}

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn list_files(&self) -> anyhow::Result<Vec<VaultPath>> {
        let mut files = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    warn!(path = %entry.path().display(), "skipping non-UTF-8 name");
                    continue;
                };
                if is_ignored(name) {
                    continue;
                }

                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let relative = path.strip_prefix(&self.root)?;
                    match VaultPath::from_relative(relative) {
                        Ok(vault_path) => files.push(vault_path),
                        Err(e) => warn!(path = %path.display(), error = %e, "skipping file"),
                    }
                }
            }
        }

        files.sort();
        debug!(count = files.len(), "listed vault files");
        Ok(files)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn read(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>> {
        let data = tokio::fs::read(path.to_path(&self.root)).await?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self, content), fields(path = %path, bytes = content.len()))]
    async fn create(&self, path: &VaultPath, content: &[u8]) -> anyhow::Result<()> {
        let target = path.to_path(&self.root);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Same directory as the target, so the rename stays on one filesystem
        let tmp_path = {
            let mut p = target.as_os_str().to_owned();
            p.push(TMP_SUFFIX);
            PathBuf::from(p)
        };

        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &target).await?;

        debug!("write complete");
        Ok(())
    }

    async fn exists(&self, path: &VaultPath) -> anyhow::Result<bool> {
        match tokio::fs::metadata(path.to_path(&self.root)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
