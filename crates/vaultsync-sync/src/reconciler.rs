//! Reconciliation of the vault against the drive
//!
//! The [`Reconciler`] decides, per file, whether to create, update, rename,
//! delete or download. It keeps no state between passes: every decision
//! comes from a fresh name lookup under the resolved container
//! (`name = <path> and <container> in parents`).
//!
//! ## Pass flow
//!
//! ```text
//! resolve namespace ─→ download phase (remote-only files)
//!                   └→ upload phase (every local file, sync_file)
//! ```
//!
//! A namespace failure aborts the pass, and so does a remote listing the
//! drive refuses for bad credentials. Any other failure is logged, recorded
//! in the [`SyncReport`] and the pass moves on to the next file.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use vaultsync_core::{
    domain::{LocalFileRef, NamespaceHandle, RemoteFileRef, RemoteId, StorageMode, VaultPath},
    ports::{ILocalFileSystem, IRemoteDrive},
};

use crate::{is_auth_error, SyncError};

// ============================================================================
// SyncReport / FileAction
// ============================================================================

/// Summary of a completed sync pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Remote-only files written into the vault
    pub downloaded: Vec<VaultPath>,
    /// Local files that got a new remote entry
    pub created: Vec<VaultPath>,
    /// Local files whose remote content was replaced
    pub updated: Vec<VaultPath>,
    /// Per-file failures (non-fatal)
    pub failures: Vec<String>,
    /// Wall-clock duration of the pass
    pub duration: Duration,
}

impl SyncReport {
    /// True if every file was handled without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// What a single-file operation did on the drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// A new remote entry was created
    Created(RemoteId),
    /// An existing entry's content was replaced
    Updated(RemoteId),
    /// An existing entry was renamed and its content pushed
    Renamed(RemoteId),
    /// The remote entry was deleted
    Deleted(RemoteId),
    /// A local folder went away; this many remote entries under it were deleted
    FolderDeleted(usize),
    /// Nothing to do; the remote side has no entry for the path
    Unchanged,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileAction::Created(id) => write!(f, "created {id}"),
            FileAction::Updated(id) => write!(f, "updated {id}"),
            FileAction::Renamed(id) => write!(f, "renamed {id}"),
            FileAction::Deleted(id) => write!(f, "deleted {id}"),
            FileAction::FolderDeleted(count) => write!(f, "deleted {count} file(s) under folder"),
            FileAction::Unchanged => write!(f, "no remote entry"),
        }
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Name-based sync between a local vault and a drive container
pub struct Reconciler {
    local: Arc<dyn ILocalFileSystem>,
    remote: Arc<dyn IRemoteDrive>,
    mode: StorageMode,
    /// SHA-256 of each file the download phase wrote, until its watcher
    /// event is seen
    downloads: Mutex<HashMap<VaultPath, Vec<u8>>>,
}

fn digest(content: &[u8]) -> Vec<u8> {
    Sha256::digest(content).to_vec()
}

impl Reconciler {
    pub fn new(
        local: Arc<dyn ILocalFileSystem>,
        remote: Arc<dyn IRemoteDrive>,
        mode: StorageMode,
    ) -> Self {
        Self {
            local,
            remote,
            mode,
            downloads: Mutex::new(HashMap::new()),
        }
    }

    /// The storage mode every pass addresses
    pub fn mode(&self) -> &StorageMode {
        &self.mode
    }

    /// Resolves the container for this reconciler's storage mode
    ///
    /// # Errors
    /// Returns `SyncError::Namespace` if the container can't be resolved
    pub async fn namespace(&self) -> Result<NamespaceHandle, SyncError> {
        self.remote
            .resolve_namespace(&self.mode)
            .await
            .map_err(SyncError::Namespace)
    }

    /// Lists the vault and runs a full pass over it
    pub async fn sync_vault(&self) -> Result<SyncReport, SyncError> {
        let files = self.local.list_files().await.map_err(SyncError::Local)?;
        self.full_sync(&files).await
    }

    /// Runs a full pass over `local_files`
    ///
    /// 1. Resolves the namespace once, before any file operation.
    /// 2. Downloads every remote file with no local counterpart.
    /// 3. Pushes every local file in the given order through
    ///    [`sync_file`](Self::sync_file).
    ///
    /// # Errors
    /// Namespace resolution failures fail the pass, as does a credential
    /// rejection of the remote listing; per-file failures are collected in
    /// [`SyncReport::failures`].
    #[instrument(skip_all, fields(mode = %self.mode, files = local_files.len()))]
    pub async fn full_sync(&self, local_files: &[VaultPath]) -> Result<SyncReport, SyncError> {
        let start = Instant::now();
        let mut report = SyncReport::default();

        let namespace = self.namespace().await?;
        info!("Starting sync pass");

        self.download_phase(&namespace, local_files, &mut report)
            .await?;

        for path in local_files {
            match self.sync_local(&namespace, path).await {
                Ok(FileAction::Created(_)) => report.created.push(path.clone()),
                Ok(FileAction::Updated(_)) => report.updated.push(path.clone()),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path, error = %format!("{e:#}"), "Failed to sync file");
                    report.failures.push(format!("{path}: {e:#}"));
                }
            }
        }

        report.duration = start.elapsed();
        info!(
            downloaded = report.downloaded.len(),
            created = report.created.len(),
            updated = report.updated.len(),
            failures = report.failures.len(),
            duration_ms = report.duration.as_millis() as u64,
            "Sync pass complete"
        );
        Ok(report)
    }

    async fn download_phase(
        &self,
        namespace: &NamespaceHandle,
        local_files: &[VaultPath],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let remote_files = match self.remote.list_files(namespace).await {
            Ok(files) => files,
            Err(e) if is_auth_error(&e) => return Err(SyncError::Unauthorized(e)),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Failed to list remote files, skipping downloads");
                report.failures.push(format!("remote listing: {e:#}"));
                return Ok(());
            }
        };

        let local: HashSet<&VaultPath> = local_files.iter().collect();
        let mut seen = HashSet::new();

        for remote in remote_files {
            let Some(path) = remote.vault_path() else {
                warn!(file = %remote.name, id = %remote.id, "Remote name is not a vault path, skipping");
                continue;
            };
            if local.contains(&path) || !seen.insert(path.clone()) {
                continue;
            }

            match self.download(&remote, &path).await {
                Ok(true) => report.downloaded.push(path),
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %path, error = %format!("{e:#}"), "Failed to download file");
                    report.failures.push(format!("{path}: {e:#}"));
                }
            }
        }
        Ok(())
    }

    /// Downloads one remote-only file; `false` if a local file appeared
    /// since the listing
    async fn download(&self, remote: &RemoteFileRef, path: &VaultPath) -> Result<bool> {
        if self.local.exists(path).await? {
            debug!(path = %path, "File appeared locally, not downloading");
            return Ok(false);
        }
        let content = self.remote.download(&remote.id).await?;
        self.local
            .create(path, &content)
            .await
            .with_context(|| format!("Failed to write {path}"))?;
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone(), digest(&content));
        info!(path = %path, id = %remote.id, bytes = content.len(), "Downloaded");
        Ok(true)
    }

    /// True if `file` is exactly what the download phase last wrote to its
    /// path
    ///
    /// Each download is matched at most once; a mismatch also forgets it.
    pub fn consume_download_echo(&self, file: &LocalFileRef) -> bool {
        self.downloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&file.path)
            .is_some_and(|written| written == digest(&file.content))
    }

    /// Reads `path` from the vault and pushes it
    async fn sync_local(&self, namespace: &NamespaceHandle, path: &VaultPath) -> Result<FileAction> {
        let file = self.read_local(path).await?;
        self.sync_file(namespace, &file).await
    }

    /// Snapshot of a vault file
    pub async fn read_local(&self, path: &VaultPath) -> Result<LocalFileRef> {
        let content = self
            .local
            .read(path)
            .await
            .with_context(|| format!("Failed to read {path}"))?;
        Ok(LocalFileRef::new(path.clone(), content))
    }

    /// Pushes one file: update the entry with the same name, or create one
    ///
    /// With duplicate names under the container, the first match is updated.
    pub async fn sync_file(&self, namespace: &NamespaceHandle, file: &LocalFileRef) -> Result<FileAction> {
        match self.lookup(namespace, &file.path).await? {
            Some(existing) => {
                self.remote.update_content(&existing.id, &file.content).await?;
                debug!(path = %file.path, id = %existing.id, "Updated remote file");
                Ok(FileAction::Updated(existing.id))
            }
            None => {
                let created = self
                    .remote
                    .create_file(namespace, file.path.as_str(), &file.content)
                    .await?;
                info!(path = %file.path, id = %created.id, "Created remote file");
                Ok(FileAction::Created(created.id))
            }
        }
    }

    /// Mirrors a local rename, keeping the remote id
    ///
    /// The entry found under `old_path` is renamed and the current content
    /// pushed. If there is none, the file is pushed as new.
    pub async fn handle_rename(
        &self,
        namespace: &NamespaceHandle,
        file: &LocalFileRef,
        old_path: &VaultPath,
    ) -> Result<FileAction> {
        let Some(existing) = self.lookup(namespace, old_path).await? else {
            debug!(old = %old_path, new = %file.path, "No remote entry under old name");
            return self.sync_file(namespace, file).await;
        };

        self.remote
            .rename(&existing.id, file.path.as_str())
            .await?;
        self.remote
            .update_content(&existing.id, &file.content)
            .await?;

        info!(old = %old_path, new = %file.path, id = %existing.id, "Renamed remote file");
        Ok(FileAction::Renamed(existing.id))
    }

    /// Mirrors a local delete
    ///
    /// A path with no remote entry of its own is treated as a folder: every
    /// remote entry named `<path>/...` is deleted. If there are none, this
    /// is a no-op.
    pub async fn handle_delete(&self, namespace: &NamespaceHandle, path: &VaultPath) -> Result<FileAction> {
        if let Some(existing) = self.lookup(namespace, path).await? {
            self.remote.delete(&existing.id).await?;
            info!(path = %path, id = %existing.id, "Deleted remote file");
            return Ok(FileAction::Deleted(existing.id));
        }

        let prefix = format!("{path}/");
        let nested: Vec<RemoteFileRef> = self
            .remote
            .list_files(namespace)
            .await?
            .into_iter()
            .filter(|remote| remote.name.starts_with(&prefix))
            .collect();
        if nested.is_empty() {
            debug!(path = %path, "Nothing to delete remotely");
            return Ok(FileAction::Unchanged);
        }

        for remote in &nested {
            self.remote.delete(&remote.id).await?;
            debug!(file = %remote.name, id = %remote.id, "Deleted remote file under folder");
        }
        info!(path = %path, count = nested.len(), "Deleted remote folder contents");
        Ok(FileAction::FolderDeleted(nested.len()))
    }

    async fn lookup(&self, namespace: &NamespaceHandle, path: &VaultPath) -> Result<Option<RemoteFileRef>> {
        let matches = self.remote.find_by_name(namespace, path.as_str()).await?;
        if matches.len() > 1 {
            warn!(
                path = %path,
                count = matches.len(),
                "Duplicate remote entries share this name, using the first"
            );
        }
        Ok(matches.into_iter().next())
    }
}
