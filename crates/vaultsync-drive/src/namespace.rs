//! Container resolution for the configured storage mode
//!
//! Hidden mode needs no lookup: the app space is addressed by a fixed alias.
//! Visible mode looks the folder up by name and creates it when missing.
//! The result is cached per `(mode, folder name)`; the cache lock is held
//! across the lookup and create, so concurrent callers cannot create two
//! folders with the same name.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vaultsync_core::domain::{storage::folder_filter, NamespaceHandle, StorageMode};

use crate::{client::DriveClient, files, DriveError};

/// Resolves and caches the remote container
pub struct NamespaceResolver {
    client: Arc<DriveClient>,
    cache: Mutex<Option<(StorageMode, NamespaceHandle)>>,
}

impl NamespaceResolver {
    pub fn new(client: Arc<DriveClient>) -> Self {
        Self {
            client,
            cache: Mutex::new(None),
        }
    }

    /// Returns the handle for `mode`, looking up or creating the container
    /// on first use
    ///
    /// # Errors
    /// Returns `DriveError::Namespace` if the folder can be neither found
    /// nor created, or `DriveError::Unauthorized` if credentials fail.
    #[tracing::instrument(skip(self), fields(mode = %mode))]
    pub async fn resolve(&self, mode: &StorageMode) -> Result<NamespaceHandle, DriveError> {
        let mut cache = self.cache.lock().await;

        if let Some((cached_mode, handle)) = cache.as_ref() {
            if cached_mode == mode {
                return Ok(handle.clone());
            }
            debug!(previous = %cached_mode, "Storage mode changed, re-resolving");
        }

        let handle = match mode {
            StorageMode::Hidden => NamespaceHandle::hidden(),
            StorageMode::Visible { folder_name } => {
                NamespaceHandle::visible(self.find_or_create_folder(folder_name).await?)
            }
        };

        *cache = Some((mode.clone(), handle.clone()));
        Ok(handle)
    }

    /// Drops the cached handle so the next call resolves again
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// The cached handle, if any
    pub async fn cached(&self) -> Option<NamespaceHandle> {
        self.cache.lock().await.as_ref().map(|(_, h)| h.clone())
    }

    async fn find_or_create_folder(&self, folder_name: &str) -> Result<String, DriveError> {
        let existing = files::list(&self.client, &folder_filter(folder_name), None)
            .await
            .map_err(|e| namespace_error(e, "looking up", folder_name))?;

        if let Some(folder) = existing.first() {
            if existing.len() > 1 {
                warn!(
                    folder = folder_name,
                    count = existing.len(),
                    "Several folders share this name, using the first"
                );
            }
            debug!(folder = folder_name, id = %folder.id, "Found existing folder");
            return Ok(folder.id.clone());
        }

        let created = files::create_folder(&self.client, folder_name)
            .await
            .map_err(|e| namespace_error(e, "creating", folder_name))?;

        info!(folder = folder_name, id = %created.id, "Created vault folder");
        Ok(created.id)
    }
}

/// Wraps a failure as a namespace error; auth failures pass through unchanged
fn namespace_error(err: DriveError, action: &str, folder_name: &str) -> DriveError {
    if err.is_auth() {
        err
    } else {
        DriveError::Namespace(format!("{action} folder '{folder_name}': {err}"))
    }
}
