//! DriveRemoteStore - IRemoteDrive implementation for the Drive API
//!
//! Wraps a shared [`DriveClient`] and a [`NamespaceResolver`] and delegates
//! to the [`files`](crate::files) module to fulfil the [`IRemoteDrive`] port
//! contract.
//!
//! ## Design Notes
//!
//! - Every file operation takes the [`NamespaceHandle`] the caller resolved,
//!   so one pass never addresses two different containers.
//! - Errors keep their [`DriveError`] source under an `anyhow` context; the
//!   sync engine downcasts to tell namespace failures apart.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use vaultsync_core::{
    config::Config,
    domain::{NamespaceHandle, RemoteFileRef, RemoteId, StorageMode},
    ports::IRemoteDrive,
};

use crate::{
    auth::{KeyringTokenStorage, OAuth2Config, TokenStore},
    client::DriveClient,
    files::{self, DriveFile},
    namespace::NamespaceResolver,
};

/// Remote drive adapter backed by the Drive API
pub struct DriveRemoteStore {
    client: Arc<DriveClient>,
    namespace: NamespaceResolver,
}

impl DriveRemoteStore {
    /// Creates a new adapter around an existing client
    pub fn new(client: Arc<DriveClient>) -> Self {
        Self {
            namespace: NamespaceResolver::new(client.clone()),
            client,
        }
    }

    /// Builds the token store, client and adapter from configuration
    ///
    /// The refresh token comes from the config file, else the keyring.
    pub fn from_config(config: &Config) -> Result<Self> {
        let refresh_token = KeyringTokenStorage::resolve(&config.auth);
        let tokens = TokenStore::new(&OAuth2Config::from_config(config), refresh_token)
            .context("Failed to set up token store")?;
        let client = DriveClient::from_config(Arc::new(tokens), config)
            .context("Failed to set up Drive client")?;
        Ok(Self::new(Arc::new(client)))
    }

    /// The underlying client
    pub fn client(&self) -> &Arc<DriveClient> {
        &self.client
    }

    /// The namespace resolver and its cache
    pub fn namespace(&self) -> &NamespaceResolver {
        &self.namespace
    }

    async fn query(&self, namespace: &NamespaceHandle, query: &str) -> Result<Vec<RemoteFileRef>> {
        let found = files::list(&self.client, query, namespace.search_space()).await?;
        found
            .iter()
            .filter(|f| !f.is_folder())
            .map(|f| f.to_remote_ref().map_err(anyhow::Error::from))
            .collect()
    }
}

#[async_trait::async_trait]
impl IRemoteDrive for DriveRemoteStore {
    async fn resolve_namespace(&self, mode: &StorageMode) -> Result<NamespaceHandle> {
        Ok(self.namespace.resolve(mode).await?)
    }

    async fn find_by_name(
        &self,
        namespace: &NamespaceHandle,
        name: &str,
    ) -> Result<Vec<RemoteFileRef>> {
        debug!(name, "Looking up remote file");
        self.query(namespace, &namespace.filter_for(name))
            .await
            .with_context(|| format!("Failed to look up '{name}'"))
    }

    async fn list_files(&self, namespace: &NamespaceHandle) -> Result<Vec<RemoteFileRef>> {
        self.query(namespace, &namespace.files_filter())
            .await
            .context("Failed to list remote files")
    }

    async fn create_file(
        &self,
        namespace: &NamespaceHandle,
        name: &str,
        content: &[u8],
    ) -> Result<RemoteFileRef> {
        let created: DriveFile =
            files::create_file(&self.client, name, &namespace.parent_reference(), content)
                .await
                .with_context(|| format!("Failed to create '{name}'"))?;
        Ok(created.to_remote_ref()?)
    }

    async fn update_content(&self, id: &RemoteId, content: &[u8]) -> Result<()> {
        files::update_content(&self.client, id, content)
            .await
            .with_context(|| format!("Failed to update content of {id}"))
    }

    async fn rename(&self, id: &RemoteId, new_name: &str) -> Result<()> {
        files::rename(&self.client, id, new_name)
            .await
            .with_context(|| format!("Failed to rename {id} to '{new_name}'"))
    }

    async fn delete(&self, id: &RemoteId) -> Result<()> {
        files::delete(&self.client, id)
            .await
            .with_context(|| format!("Failed to delete {id}"))
    }

    async fn download(&self, id: &RemoteId) -> Result<Vec<u8>> {
        files::download(&self.client, id)
            .await
            .with_context(|| format!("Failed to download {id}"))
    }
}
