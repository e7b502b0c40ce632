//! Remote drive port (driven/secondary port)
//!
//! This module defines the interface the reconciler uses to address and
//! mutate files on the drive. Every method that touches files takes the
//! [`NamespaceHandle`] resolved at the start of the operation, so the
//! addressing decision (hidden space or visible folder) is made once.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; the adapter's typed error stays reachable through
//!   `anyhow::Error::downcast_ref`.
//! - Authentication and token refresh are the adapter's concern.

use crate::domain::{
    file_ref::RemoteFileRef,
    newtypes::RemoteId,
    storage::{NamespaceHandle, StorageMode},
};

/// Port trait for drive operations
#[async_trait::async_trait]
pub trait IRemoteDrive: Send + Sync {
    /// Resolves (creating if necessary) the container for `mode`
    async fn resolve_namespace(&self, mode: &StorageMode) -> anyhow::Result<NamespaceHandle>;

    /// Finds files called `name` directly under the container
    ///
    /// Returned in the drive's listing order; more than one entry means the
    /// drive holds duplicates.
    async fn find_by_name(
        &self,
        namespace: &NamespaceHandle,
        name: &str,
    ) -> anyhow::Result<Vec<RemoteFileRef>>;

    /// Lists every non-folder file directly under the container
    async fn list_files(&self, namespace: &NamespaceHandle) -> anyhow::Result<Vec<RemoteFileRef>>;

    /// Creates a new file with the given name and content
    async fn create_file(
        &self,
        namespace: &NamespaceHandle,
        name: &str,
        content: &[u8],
    ) -> anyhow::Result<RemoteFileRef>;

    /// Replaces a file's content
    async fn update_content(&self, id: &RemoteId, content: &[u8]) -> anyhow::Result<()>;

    /// Changes a file's name, keeping its id
    async fn rename(&self, id: &RemoteId, new_name: &str) -> anyhow::Result<()>;

    /// Deletes a file
    async fn delete(&self, id: &RemoteId) -> anyhow::Result<()>;

    /// Downloads a file's content
    async fn download(&self, id: &RemoteId) -> anyhow::Result<Vec<u8>>;
}
