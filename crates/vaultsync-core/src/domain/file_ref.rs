//! Local and remote file references
//!
//! [`LocalFileRef`] is a read-time snapshot of a vault file; [`RemoteFileRef`]
//! is one entry from a drive listing. The two are linked only by name: a
//! remote entry belongs to a local file when its `name` equals the file's
//! [`VaultPath`].

use super::newtypes::{RemoteId, VaultPath};

/// Snapshot of a vault file taken when it was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileRef {
    /// Vault-relative path, unique within the vault
    pub path: VaultPath,
    /// File content at read time
    pub content: Vec<u8>,
    /// Whether the file existed when the snapshot was taken
    pub exists: bool,
}

impl LocalFileRef {
    /// Snapshot of an existing file
    pub fn new(path: VaultPath, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            content: content.into(),
            exists: true,
        }
    }

    /// Reference to a path that no longer exists locally
    pub fn missing(path: VaultPath) -> Self {
        Self {
            path,
            content: Vec::new(),
            exists: false,
        }
    }
}

/// A file entry on the drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileRef {
    /// Stable drive identifier
    pub id: RemoteId,
    /// Current name; equals the linked local path
    pub name: String,
    /// Parent container id, when the drive reported one
    pub parent: Option<String>,
}

impl RemoteFileRef {
    /// The local path this entry maps to, if its name is a valid vault path
    pub fn vault_path(&self) -> Option<VaultPath> {
        VaultPath::new(self.name.clone()).ok()
    }
}
