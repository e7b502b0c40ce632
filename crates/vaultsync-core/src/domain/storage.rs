//! Storage location and remote addressing
//!
//! [`StorageMode`] says where in the drive the vault lives; a resolved
//! [`NamespaceHandle`] turns that into the concrete query filters, parent
//! references and search spaces every remote call needs.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Name of the application-private space on the drive
pub const HIDDEN_SPACE: &str = "appDataFolder";

/// MIME type the drive uses to mark folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Where the synchronized files live on the drive
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "location", rename_all = "snake_case")]
pub enum StorageMode {
    /// The application-private namespace, invisible in the drive UI
    Hidden,
    /// A regular folder with the given name
    Visible {
        /// Name of the container folder
        folder_name: String,
    },
}

impl StorageMode {
    /// Creates a visible storage mode, rejecting empty folder names
    ///
    /// # Errors
    /// Returns `DomainError::InvalidStorage` if `folder_name` is blank
    pub fn visible(folder_name: impl Into<String>) -> Result<Self, DomainError> {
        let folder_name = folder_name.into();
        if folder_name.trim().is_empty() {
            return Err(DomainError::InvalidStorage(
                "visible folder name cannot be empty".to_string(),
            ));
        }
        Ok(Self::Visible { folder_name })
    }
}

impl Display for StorageMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Hidden => write!(f, "hidden"),
            StorageMode::Visible { folder_name } => write!(f, "visible:{folder_name}"),
        }
    }
}

// ============================================================================
// NamespaceHandle
// ============================================================================

/// Resolved reference to the remote container
///
/// `container_id` is `None` in hidden mode, where the fixed
/// [`HIDDEN_SPACE`] alias addresses the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceHandle {
    container_id: Option<String>,
}

impl NamespaceHandle {
    /// Handle for the hidden application namespace
    pub fn hidden() -> Self {
        Self { container_id: None }
    }

    /// Handle for a resolved visible folder
    pub fn visible(container_id: impl Into<String>) -> Self {
        Self {
            container_id: Some(container_id.into()),
        }
    }

    /// The resolved folder id, `None` in hidden mode
    pub fn container_id(&self) -> Option<&str> {
        self.container_id.as_deref()
    }

    /// Identifier used in `parents` fields and `in parents` clauses
    pub fn parent_id(&self) -> &str {
        self.container_id.as_deref().unwrap_or(HIDDEN_SPACE)
    }

    /// Parent list for newly created files
    pub fn parent_reference(&self) -> Vec<String> {
        vec![self.parent_id().to_string()]
    }

    /// Query matching the file called `name` directly under the container
    pub fn filter_for(&self, name: &str) -> String {
        format!(
            "name = '{}' and '{}' in parents and trashed = false",
            escape_query_literal(name),
            escape_query_literal(self.parent_id())
        )
    }

    /// Query matching every non-folder file directly under the container
    pub fn files_filter(&self) -> String {
        format!(
            "mimeType != '{}' and '{}' in parents and trashed = false",
            FOLDER_MIME_TYPE,
            escape_query_literal(self.parent_id())
        )
    }

    /// `spaces` parameter needed to see the container's contents
    ///
    /// Only the hidden namespace needs explicit scoping; visible listings
    /// are already disambiguated by parent.
    pub fn search_space(&self) -> Option<&'static str> {
        if self.container_id.is_none() {
            Some(HIDDEN_SPACE)
        } else {
            None
        }
    }
}

/// Query matching a visible container folder by name
pub fn folder_filter(folder_name: &str) -> String {
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escape_query_literal(folder_name),
        FOLDER_MIME_TYPE
    )
}

/// Escapes a value for use inside a single-quoted query literal
pub fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
