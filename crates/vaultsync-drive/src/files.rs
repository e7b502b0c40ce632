//! Drive file operations
//!
//! Thin, typed wrappers over the Drive v3 `files` resource. All functions go
//! through [`DriveClient`], so they share its authentication and 401 policy.
//!
//! ## Operations
//!
//! - [`list`] - query files, following `nextPageToken`
//! - [`create_folder`] - metadata-only folder create
//! - [`create_file`] - multipart create with metadata and content
//! - [`update_content`] - whole-file media update
//! - [`rename`] - metadata patch of `name`
//! - [`delete`] - permanent delete
//! - [`download`] - raw content via `alt=media`

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};
use vaultsync_core::domain::{RemoteFileRef, RemoteId, FOLDER_MIME_TYPE};

use crate::{
    client::{DriveClient, RequestBody},
    DriveError,
};

/// Fields requested for listings
const LIST_FIELDS: &str = "nextPageToken, files(id, name, parents, mimeType)";

/// Fields requested for created items
const ITEM_FIELDS: &str = "id, name, parents, mimeType";

/// Maximum page size the API accepts for `files.list`
const PAGE_SIZE: &str = "1000";

/// Content type for media uploads and the content part of multipart creates
const CONTENT_TYPE_TEXT: &str = "text/plain";

// ============================================================================
// Response types
// ============================================================================

/// A file or folder as returned by the Drive API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
    pub mime_type: Option<String>,
}

impl DriveFile {
    /// Returns true if the item is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Converts to the domain reference, validating the id
    pub fn to_remote_ref(&self) -> Result<RemoteFileRef, DriveError> {
        let id = RemoteId::new(self.id.clone())
            .map_err(|e| DriveError::InvalidResponse(format!("bad file id '{}': {e}", self.id)))?;
        Ok(RemoteFileRef {
            id,
            name: self.name.clone(),
            parent: self.parents.first().cloned(),
        })
    }
}

/// One page of a `files.list` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

// ============================================================================
// Operations
// ============================================================================

/// Lists files matching `query`, following every page
///
/// `space` scopes the search (e.g. `appDataFolder`); items in the hidden
/// namespace are only returned when it is set.
pub async fn list(
    client: &DriveClient,
    query: &str,
    space: Option<&str>,
) -> Result<Vec<DriveFile>, DriveError> {
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("fields", LIST_FIELDS),
            ("pageSize", PAGE_SIZE),
        ];
        if let Some(space) = space {
            params.push(("spaces", space));
        }
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }

        let page: FileList = client
            .request(Method::GET, "/files", &params, RequestBody::Empty)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(format!("file list: {e}")))?;

        debug!(count = page.files.len(), "Received file list page");
        files.extend(page.files);

        match page.next_page_token {
            Some(token) if !token.is_empty() => page_token = Some(token),
            _ => break,
        }
    }

    Ok(files)
}

/// Creates a folder in the drive root
pub async fn create_folder(client: &DriveClient, name: &str) -> Result<DriveFile, DriveError> {
    let metadata = serde_json::json!({
        "name": name,
        "mimeType": FOLDER_MIME_TYPE,
    });

    let folder: DriveFile = client
        .request(
            Method::POST,
            "/files",
            &[("fields", ITEM_FIELDS)],
            RequestBody::Json(metadata),
        )
        .await?
        .json()
        .await
        .map_err(|e| DriveError::InvalidResponse(format!("create folder: {e}")))?;

    info!(folder = name, id = %folder.id, "Created folder");
    Ok(folder)
}

/// Creates a file with content in one multipart request
pub async fn create_file(
    client: &DriveClient,
    name: &str,
    parents: &[String],
    content: &[u8],
) -> Result<DriveFile, DriveError> {
    let metadata = serde_json::json!({
        "name": name,
        "parents": parents,
    });
    let boundary = multipart_boundary(content);
    let body = multipart_related(&boundary, &metadata, content);

    let file: DriveFile = client
        .upload_request(
            Method::POST,
            "/files",
            &[("uploadType", "multipart"), ("fields", ITEM_FIELDS)],
            RequestBody::Raw {
                content_type: format!("multipart/related; boundary={boundary}"),
                data: body,
            },
        )
        .await?
        .json()
        .await
        .map_err(|e| DriveError::InvalidResponse(format!("create file: {e}")))?;

    debug!(file = name, id = %file.id, bytes = content.len(), "Created file");
    Ok(file)
}

/// Replaces a file's content
pub async fn update_content(
    client: &DriveClient,
    id: &RemoteId,
    content: &[u8],
) -> Result<(), DriveError> {
    let path = format!("/files/{}", id.as_str());
    client
        .upload_request(
            Method::PATCH,
            &path,
            &[("uploadType", "media")],
            RequestBody::Raw {
                content_type: CONTENT_TYPE_TEXT.to_string(),
                data: content.to_vec(),
            },
        )
        .await?;

    debug!(id = %id, bytes = content.len(), "Updated file content");
    Ok(())
}

/// Changes a file's name, keeping its id
pub async fn rename(client: &DriveClient, id: &RemoteId, new_name: &str) -> Result<(), DriveError> {
    let path = format!("/files/{}", id.as_str());
    client
        .request(
            Method::PATCH,
            &path,
            &[],
            RequestBody::Json(serde_json::json!({ "name": new_name })),
        )
        .await?;

    debug!(id = %id, new_name, "Renamed file");
    Ok(())
}

/// Deletes a file
pub async fn delete(client: &DriveClient, id: &RemoteId) -> Result<(), DriveError> {
    let path = format!("/files/{}", id.as_str());
    client
        .request(Method::DELETE, &path, &[], RequestBody::Empty)
        .await?;

    debug!(id = %id, "Deleted file");
    Ok(())
}

/// Downloads a file's content
pub async fn download(client: &DriveClient, id: &RemoteId) -> Result<Vec<u8>, DriveError> {
    let path = format!("/files/{}", id.as_str());
    let bytes = client
        .request(Method::GET, &path, &[("alt", "media")], RequestBody::Empty)
        .await?
        .bytes()
        .await?;

    debug!(id = %id, bytes = bytes.len(), "Downloaded file");
    Ok(bytes.to_vec())
}

// ============================================================================
// Multipart encoding
// ============================================================================

/// Picks a boundary that does not occur in the content
fn multipart_boundary(content: &[u8]) -> String {
    let mut seed = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    loop {
        let boundary = format!("vaultsync_{seed:x}");
        if !contains(content, boundary.as_bytes()) {
            return boundary;
        }
        seed = seed.wrapping_add(1);
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Encodes a `multipart/related` body: JSON metadata, then the content
fn multipart_related(boundary: &str, metadata: &serde_json::Value, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(content.len() + 256);

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(format!("Content-Type: {CONTENT_TYPE_TEXT}\r\n\r\n").as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

    body
}
