//! Namespace resolution and addressing through DriveRemoteStore

use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultsync_core::domain::{NamespaceHandle, StorageMode};
use vaultsync_core::ports::IRemoteDrive;
use vaultsync_drive::DriveError;

use crate::common::{file_json, list_json, remote_store};

const NOTES_QUERY: &str =
    "name = 'Notes' and mimeType = 'application/vnd.google-apps.folder' and trashed = false";

async fn mount_folder_lookup(server: &MockServer, query: &str, found: Vec<serde_json::Value>, times: u64) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(found)))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_folder_create(server: &MockServer, id: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "name": "Notes",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_visible_folder_created_once_per_session() {
    let server = MockServer::start().await;
    mount_folder_lookup(&server, NOTES_QUERY, vec![], 1).await;
    mount_folder_create(&server, "notes-folder", 1).await;

    let store = remote_store(&server);
    let mode = StorageMode::visible("Notes").unwrap();

    for _ in 0..3 {
        let handle = store.resolve_namespace(&mode).await.unwrap();
        assert_eq!(handle, NamespaceHandle::visible("notes-folder"));
    }
}

#[tokio::test]
async fn test_new_session_finds_existing_folder() {
    let server = MockServer::start().await;
    mount_folder_lookup(
        &server,
        NOTES_QUERY,
        vec![serde_json::json!({
            "id": "existing-notes",
            "name": "Notes",
            "mimeType": "application/vnd.google-apps.folder"
        })],
        1,
    )
    .await;
    mount_folder_create(&server, "duplicate", 0).await;

    let store = remote_store(&server);
    let handle = store
        .resolve_namespace(&StorageMode::visible("Notes").unwrap())
        .await
        .unwrap();
    assert_eq!(handle.container_id(), Some("existing-notes"));
}

#[tokio::test]
async fn test_folder_change_re_resolves() {
    let server = MockServer::start().await;
    let work_query =
        "name = 'Work' and mimeType = 'application/vnd.google-apps.folder' and trashed = false";
    mount_folder_lookup(&server, NOTES_QUERY, vec![file_json("notes-id", "Notes", "root")], 1).await;
    mount_folder_lookup(&server, work_query, vec![file_json("work-id", "Work", "root")], 1).await;

    let store = remote_store(&server);
    let notes = store
        .resolve_namespace(&StorageMode::visible("Notes").unwrap())
        .await
        .unwrap();
    let work = store
        .resolve_namespace(&StorageMode::visible("Work").unwrap())
        .await
        .unwrap();

    assert_eq!(notes.container_id(), Some("notes-id"));
    assert_eq!(work.container_id(), Some("work-id"));
}

#[tokio::test]
async fn test_folder_lookup_failure_is_namespace_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = remote_store(&server);
    let err = store
        .resolve_namespace(&StorageMode::visible("Notes").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriveError>(),
        Some(DriveError::Namespace(_))
    ));
}

#[tokio::test]
async fn test_hidden_listing_is_scoped_to_app_space() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("spaces", "appDataFolder"))
        .and(query_param(
            "q",
            "name = 'a.md' and 'appDataFolder' in parents and trashed = false",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![file_json(
            "f1",
            "a.md",
            "appDataFolder",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let store = remote_store(&server);
    let handle = store.resolve_namespace(&StorageMode::Hidden).await.unwrap();
    let found = store.find_by_name(&handle, "a.md").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "f1");
}

#[tokio::test]
async fn test_visible_listing_has_no_space_and_skips_folders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param_is_missing("spaces"))
        .and(query_param(
            "q",
            "mimeType != 'application/vnd.google-apps.folder' and 'notes-id' in parents and trashed = false",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![
            file_json("f1", "a.md", "notes-id"),
            serde_json::json!({
                "id": "sub",
                "name": "sub",
                "mimeType": "application/vnd.google-apps.folder"
            }),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = remote_store(&server);
    let listed = store
        .list_files(&NamespaceHandle::visible("notes-id"))
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "a.md");
}

#[tokio::test]
async fn test_create_file_uses_parent_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(wiremock::matchers::body_string_contains(r#""parents":["appDataFolder"]"#))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_json("new-id", "a.md", "appDataFolder")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = remote_store(&server);
    let created = store
        .create_file(&NamespaceHandle::hidden(), "a.md", b"hello")
        .await
        .unwrap();
    assert_eq!(created.id.as_str(), "new-id");
    assert_eq!(created.parent.as_deref(), Some("appDataFolder"));
}
