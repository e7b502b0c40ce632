//! Drive file operations against a mock API

use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use vaultsync_core::domain::RemoteId;
use vaultsync_drive::files;

use crate::common::{file_json, list_json, setup_drive_mock};

#[tokio::test]
async fn test_list_follows_next_page_token() {
    let (server, client) = setup_drive_mock().await;

    // Second page, matched only when the token is sent
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![file_json(
            "f3", "c.md", "p1",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", "trashed = false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [file_json("f1", "a.md", "p1"), file_json("f2", "b.md", "p1")],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listed = files::list(&client, "trashed = false", None).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
}

#[tokio::test]
async fn test_create_file_uses_multipart_upload() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains(r#""name":"a.md""#))
        .and(body_string_contains(r#""parents":["folder-1"]"#))
        .and(body_string_contains("hello"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_json("new-id", "a.md", "folder-1")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = files::create_file(&client, "a.md", &["folder-1".to_string()], b"hello")
        .await
        .unwrap();
    assert_eq!(created.id, "new-id");

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/related; boundary=vaultsync_"));
}

#[tokio::test]
async fn test_create_folder_sends_folder_mime_type() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_json(serde_json::json!({
            "name": "Notes",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "folder-1",
            "name": "Notes",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = files::create_folder(&client, "Notes").await.unwrap();
    assert_eq!(folder.id, "folder-1");
    assert!(folder.is_folder());
}

#[tokio::test]
async fn test_update_content_is_media_patch() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/files/f1"))
        .and(query_param("uploadType", "media"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "f1"})))
        .expect(1)
        .mount(&server)
        .await;

    files::update_content(&client, &RemoteId::new("f1").unwrap(), b"v2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rename_patches_metadata() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/files/f1"))
        .and(body_json(serde_json::json!({"name": "renamed.md"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "f1"})))
        .expect(1)
        .mount(&server)
        .await;

    files::rename(&client, &RemoteId::new("f1").unwrap(), "renamed.md")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_and_download() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/files/f1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/f2"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"remote content".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    files::delete(&client, &RemoteId::new("f1").unwrap())
        .await
        .unwrap();
    let content = files::download(&client, &RemoteId::new("f2").unwrap())
        .await
        .unwrap();
    assert_eq!(content, b"remote content");
}
