//! Authentication and error policy of DriveClient

use reqwest::Method;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultsync_core::domain::RemoteId;
use vaultsync_drive::client::RequestBody;
use vaultsync_drive::{files, DriveError};

use crate::common::{client_for, list_json, mount_token_refresh, setup_drive_mock};

#[tokio::test]
async fn test_request_sends_bearer_token() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let response = client
        .request(Method::GET, "/files", &[], RequestBody::Empty)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_missing_access_token_refreshes_first() {
    let server = MockServer::start().await;
    mount_token_refresh(&server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    client
        .request(Method::GET, "/files", &[], RequestBody::Empty)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_401_refreshes_once_and_retries() {
    let server = MockServer::start().await;
    mount_token_refresh(&server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("stale"));
    let response = client
        .request(Method::GET, "/files", &[], RequestBody::Empty)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_second_401_is_fatal_without_third_attempt() {
    let server = MockServer::start().await;
    mount_token_refresh(&server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("stale"));
    let err = client
        .request(Method::GET, "/files", &[], RequestBody::Empty)
        .await
        .unwrap_err();
    assert!(err.is_auth(), "expected Unauthorized, got {err:?}");
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let (server, client) = setup_drive_mock().await;
    mount_token_refresh(&server, "unused", 0).await;

    Mock::given(method("DELETE"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": 404, "message": "File not found: missing."}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = files::delete(&client, &RemoteId::new("missing").unwrap())
        .await
        .unwrap_err();
    match err {
        DriveError::Remote { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "File not found: missing.");
        }
        other => panic!("expected Remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_keeps_raw_body() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let err = client
        .request(Method::GET, "/files", &[], RequestBody::Empty)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.to_string().contains("backend unavailable"));
}

#[tokio::test]
async fn test_upload_requests_carry_their_own_content_type() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/upload/files/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    files::update_content(&client, &RemoteId::new("abc").unwrap(), b"new text")
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(content_type, "text/plain");
    assert_eq!(requests[0].body, b"new text");
}
