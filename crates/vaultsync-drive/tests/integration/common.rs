//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup for the token endpoint and
//! the Drive `files` resource. Each helper mounts the necessary mock
//! endpoints; the setup functions return a client pointing at the server.

use std::sync::Arc;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultsync_drive::auth::{OAuth2Config, TokenStore};
use vaultsync_drive::client::DriveClient;
use vaultsync_drive::provider::DriveRemoteStore;

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const REFRESH_TOKEN: &str = "test-refresh";

/// OAuth2 config whose endpoints point at the mock server
pub fn oauth_config(server: &MockServer) -> OAuth2Config {
    OAuth2Config::new(CLIENT_ID, CLIENT_SECRET).with_endpoints(
        format!("{}/auth", server.uri()),
        format!("{}/token", server.uri()),
    )
}

/// Token store holding a refresh token and, optionally, an access token
pub fn token_store(server: &MockServer, access_token: Option<&str>) -> TokenStore {
    let tokens = TokenStore::new(&oauth_config(server), Some(REFRESH_TOKEN.to_string()))
        .expect("token store");
    match access_token {
        Some(token) => tokens.with_access_token(token, None),
        None => tokens,
    }
}

/// Starts a mock server and returns a client already holding
/// `test-access-token`.
pub async fn setup_drive_mock() -> (MockServer, Arc<DriveClient>) {
    let server = MockServer::start().await;
    let client = client_for(&server, Some("test-access-token"));
    (server, client)
}

/// Client against `server` with the given initial access token
pub fn client_for(server: &MockServer, access_token: Option<&str>) -> Arc<DriveClient> {
    let tokens = Arc::new(token_store(server, access_token));
    Arc::new(DriveClient::with_base_url(tokens, server.uri()).expect("drive client"))
}

/// Remote store against `server`, holding `test-access-token`
pub fn remote_store(server: &MockServer) -> DriveRemoteStore {
    DriveRemoteStore::new(client_for(server, Some("test-access-token")))
}

/// Mounts a refresh-token exchange that returns `access_token`, expected
/// to be hit exactly `times` times.
pub async fn mount_token_refresh(server: &MockServer, access_token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "expires_in": 3599,
            "token_type": "Bearer",
            "scope": "https://www.googleapis.com/auth/drive.appdata"
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// JSON for one file entry
pub fn file_json(id: &str, name: &str, parent: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "parents": [parent],
        "mimeType": "text/plain"
    })
}

/// JSON for a one-page listing
pub fn list_json(files: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({ "files": files })
}
