//! Token store tests against a mock token endpoint

use std::sync::Arc;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vaultsync_drive::auth::TokenStore;

use crate::common::{mount_token_refresh, oauth_config, token_store, REFRESH_TOKEN};

#[tokio::test]
async fn test_exchange_code_stores_both_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("client_id=test-client"))
        .and(body_string_contains("client_secret=test-secret"))
        .and(body_string_contains("redirect_uri=urn%3Aietf%3Awg%3Aoauth%3A2.0%3Aoob"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = TokenStore::new(&oauth_config(&server), None).unwrap();
    let creds = tokens.exchange_code("the-code").await.unwrap();

    assert_eq!(creds.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(creds.access_token.as_deref(), Some("access-1"));
    assert!(creds.expires_at.is_some());
    assert_eq!(tokens.access_token().await.unwrap(), "access-1");
}

#[tokio::test]
async fn test_exchange_code_rejected_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Malformed auth code."
        })))
        .mount(&server)
        .await;

    let tokens = TokenStore::new(&oauth_config(&server), None).unwrap();
    let err = tokens.exchange_code("expired-code").await.unwrap_err();

    assert!(err.is_auth());
    assert!(!tokens.has_refresh_token().await);
}

#[tokio::test]
async fn test_refresh_replaces_access_token_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=test-refresh"))
        .and(body_string_contains("client_secret=test-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = token_store(&server, Some("old"));
    assert_eq!(tokens.refresh().await.unwrap(), "fresh");

    let creds = tokens.credentials().await;
    assert_eq!(creds.access_token.as_deref(), Some("fresh"));
    assert_eq!(creds.refresh_token.as_deref(), Some(REFRESH_TOKEN));
}

#[tokio::test]
async fn test_refresh_failure_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client"
        })))
        .mount(&server)
        .await;

    let err = token_store(&server, None).refresh().await.unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    mount_token_refresh(&server, "shared", 1).await;

    let tokens = Arc::new(token_store(&server, None));
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let tokens = tokens.clone();
            tokio::spawn(async move { tokens.access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "shared");
    }
}
