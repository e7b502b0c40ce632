//! Authenticated Drive API client
//!
//! [`DriveClient`] sends requests to two bases: the metadata API and the
//! upload endpoint. Every request carries the current bearer token from the
//! shared [`TokenStore`]. A 401 triggers exactly one refresh and one retry;
//! a second 401 is fatal.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqwest::Method;
//! use vaultsync_drive::auth::{OAuth2Config, TokenStore};
//! use vaultsync_drive::client::{DriveClient, RequestBody};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tokens = Arc::new(TokenStore::new(
//!     &OAuth2Config::new("client-id", "client-secret"),
//!     Some("refresh-token".into()),
//! )?);
//! let client = DriveClient::new(tokens)?;
//! let response = client
//!     .request(Method::GET, "/files", &[("spaces", "appDataFolder")], RequestBody::Empty)
//!     .await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use vaultsync_core::config::Config;

use crate::{auth::TokenStore, DriveError};

/// Base URL for Drive metadata requests
const API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for Drive content uploads
const UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON body, sent with `Content-Type: application/json`
    Json(serde_json::Value),
    /// Raw body that carries its own content type
    Raw {
        content_type: String,
        data: Vec<u8>,
    },
}

/// Which base URL a request is addressed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Api,
    Upload,
}

/// Error envelope returned by the Drive API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for the Drive API with refresh-and-retry-once on 401
pub struct DriveClient {
    client: Client,
    api_base: String,
    upload_base: String,
    tokens: Arc<TokenStore>,
}

impl DriveClient {
    /// Creates a client against the public Drive endpoints
    pub fn new(tokens: Arc<TokenStore>) -> Result<Self, DriveError> {
        Self::with_endpoints(tokens, API_BASE_URL, UPLOAD_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// Uploads go to `{base_url}/upload`.
    pub fn with_base_url(
        tokens: Arc<TokenStore>,
        base_url: impl Into<String>,
    ) -> Result<Self, DriveError> {
        let base_url = base_url.into();
        let upload = format!("{}/upload", base_url.trim_end_matches('/'));
        Self::with_endpoints(tokens, &base_url, &upload, DEFAULT_TIMEOUT)
    }

    /// Creates a client from the `remote` section of the configuration
    pub fn from_config(tokens: Arc<TokenStore>, config: &Config) -> Result<Self, DriveError> {
        Self::with_endpoints(
            tokens,
            &config.remote.api_base,
            &config.remote.upload_base,
            config.request_timeout(),
        )
    }

    /// Creates a client with explicit API and upload bases
    pub fn with_endpoints(
        tokens: Arc<TokenStore>,
        api_base: &str,
        upload_base: &str,
        timeout: Duration,
    ) -> Result<Self, DriveError> {
        for base in [api_base, upload_base] {
            Url::parse(base)
                .map_err(|e| DriveError::InvalidResponse(format!("invalid base URL '{base}': {e}")))?;
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// The token store shared by this client
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Sends a request to the metadata API
    ///
    /// # Arguments
    /// * `path` - Path relative to the API base (e.g. `/files`)
    /// * `query` - Query parameters
    /// * `body` - Request body
    ///
    /// # Errors
    /// `Unauthorized` after a second 401, `Remote` for any other non-2xx
    /// status, `Network` for transport failures.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<Response, DriveError> {
        self.send(Endpoint::Api, method, path, query, &body).await
    }

    /// Sends a request to the upload endpoint
    ///
    /// No default content type is applied; raw bodies set their own.
    pub async fn upload_request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<Response, DriveError> {
        self.send(Endpoint::Upload, method, path, query, &body).await
    }

    async fn send(
        &self,
        endpoint: Endpoint,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: &RequestBody,
    ) -> Result<Response, DriveError> {
        let token = self.tokens.access_token().await?;
        debug!(%method, path, ?endpoint, "Sending request");

        let response = self
            .build(endpoint, method.clone(), path, query, body, &token)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        warn!(%method, path, "Access token rejected, refreshing and retrying once");
        let token = self.tokens.refresh_rejected(&token).await?;

        let response = self
            .build(endpoint, method.clone(), path, query, body, &token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%method, path, "Request rejected again after token refresh");
            return Err(DriveError::Unauthorized(format!(
                "{method} {path} rejected after token refresh"
            )));
        }

        check_status(response).await
    }

    fn build(
        &self,
        endpoint: Endpoint,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: &RequestBody,
        token: &str,
    ) -> RequestBuilder {
        let base = match endpoint {
            Endpoint::Api => &self.api_base,
            Endpoint::Upload => &self.upload_base,
        };
        let mut request = self
            .client
            .request(method, format!("{base}{path}"))
            .bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Raw { content_type, data } => request
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
        }
    }
}

/// Turns non-2xx responses into `DriveError::Remote`
async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    warn!(status = status.as_u16(), %message, "Drive request failed");
    Err(DriveError::Remote {
        status: status.as_u16(),
        message,
    })
}
