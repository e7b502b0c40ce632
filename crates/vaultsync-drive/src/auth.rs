//! OAuth2 token lifecycle for the Drive API
//!
//! Implements the out-of-band Authorization Code flow used by installed
//! applications: the user opens [`TokenStore::authorization_url`], pastes the
//! code back, and [`TokenStore::exchange_code`] trades it for tokens. From
//! then on only the refresh token is durable; access tokens live in memory.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client credentials and endpoints
//! - [`Credentials`] - Refresh token plus the transient access token
//! - [`TokenStore`] - Code exchange and serialized refresh
//! - [`KeyringTokenStorage`] - Refresh token persistence in the system keyring

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vaultsync_core::config::{AuthConfig, Config};

use crate::DriveError;

/// Default OAuth2 authorization endpoint
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Default OAuth2 token endpoint
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Out-of-band redirect: the provider shows the code instead of redirecting
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Keyring service name for storing refresh tokens
const KEYRING_SERVICE: &str = "vaultsync";

/// Access tokens this close to expiry are treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// Assumed access token lifetime when the provider omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

type OAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

// ============================================================================
// OAuth2Config
// ============================================================================

/// Client credentials and endpoints for the OAuth2 flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Redirect URI sent with the authorization request and code exchange
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
    /// Timeout for token endpoint requests
    pub timeout: Duration,
}

impl OAuth2Config {
    /// Creates a config with the default endpoints and scopes
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: AUTH_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            redirect_uri: OOB_REDIRECT_URI.to_string(),
            scopes: AuthConfig::default().scopes,
            timeout: Duration::from_secs(30),
        }
    }

    /// Builds the OAuth2 config from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.auth.client_id.clone(),
            client_secret: config.auth.client_secret.clone(),
            auth_url: config.remote.auth_url.clone(),
            token_url: config.remote.token_url.clone(),
            redirect_uri: OOB_REDIRECT_URI.to_string(),
            scopes: config.auth.scopes.clone(),
            timeout: config.request_timeout(),
        }
    }

    /// Overrides the authorization and token endpoints
    pub fn with_endpoints(mut self, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Overrides the requested scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Tokens held for one client
///
/// `refresh_token` is durable; `access_token` and `expires_at` are
/// process-lifetime only and are never persisted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Credentials holding only a refresh token
    pub fn from_refresh_token(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: Some(refresh_token.into()),
            ..Self::default()
        }
    }

    /// The access token, if one is held and not about to expire
    pub fn valid_access_token(&self) -> Option<&str> {
        let token = self.access_token.as_deref().filter(|t| !t.is_empty())?;
        match self.expires_at {
            Some(at) if at <= Utc::now() + chrono::Duration::seconds(EXPIRY_SKEW_SECS) => None,
            _ => Some(token),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Holds the session's credentials and performs token exchanges
///
/// All exchanges run while holding the credential lock, so concurrent
/// callers that find the access token missing wait for the one outstanding
/// refresh instead of starting their own.
pub struct TokenStore {
    oauth: OAuthClient,
    http: reqwest::Client,
    scopes: Vec<String>,
    credentials: Mutex<Credentials>,
}

impl TokenStore {
    /// Creates a token store, optionally seeded with a refresh token
    pub fn new(config: &OAuth2Config, refresh_token: Option<String>) -> Result<Self, DriveError> {
        let oauth = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(
                AuthUrl::new(config.auth_url.clone())
                    .map_err(|e| DriveError::Unauthorized(format!("invalid authorization URL: {e}")))?,
            )
            .set_token_uri(
                TokenUrl::new(config.token_url.clone())
                    .map_err(|e| DriveError::Unauthorized(format!("invalid token URL: {e}")))?,
            )
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone())
                    .map_err(|e| DriveError::Unauthorized(format!("invalid redirect URI: {e}")))?,
            );

        // Token endpoints must not follow redirects
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            oauth,
            http,
            scopes: config.scopes.clone(),
            credentials: Mutex::new(Credentials {
                refresh_token,
                ..Credentials::default()
            }),
        })
    }

    /// Seeds an access token, e.g. one carried over from an earlier exchange
    pub fn with_access_token(
        mut self,
        token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let creds = self.credentials.get_mut();
        creds.access_token = Some(token.into());
        creds.expires_at = expires_at;
        self
    }

    /// URL the user opens to grant access; the page displays a code
    pub fn authorization_url(&self) -> String {
        let mut request = self.oauth.authorize_url(CsrfToken::new_random);
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (url, _csrf) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();
        url.to_string()
    }

    /// Exchanges an authorization code for a refresh and access token
    ///
    /// # Errors
    /// Returns `DriveError::Unauthorized` when the token endpoint rejects the
    /// code or cannot be reached.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials, DriveError> {
        info!("Exchanging authorization code for tokens");
        let mut creds = self.credentials.lock().await;

        let response = self
            .oauth
            .exchange_code(AuthorizationCode::new(code.trim().to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| DriveError::Unauthorized(format!("authorization code exchange failed: {e}")))?;

        let refresh_token = response
            .refresh_token()
            .map(|t| t.secret().to_string())
            .or_else(|| creds.refresh_token.clone());
        if refresh_token.is_none() {
            warn!("Token endpoint returned no refresh token");
        }

        *creds = Credentials {
            refresh_token,
            access_token: Some(response.access_token().secret().to_string()),
            expires_at: Some(expiry_from(response.expires_in())),
        };

        info!("Obtained tokens from authorization code");
        Ok(creds.clone())
    }

    /// Exchanges the refresh token for a new access token
    ///
    /// Replaces the access token only; the refresh token is kept.
    ///
    /// # Errors
    /// Returns `DriveError::Unauthorized` if no refresh token is held or the
    /// token endpoint rejects it.
    pub async fn refresh(&self) -> Result<String, DriveError> {
        let mut creds = self.credentials.lock().await;
        self.refresh_locked(&mut creds).await
    }

    /// Returns a usable access token, refreshing first when none is held
    pub async fn access_token(&self) -> Result<String, DriveError> {
        let mut creds = self.credentials.lock().await;
        if let Some(token) = creds.valid_access_token() {
            return Ok(token.to_string());
        }
        debug!("No valid access token held, refreshing");
        self.refresh_locked(&mut creds).await
    }

    /// Called after the API rejected `stale` with a 401
    ///
    /// If another caller already replaced `stale`, its token is returned
    /// without a second exchange.
    pub async fn refresh_rejected(&self, stale: &str) -> Result<String, DriveError> {
        let mut creds = self.credentials.lock().await;
        if let Some(token) = creds.valid_access_token() {
            if token != stale {
                debug!("Access token already refreshed by another request");
                return Ok(token.to_string());
            }
        }
        self.refresh_locked(&mut creds).await
    }

    /// Snapshot of the current credentials
    pub async fn credentials(&self) -> Credentials {
        self.credentials.lock().await.clone()
    }

    /// Returns true if a refresh token is held
    pub async fn has_refresh_token(&self) -> bool {
        self.credentials.lock().await.refresh_token.is_some()
    }

    async fn refresh_locked(&self, creds: &mut Credentials) -> Result<String, DriveError> {
        let refresh_token = creds
            .refresh_token
            .clone()
            .ok_or_else(|| DriveError::Unauthorized("no refresh token; run `vaultsync auth login`".into()))?;

        info!("Refreshing access token");
        let response = self
            .oauth
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&self.http)
            .await
            .map_err(|e| DriveError::Unauthorized(format!("token refresh failed: {e}")))?;

        let token = response.access_token().secret().to_string();
        creds.access_token = Some(token.clone());
        creds.expires_at = Some(expiry_from(response.expires_in()));

        debug!(expires_at = ?creds.expires_at, "Access token refreshed");
        Ok(token)
    }
}

fn expiry_from(expires_in: Option<Duration>) -> DateTime<Utc> {
    let secs = expires_in
        .map(|d| d.as_secs() as i64)
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Utc::now() + chrono::Duration::seconds(secs)
}

// ============================================================================
// KeyringTokenStorage
// ============================================================================

/// Stores refresh tokens in the system keyring
///
/// Entries use the service name "vaultsync" and the OAuth client id as the
/// username, so switching clients never reuses a foreign token.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores a refresh token for the given client
    pub fn store(client_id: &str, refresh_token: &str) -> anyhow::Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, client_id)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(refresh_token)
            .context("Failed to store refresh token in keyring")?;
        debug!("Stored refresh token in keyring");
        Ok(())
    }

    /// Loads the refresh token for the given client, `None` if absent
    pub fn load(client_id: &str) -> anyhow::Result<Option<String>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, client_id)
            .context("Failed to create keyring entry")?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => {
                debug!("No refresh token found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes the refresh token for the given client
    pub fn clear(client_id: &str) -> anyhow::Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, client_id)
            .context("Failed to create keyring entry")?;
        match entry.delete_credential() {
            Ok(()) => {
                info!("Cleared refresh token from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }

    /// Refresh token to start a session with
    ///
    /// A token set in the configuration file wins over the keyring. Keyring
    /// failures are logged and treated as "no token".
    pub fn resolve(auth: &AuthConfig) -> Option<String> {
        if let Some(token) = auth.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            return Some(token.clone());
        }
        match Self::load(&auth.client_id) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read refresh token from keyring");
                None
            }
        }
    }
}
