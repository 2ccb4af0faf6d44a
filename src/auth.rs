//! OAuth2 authentication for Google Drive.
//!
//! Implements the installed-app authorization-code flow:
//!   1. Build an authorization URL for the user.
//!   2. Collect the authorization code on a loopback listener.
//!   3. Exchange the code for tokens.
//!   4. Cache tokens on disk and refresh them when they expire.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::client::{DriveClient, AUTH_URL, TOKEN_URL};
use crate::session::DriveSession;
use crate::types::{
    DriveConfig, DriveError, DriveErrorKind, DriveResult, OAuthCredentials, OAuthToken,
    TokenResponse,
};

/// Default on-disk token cache file.
pub const TOKEN_CACHE: &str = ".token.json";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Protocol helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the Google OAuth2 authorization URL that the user should open.
pub fn build_auth_url(credentials: &OAuthCredentials) -> DriveResult<String> {
    if credentials.client_id.is_empty() {
        return Err(DriveError::invalid("client_id is required"));
    }
    if credentials.scopes.is_empty() {
        return Err(DriveError::invalid("At least one scope is required"));
    }

    let scope = credentials.scopes.join(" ");
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("redirect_uri", credentials.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", &scope),
        ("access_type", "offline"),
        ("prompt", "consent"),
    ];

    let url = url::Url::parse_with_params(AUTH_URL, &params)
        .map_err(|e| DriveError::invalid(format!("Failed to build auth URL: {e}")))?;

    Ok(url.to_string())
}

/// Exchange an authorization code for access + refresh tokens.
pub async fn exchange_code(
    client: &DriveClient,
    credentials: &OAuthCredentials,
    code: &str,
) -> DriveResult<OAuthToken> {
    if code.is_empty() {
        return Err(DriveError::invalid("Authorization code is empty"));
    }

    debug!("Exchanging authorization code for tokens");
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", credentials.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];

    let resp: TokenResponse = client.post_form_unauthenticated(TOKEN_URL, &params).await?;
    Ok(token_from_response(resp))
}

/// Refresh an expired access token using the refresh token.
pub async fn refresh_token(
    client: &DriveClient,
    credentials: &OAuthCredentials,
    refresh_token: &str,
) -> DriveResult<OAuthToken> {
    if refresh_token.is_empty() {
        return Err(DriveError::new(
            DriveErrorKind::TokenExpired,
            "No refresh token available",
        ));
    }

    debug!("Refreshing access token");
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let resp: TokenResponse = client.post_form_unauthenticated(TOKEN_URL, &params).await?;
    let mut token = token_from_response(resp);
    // Google does not always return a new refresh_token on refresh.
    if token.refresh_token.is_none() {
        token.refresh_token = Some(refresh_token.to_string());
    }
    Ok(token)
}

/// Convert the raw token response to our token type.
fn token_from_response(resp: TokenResponse) -> OAuthToken {
    let expires_at = resp.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
    OAuthToken {
        access_token: resp.access_token,
        refresh_token: resp.refresh_token,
        token_type: resp.token_type.unwrap_or_else(|| "Bearer".into()),
        expires_at,
        scope: resp.scope,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Client secrets and token cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The `installed` section of a Google client secrets file.
#[derive(Debug, Deserialize)]
struct InstalledSecrets {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: InstalledSecrets,
}

/// Load OAuth credentials from a `client_secret.json` downloaded from the
/// Google Cloud Console (installed-app format).
pub fn load_client_secrets(
    path: impl AsRef<Path>,
    scopes: Vec<String>,
) -> DriveResult<OAuthCredentials> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DriveError::io(format!("Cannot read {}: {e}", path.display())))?;
    let parsed: ClientSecretsFile = serde_json::from_str(&raw)
        .map_err(|e| DriveError::invalid(format!("Malformed client secrets file: {e}")))?;

    Ok(OAuthCredentials {
        client_id: parsed.installed.client_id,
        client_secret: parsed.installed.client_secret,
        redirect_uri: parsed
            .installed
            .redirect_uris
            .into_iter()
            .next()
            .unwrap_or_else(|| "http://localhost".to_string()),
        scopes,
    })
}

/// Read a cached token, if the file exists and parses.
pub fn load_cached_token(path: impl AsRef<Path>) -> Option<OAuthToken> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

/// Persist a token to the cache file.
pub fn save_token(path: impl AsRef<Path>, token: &OAuthToken) -> DriveResult<()> {
    let path = path.as_ref();
    let raw = serde_json::to_string_pretty(token)
        .map_err(|e| DriveError::invalid(format!("Token serialization: {e}")))?;
    std::fs::write(path, raw)
        .map_err(|e| DriveError::io(format!("Cannot write {}: {e}", path.display())))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Loopback consent listener
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Extract the authorization code from the redirect request line
/// (`GET /?code=...&scope=... HTTP/1.1`).
fn parse_redirect_request(request: &str) -> DriveResult<String> {
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| DriveError::auth("Malformed redirect request"))?;

    let parsed = url::Url::parse(&format!("http://localhost{}", target))
        .map_err(|e| DriveError::auth(format!("Unparseable redirect target: {e}")))?;

    if let Some((_, err)) = parsed.query_pairs().find(|(k, _)| k == "error") {
        return Err(DriveError::auth(format!("Consent denied: {}", err)));
    }

    parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| DriveError::auth("Redirect carried no authorization code"))
}

/// Accept one redirect on the listener and return the authorization code.
async fn receive_auth_code(listener: TcpListener) -> DriveResult<String> {
    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| DriveError::io(format!("Consent listener accept failed: {e}")))?;

    let mut buf = vec![0u8; 8192];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| DriveError::io(format!("Consent listener read failed: {e}")))?;
    let request = String::from_utf8_lossy(&buf[..n]).into_owned();

    let code = parse_redirect_request(&request);

    let page = match &code {
        Ok(_) => "<html><body>Authorization complete. You can close this tab.</body></html>",
        Err(_) => "<html><body>Authorization failed. You can close this tab.</body></html>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        page.len(),
        page
    );
    // The user already sees the outcome in the browser; a failed write
    // does not invalidate the code we parsed.
    let _ = stream.write_all(response.as_bytes()).await;

    code
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Authenticator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Manages credentials, the token cache, and the consent flow, and hands
/// out authenticated sessions.
#[derive(Debug, Clone)]
pub struct Authenticator {
    credentials: OAuthCredentials,
    cache_path: PathBuf,
    save: bool,
}

impl Authenticator {
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            cache_path: PathBuf::from(TOKEN_CACHE),
            save: true,
        }
    }

    /// Build an authenticator from a `client_secret.json` file.
    pub fn from_secrets_file(path: impl AsRef<Path>, scopes: Vec<String>) -> DriveResult<Self> {
        Ok(Self::new(load_client_secrets(path, scopes)?))
    }

    /// Override the token cache location.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Disable writing tokens back to the cache.
    pub fn without_saving(mut self) -> Self {
        self.save = false;
        self
    }

    /// Obtain a usable token: cached if still valid, refreshed if possible,
    /// otherwise via a fresh interactive consent flow.
    pub async fn authorize(&self, client: &DriveClient) -> DriveResult<OAuthToken> {
        if let Some(cached) = load_cached_token(&self.cache_path) {
            if !cached.is_expired() {
                debug!("Using cached token from {}", self.cache_path.display());
                return Ok(cached);
            }
            if let Some(refresh) = cached.refresh_token.clone() {
                match refresh_token(client, &self.credentials, &refresh).await {
                    Ok(fresh) => {
                        if self.save {
                            save_token(&self.cache_path, &fresh)?;
                        }
                        return Ok(fresh);
                    }
                    Err(e) => {
                        warn!("Token refresh failed ({e}), starting consent flow");
                    }
                }
            }
        }

        let token = self.run_consent_flow(client).await?;
        if self.save {
            save_token(&self.cache_path, &token)?;
        }
        Ok(token)
    }

    /// Run the interactive loopback consent flow.
    async fn run_consent_flow(&self, client: &DriveClient) -> DriveResult<OAuthToken> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| DriveError::io(format!("Cannot bind consent listener: {e}")))?;
        let port = listener
            .local_addr()
            .map_err(|e| DriveError::io(format!("Consent listener address: {e}")))?
            .port();

        let mut credentials = self.credentials.clone();
        credentials.redirect_uri = format!("http://127.0.0.1:{}/", port);

        let auth_url = build_auth_url(&credentials)?;
        info!("Open this URL in a browser to authorize access:\n{auth_url}");

        let code = receive_auth_code(listener).await?;
        exchange_code(client, &credentials, &code).await
    }

    /// Authorize and return a ready-to-use session.
    pub async fn connect(&self, config: DriveConfig) -> DriveResult<DriveSession> {
        let mut client = DriveClient::new(config)?;
        let token = self.authorize(&client).await?;
        client.set_token(token);
        Ok(DriveSession::new(client))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
