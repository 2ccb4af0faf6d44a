//! HTTP client for the Google Drive API v3.
//!
//! Wraps `reqwest::Client` with OAuth2 bearer-token auth, exponential-backoff
//! retries, and helpers for the HTTP verbs the Drive REST surface needs.

use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{DriveConfig, DriveError, DriveErrorKind, DriveResult, OAuthToken};

/// Base URL for Drive API v3 metadata endpoints.
pub const API_BASE: &str = "https://www.googleapis.com/drive/v3";
/// Base URL for Drive API v3 upload endpoints.
pub const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
/// Google OAuth2 token endpoint.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Google OAuth2 authorization endpoint.
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Drive HTTP client with built-in auth and retries.
#[derive(Clone)]
pub struct DriveClient {
    /// Inner reqwest client.
    inner: Client,
    /// Currently active OAuth2 token.
    token: Option<OAuthToken>,
    /// Configuration.
    config: DriveConfig,
}

impl DriveClient {
    // ── Construction ─────────────────────────────────────────────

    /// Create a new client from config.
    pub fn new(config: DriveConfig) -> DriveResult<Self> {
        let inner = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| DriveError::network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner,
            token: None,
            config,
        })
    }

    /// Create a client with default configuration.
    pub fn default_client() -> DriveResult<Self> {
        Self::new(DriveConfig::default())
    }

    // ── Token management ─────────────────────────────────────────

    /// Set the active OAuth2 token.
    pub fn set_token(&mut self, token: OAuthToken) {
        self.token = Some(token);
    }

    /// Get a reference to the current token, if any.
    pub fn token(&self) -> Option<&OAuthToken> {
        self.token.as_ref()
    }

    /// Whether the client currently has a valid (non-expired) token.
    pub fn is_authenticated(&self) -> bool {
        self.token
            .as_ref()
            .map(|t| !t.access_token.is_empty() && !t.is_expired())
            .unwrap_or(false)
    }

    /// Get the config reference.
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    // ── Request building helpers ─────────────────────────────────

    fn auth_headers(&self) -> DriveResult<HeaderMap> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| DriveError::auth("No OAuth2 token set"))?;
        if token.is_expired() {
            return Err(DriveError::new(
                DriveErrorKind::TokenExpired,
                "OAuth2 token has expired, refresh required",
            ));
        }
        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", token.access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&val)
                .map_err(|e| DriveError::auth(format!("Invalid auth header: {e}")))?,
        );
        Ok(headers)
    }

    fn build_request(&self, method: Method, url: &str) -> DriveResult<RequestBuilder> {
        let headers = self.auth_headers()?;
        Ok(self.inner.request(method, url).headers(headers))
    }

    // ── Core execution with retries ──────────────────────────────

    /// Execute a request builder with automatic retry on transient failures.
    async fn execute_with_retry(
        &self,
        build_fn: impl Fn() -> DriveResult<RequestBuilder>,
    ) -> DriveResult<Response> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0u32;
        loop {
            let request = build_fn()?
                .build()
                .map_err(|e| DriveError::network(format!("Failed to build request: {e}")))?;
            debug!("Drive API {} {}", request.method(), request.url());

            match self.inner.execute(request).await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = DriveError::from_status(status.as_u16(), &body);

                    // Retry on 429 and 5xx
                    if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                        && attempt < max_retries
                    {
                        attempt += 1;
                        let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                        warn!(
                            "Drive API transient error ({}), retry {}/{} in {:?}",
                            status, attempt, max_retries, backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    if attempt < max_retries {
                        attempt += 1;
                        let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                        warn!(
                            "Drive API network error: {}, retry {}/{} in {:?}",
                            e, attempt, max_retries, backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    return Err(DriveError::network(e.to_string()));
                }
            }
        }
    }

    // ── Public HTTP verb helpers ──────────────────────────────────

    /// GET with query parameters, return JSON.
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> DriveResult<T> {
        let url_owned = url.to_string();
        let resp = self
            .execute_with_retry(|| {
                Ok(self.build_request(Method::GET, &url_owned)?.query(query))
            })
            .await?;
        resp.json::<T>()
            .await
            .map_err(|e| DriveError::network(format!("JSON parse error: {e}")))
    }

    /// POST with a JSON body, return JSON.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> DriveResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url_owned = url.to_string();
        let body_bytes = serde_json::to_vec(body)
            .map_err(|e| DriveError::invalid(format!("Body serialization: {e}")))?;

        let resp = self
            .execute_with_retry(|| {
                let req = self.build_request(Method::POST, &url_owned)?;
                Ok(req
                    .header(CONTENT_TYPE, "application/json")
                    .body(body_bytes.clone()))
            })
            .await?;

        resp.json::<T>()
            .await
            .map_err(|e| DriveError::network(format!("JSON parse error: {e}")))
    }

    /// POST raw bytes (for multipart uploads), return JSON.
    pub async fn post_bytes<T: DeserializeOwned>(
        &self,
        url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> DriveResult<T> {
        let url_owned = url.to_string();
        let ct = content_type.to_string();

        let resp = self
            .execute_with_retry(|| {
                let req = self.build_request(Method::POST, &url_owned)?;
                Ok(req.header(CONTENT_TYPE, &ct).body(bytes.clone()))
            })
            .await?;

        resp.json::<T>()
            .await
            .map_err(|e| DriveError::network(format!("JSON parse error: {e}")))
    }

    /// GET returning the raw response, for streaming download bodies.
    pub async fn get_stream(&self, url: &str) -> DriveResult<Response> {
        let url_owned = url.to_string();
        self.execute_with_retry(|| self.build_request(Method::GET, &url_owned))
            .await
    }

    /// POST to the token endpoint (un-authenticated).
    pub async fn post_form_unauthenticated<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> DriveResult<T> {
        let resp = self
            .inner
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| DriveError::network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::from_status(status, &body));
        }
        resp.json::<T>()
            .await
            .map_err(|e| DriveError::network(format!("Token response parse error: {e}")))
    }

    /// Build a full API URL: `{API_BASE}/{path}`.
    pub fn api_url(path: &str) -> String {
        format!("{}/{}", API_BASE, path.trim_start_matches('/'))
    }

    /// Build a full upload URL: `{UPLOAD_BASE}/{path}`.
    pub fn upload_url(path: &str) -> String {
        format!("{}/{}", UPLOAD_BASE, path.trim_start_matches('/'))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OAuthToken;
    use chrono::Utc;

    #[test]
    fn api_url_construction() {
        assert_eq!(
            DriveClient::api_url("files"),
            "https://www.googleapis.com/drive/v3/files"
        );
        assert_eq!(
            DriveClient::api_url("/files"),
            "https://www.googleapis.com/drive/v3/files"
        );
        assert_eq!(
            DriveClient::api_url("files/abc123"),
            "https://www.googleapis.com/drive/v3/files/abc123"
        );
    }

    #[test]
    fn upload_url_construction() {
        assert_eq!(
            DriveClient::upload_url("files"),
            "https://www.googleapis.com/upload/drive/v3/files"
        );
    }

    #[test]
    fn new_client_default() {
        let client = DriveClient::default_client().unwrap();
        assert!(!client.is_authenticated());
        assert!(client.token().is_none());
        assert_eq!(client.config().timeout_seconds, 30);
    }

    #[test]
    fn set_token() {
        let mut client = DriveClient::default_client().unwrap();
        assert!(!client.is_authenticated());

        let token = OAuthToken {
            access_token: "ya29.test".into(),
            refresh_token: Some("1//refresh".into()),
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            scope: None,
        };
        client.set_token(token);
        assert!(client.is_authenticated());
    }

    #[test]
    fn expired_token_not_authenticated() {
        let mut client = DriveClient::default_client().unwrap();
        let token = OAuthToken {
            access_token: "ya29.expired".into(),
            refresh_token: None,
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
            scope: None,
        };
        client.set_token(token);
        assert!(!client.is_authenticated());
    }

    #[test]
    fn empty_token_not_authenticated() {
        let mut client = DriveClient::default_client().unwrap();
        client.set_token(OAuthToken::default());
        assert!(!client.is_authenticated());
    }

    #[test]
    fn auth_headers_no_token() {
        let client = DriveClient::default_client().unwrap();
        let err = client.auth_headers().unwrap_err();
        assert_eq!(err.kind, DriveErrorKind::AuthenticationFailed);
    }

    #[test]
    fn auth_headers_expired_token() {
        let mut client = DriveClient::default_client().unwrap();
        client.set_token(OAuthToken {
            access_token: "ya29.expired".into(),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        });
        let err = client.auth_headers().unwrap_err();
        assert_eq!(err.kind, DriveErrorKind::TokenExpired);
    }

    #[test]
    fn auth_headers_valid_token() {
        let mut client = DriveClient::default_client().unwrap();
        client.set_token(OAuthToken {
            access_token: "ya29.valid".into(),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
            ..Default::default()
        });
        let headers = client.auth_headers().unwrap();
        let auth_val = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(auth_val, "Bearer ya29.valid");
    }

    #[test]
    fn constants() {
        assert!(API_BASE.contains("googleapis.com/drive/v3"));
        assert!(UPLOAD_BASE.contains("upload/drive/v3"));
        assert!(TOKEN_URL.contains("oauth2.googleapis.com/token"));
        assert!(AUTH_URL.contains("accounts.google.com"));
    }

    #[test]
    fn clone_client() {
        let client = DriveClient::default_client().unwrap();
        let cloned = client.clone();
        assert!(!cloned.is_authenticated());
    }
}
