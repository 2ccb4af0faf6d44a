//! Core types shared across the crate: errors, OAuth2 material, and
//! client configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for Drive operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveErrorKind {
    /// HTTP-level error with status code.
    HttpError(u16),
    /// OAuth2 authentication failure.
    AuthenticationFailed,
    /// Token has expired.
    TokenExpired,
    /// Remote file or folder not found.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Rate limit exceeded (HTTP 429).
    RateLimitExceeded,
    /// Storage quota exceeded.
    QuotaExceeded,
    /// Upload failed.
    UploadFailed,
    /// Download failed.
    DownloadFailed,
    /// Invalid request parameter.
    InvalidParameter,
    /// A remote record could not be turned into a node.
    InvalidNode,
    /// Local filesystem error.
    Io,
    /// Network/connectivity error.
    NetworkError,
    /// Server error (5xx).
    ServerError,
    /// Generic / unmapped error.
    Other,
}

impl std::fmt::Display for DriveErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpError(code) => write!(f, "HTTP {}", code),
            Self::AuthenticationFailed => write!(f, "AuthenticationFailed"),
            Self::TokenExpired => write!(f, "TokenExpired"),
            Self::NotFound => write!(f, "NotFound"),
            Self::PermissionDenied => write!(f, "PermissionDenied"),
            Self::RateLimitExceeded => write!(f, "RateLimitExceeded"),
            Self::QuotaExceeded => write!(f, "QuotaExceeded"),
            Self::UploadFailed => write!(f, "UploadFailed"),
            Self::DownloadFailed => write!(f, "DownloadFailed"),
            Self::InvalidParameter => write!(f, "InvalidParameter"),
            Self::InvalidNode => write!(f, "InvalidNode"),
            Self::Io => write!(f, "Io"),
            Self::NetworkError => write!(f, "NetworkError"),
            Self::ServerError => write!(f, "ServerError"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A Drive error: a kind plus a human-readable message.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("[{kind}] {message}")]
pub struct DriveError {
    pub kind: DriveErrorKind,
    pub message: String,
}

impl DriveError {
    pub fn new(kind: DriveErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create from an HTTP status code and response body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => DriveErrorKind::AuthenticationFailed,
            403 if body.contains("storageQuotaExceeded") => DriveErrorKind::QuotaExceeded,
            403 => DriveErrorKind::PermissionDenied,
            404 => DriveErrorKind::NotFound,
            429 => DriveErrorKind::RateLimitExceeded,
            500..=599 => DriveErrorKind::ServerError,
            _ => DriveErrorKind::HttpError(status),
        };
        Self::new(kind, body.chars().take(500).collect::<String>())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(DriveErrorKind::AuthenticationFailed, msg)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(DriveErrorKind::InvalidParameter, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(DriveErrorKind::NetworkError, msg)
    }

    pub fn node(msg: impl Into<String>) -> Self {
        Self::new(DriveErrorKind::InvalidNode, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(DriveErrorKind::Io, msg)
    }
}

/// Convenience type alias.
pub type DriveResult<T> = Result<T, DriveError>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OAuth2
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Google OAuth2 scopes for Drive.
pub mod scopes {
    /// Full access to all files.
    pub const DRIVE: &str = "https://www.googleapis.com/auth/drive";
    /// Per-file access to files created or opened by the app.
    pub const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
    /// Read-only file access.
    pub const DRIVE_READONLY: &str = "https://www.googleapis.com/auth/drive.readonly";
}

/// OAuth2 client credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredentials {
    /// OAuth2 client ID from Google Cloud Console.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Redirect URI for the OAuth flow.
    pub redirect_uri: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

impl Default for OAuthCredentials {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "urn:ietf:wg:oauth:2.0:oob".to_string(),
            scopes: vec![scopes::DRIVE.to_string()],
        }
    }
}

/// OAuth2 token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    /// Bearer access token.
    pub access_token: String,
    /// Refresh token (used to obtain new access tokens).
    pub refresh_token: Option<String>,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiry time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes.
    pub scope: Option<String>,
}

impl Default for OAuthToken {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_at: None,
            scope: None,
        }
    }
}

impl OAuthToken {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() >= exp,
            None => false,
        }
    }
}

/// Raw JSON response from Google's token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  MIME markers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Well-known Google Drive MIME types.
pub mod mime_types {
    /// The reserved marker type that makes a node a folder.
    pub const FOLDER: &str = "application/vnd.google-apps.folder";
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfig {
    /// Request timeout (seconds).
    pub timeout_seconds: u64,
    /// Maximum retries for transient failures.
    pub max_retries: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_retries: 3,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
