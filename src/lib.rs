//! # gdrive-mirror
//!
//! Google Drive API v3 client for mirroring file trees between a local
//! filesystem and a Drive folder.
//!
//! ## Features
//!
//! - **OAuth2 Authentication** – installed-app consent flow, on-disk token
//!   cache, automatic refresh
//! - **Lookup** – find files and folders by name, id, MIME type, and parent
//! - **Listing** – sorted single-page child listings
//! - **Downloads** – chunked streaming downloads with progress, plus
//!   recursive folder mirroring that isolates per-file failures
//! - **Uploads** – multipart uploads with sniffed content types, plus
//!   recursive tree uploads that stop cleanly at the first failure
//! - **Search** – build queries with Drive query syntax

pub mod auth;
pub mod client;
pub mod download;
pub mod lookup;
pub mod nodes;
pub mod query;
pub mod session;
pub mod types;
pub mod upload;

pub use auth::Authenticator;
pub use client::DriveClient;
pub use download::{download, download_folder, DownloadSink, TransferReport};
pub use lookup::{find, find_folder, list_children, LIST_LIMIT};
pub use nodes::{DriveNode, NodeKind, NODE_FIELDS};
pub use query::QueryBuilder;
pub use session::{ChunkedDownload, DriveSession, FileContent, RemoteSession};
pub use types::{
    mime_types, scopes, DriveConfig, DriveError, DriveErrorKind, DriveResult, OAuthCredentials,
    OAuthToken,
};
pub use upload::{upload, UploadOptions, UploadOutcome};
