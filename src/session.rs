//! The remote session seam.
//!
//! [`RemoteSession`] is the narrow transport surface every operation in this
//! crate is written against: list matching records, stream a file body, and
//! create a file from metadata plus optional content. [`DriveSession`] is the
//! HTTP-backed implementation; tests substitute a scripted fake.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::client::DriveClient;
use crate::types::{DriveError, DriveResult};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Chunked download handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An in-progress chunked download.
///
/// Pulls content chunks one at a time and tracks completion as a fraction,
/// so callers can report progress without knowing the transport.
pub struct ChunkedDownload {
    stream: BoxStream<'static, DriveResult<Bytes>>,
    total: Option<u64>,
    received: u64,
    done: bool,
}

impl ChunkedDownload {
    pub fn new(stream: BoxStream<'static, DriveResult<Bytes>>, total: Option<u64>) -> Self {
        Self {
            stream,
            total,
            received: 0,
            done: false,
        }
    }

    /// Build a download from pre-scripted chunks. Used by tests and by any
    /// caller that already has the content in memory.
    pub fn from_chunks(chunks: Vec<DriveResult<Bytes>>, total: Option<u64>) -> Self {
        Self::new(futures_util::stream::iter(chunks).boxed(), total)
    }

    /// Pull the next chunk, or `Ok(None)` when the body is exhausted.
    pub async fn next_chunk(&mut self) -> DriveResult<Option<Bytes>> {
        match self.stream.next().await {
            Some(Ok(chunk)) => {
                self.received += chunk.len() as u64;
                Ok(Some(chunk))
            }
            Some(Err(e)) => Err(e),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Bytes received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Total body size, when the server reported one.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Completed fraction in `[0.0, 1.0]`. Without a known total this is
    /// `0.0` until the stream ends, then `1.0`.
    pub fn progress(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => (self.received as f64 / total as f64).min(1.0),
            _ => {
                if self.done {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Session trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// File content attached to a create request.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Content type sent for the media part.
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// The transport surface the Drive operations are written against.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// List raw file records matching a search query.
    ///
    /// `fields` names the per-record metadata fields to request and
    /// `page_size` caps the number of records returned.
    async fn list_files(
        &self,
        query: &str,
        fields: &str,
        page_size: u32,
    ) -> DriveResult<Vec<Map<String, Value>>>;

    /// Open a chunked download of a file's content.
    async fn get_file_content(&self, file_id: &str) -> DriveResult<ChunkedDownload>;

    /// Create a remote file from metadata, optionally with content, and
    /// return the raw record of the created node.
    async fn create_file(
        &self,
        metadata: &Map<String, Value>,
        content: Option<FileContent>,
    ) -> DriveResult<Map<String, Value>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HTTP implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// [`RemoteSession`] backed by the Drive REST API over a [`DriveClient`].
pub struct DriveSession {
    client: DriveClient,
}

impl DriveSession {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait]
impl RemoteSession for DriveSession {
    async fn list_files(
        &self,
        query: &str,
        fields: &str,
        page_size: u32,
    ) -> DriveResult<Vec<Map<String, Value>>> {
        let url = DriveClient::api_url("files");
        let params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("pageSize", page_size.to_string()),
            ("fields", format!("files({})", fields)),
        ];
        let response: Value = self.client.get_json_with_query(&url, &params).await?;

        let files = response
            .get("files")
            .and_then(Value::as_array)
            .ok_or_else(|| DriveError::network("List response has no 'files' array"))?;

        Ok(files
            .iter()
            .filter_map(Value::as_object)
            .cloned()
            .collect())
    }

    async fn get_file_content(&self, file_id: &str) -> DriveResult<ChunkedDownload> {
        let url = format!("{}?alt=media", DriveClient::api_url(&format!("files/{}", file_id)));
        let response = self.client.get_stream(&url).await?;
        let total = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(|e| DriveError::network(format!("Stream error: {e}"))))
            .boxed();
        Ok(ChunkedDownload::new(stream, total))
    }

    async fn create_file(
        &self,
        metadata: &Map<String, Value>,
        content: Option<FileContent>,
    ) -> DriveResult<Map<String, Value>> {
        let created: Value = match content {
            None => {
                let url = format!(
                    "{}?fields={}",
                    DriveClient::api_url("files"),
                    crate::nodes::NODE_FIELDS.replace(' ', "")
                );
                self.client.post_json(&url, metadata).await?
            }
            Some(content) => {
                let metadata_json = serde_json::to_string(metadata)
                    .map_err(|e| DriveError::invalid(format!("Metadata serialization: {e}")))?;
                let boundary = format!("gdrive_mirror_{}", uuid::Uuid::new_v4());
                let content_type = format!("multipart/related; boundary={}", boundary);

                let mut body = Vec::new();
                body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
                body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
                body.extend_from_slice(metadata_json.as_bytes());
                body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
                body.extend_from_slice(
                    format!("Content-Type: {}\r\n\r\n", content.mime_type).as_bytes(),
                );
                body.extend_from_slice(&content.bytes);
                body.extend_from_slice(format!("\r\n--{}--", boundary).as_bytes());

                let url = format!(
                    "{}?uploadType=multipart&fields={}",
                    DriveClient::upload_url("files"),
                    crate::nodes::NODE_FIELDS.replace(' ', "")
                );
                self.client.post_bytes(&url, &content_type, body).await?
            }
        };

        created
            .as_object()
            .cloned()
            .ok_or_else(|| DriveError::network("Create response is not a JSON object"))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Test double
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
