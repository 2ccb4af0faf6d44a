//! Upload operations: single files, folders, and whole local trees.
//!
//! Uploads never return `Err`: every failure is folded into the
//! [`UploadOutcome`], alongside whatever was created before the failure.
//! A recursive upload stops at the first failed child, so the outcome's
//! `created` list always reflects exactly what now exists remotely.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use log::{info, warn};
use serde_json::{Map, Value};

use crate::nodes::DriveNode;
use crate::session::{FileContent, RemoteSession};
use crate::types::mime_types;

/// Options for an upload.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Recurse into directories, mirroring the whole tree.
    pub recursive: bool,
    /// Extra metadata merged into the uploaded node's record, applied
    /// after the derived fields so callers can override them. Recursive
    /// children are not affected.
    pub metadata_overrides: Map<String, Value>,
}

/// Result of an upload. Partial progress plus an error message when the
/// transfer stopped early.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Nodes created, in creation order. The local root comes first.
    pub created: Vec<DriveNode>,
    /// Why the upload stopped, if it did.
    pub error: Option<String>,
}

impl UploadOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            created: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Upload a local file or directory into the given parent folder (or the
/// Drive root when `parent` is `None`).
///
/// With `options.recursive` set, a directory's contents are mirrored
/// child by child in name order, stopping at the first failure. Without
/// it, a directory upload creates just the empty remote folder.
pub async fn upload<S: RemoteSession + ?Sized>(
    session: &S,
    local_path: &Path,
    parent: Option<&DriveNode>,
    options: &UploadOptions,
) -> UploadOutcome {
    if let Some(parent) = parent {
        if !parent.is_dir() {
            return UploadOutcome::failed(format!(
                "'{}' is not a folder and cannot receive uploads",
                parent.name
            ));
        }
    }
    upload_inner(
        session,
        local_path.to_path_buf(),
        parent.map(|p| p.id.clone()),
        options.recursive,
        options.metadata_overrides.clone(),
        Vec::new(),
    )
    .await
}

// Overrides apply to this call's own node only; recursive children are
// created from their local entries alone.
fn upload_inner<'a, S: RemoteSession + ?Sized>(
    session: &'a S,
    path: PathBuf,
    parent_id: Option<String>,
    recursive: bool,
    overrides: Map<String, Value>,
    prefix: Vec<String>,
) -> BoxFuture<'a, UploadOutcome> {
    Box::pin(async move {
        if !path.exists() {
            return UploadOutcome::failed(format!(
                "local path {} does not exist",
                path.display()
            ));
        }
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return UploadOutcome::failed(format!(
                    "local path {} has no usable file name",
                    path.display()
                ))
            }
        };
        let is_dir = path.is_dir();

        let mut remote_path = prefix.clone();
        remote_path.push(name.clone());
        info!("Uploading '{}'", remote_path.join("/"));

        // Derived metadata first, caller overrides last.
        let mut metadata = Map::new();
        metadata.insert("name".into(), Value::String(name));
        if let Some(modified) = local_modified_time(&path) {
            metadata.insert("modifiedTime".into(), Value::String(modified));
        }
        if let Some(ref pid) = parent_id {
            metadata.insert(
                "parents".into(),
                Value::Array(vec![Value::String(pid.clone())]),
            );
        }
        if is_dir {
            metadata.insert(
                "mimeType".into(),
                Value::String(mime_types::FOLDER.to_string()),
            );
        }
        for (key, value) in &overrides {
            metadata.insert(key.clone(), value.clone());
        }

        let content = if is_dir {
            None
        } else {
            match std::fs::read(&path) {
                Ok(bytes) => Some(FileContent {
                    mime_type: sniff_content_type(&path),
                    bytes,
                }),
                Err(e) => {
                    return UploadOutcome::failed(format!(
                        "cannot read {}: {e}",
                        path.display()
                    ))
                }
            }
        };

        let record = match session.create_file(&metadata, content).await {
            Ok(record) => record,
            Err(e) => return UploadOutcome::failed(e.to_string()),
        };
        let node = match DriveNode::from_record(&record) {
            Ok(node) => node,
            Err(e) => return UploadOutcome::failed(e.to_string()),
        };
        let mut created = vec![node.clone()];

        if is_dir && recursive {
            let mut entries = match std::fs::read_dir(&path) {
                Ok(iter) => {
                    let mut paths: Vec<PathBuf> = Vec::new();
                    for entry in iter {
                        match entry {
                            Ok(entry) => paths.push(entry.path()),
                            Err(e) => {
                                return UploadOutcome {
                                    created,
                                    error: Some(format!(
                                        "cannot read directory {}: {e}",
                                        path.display()
                                    )),
                                }
                            }
                        }
                    }
                    paths
                }
                Err(e) => {
                    return UploadOutcome {
                        created,
                        error: Some(format!("cannot read directory {}: {e}", path.display())),
                    }
                }
            };
            entries.sort();

            for entry in entries {
                let child = upload_inner(
                    session,
                    entry,
                    Some(node.id.clone()),
                    recursive,
                    Map::new(),
                    remote_path.clone(),
                )
                .await;
                created.extend(child.created);
                if let Some(error) = child.error {
                    warn!("Upload stopped under '{}': {}", remote_path.join("/"), error);
                    return UploadOutcome {
                        created,
                        error: Some(error),
                    };
                }
            }
        }

        UploadOutcome {
            created,
            error: None,
        }
    })
}

/// Guess a file's content type from its extension, falling back to the
/// generic byte-stream type.
pub fn sniff_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Local mtime rendered the way the Drive API expects: UTC with
/// microsecond precision and a trailing `Z`.
fn local_modified_time(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(format_timestamp(modified))
}

fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
