//! Download operations: single files and whole folder trees.
//!
//! A tree download mirrors the remote folder under a local directory. Each
//! child is attempted independently; one bad file never stops its siblings,
//! and the failures come back keyed by node id.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use log::{debug, info, warn};

use crate::lookup;
use crate::nodes::DriveNode;
use crate::session::RemoteSession;
use crate::types::{DriveError, DriveResult};

/// Where downloaded bytes go.
pub enum DownloadSink<'a> {
    /// Create (or truncate) a file at this path. The file is opened and
    /// closed by the download.
    Path(PathBuf),
    /// Write into a caller-owned writer. The writer is flushed but stays
    /// open; closing it is the caller's business.
    Writer(&'a mut (dyn Write + Send)),
}

impl<'a> DownloadSink<'a> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn writer(writer: &'a mut (dyn Write + Send)) -> Self {
        Self::Writer(writer)
    }
}

/// Outcome of a tree download.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransferReport {
    /// Failure message per node id, for every node that could not be
    /// transferred.
    pub errors: BTreeMap<String, String>,
}

impl TransferReport {
    /// True when every node transferred.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    fn merge(&mut self, other: TransferReport) {
        self.errors.extend(other.errors);
    }
}

/// Download a file's content into the given sink.
pub async fn download<S: RemoteSession + ?Sized>(
    session: &S,
    file: &DriveNode,
    sink: DownloadSink<'_>,
) -> DriveResult<()> {
    if file.is_dir() {
        return Err(DriveError::invalid(format!(
            "'{}' is a folder; use download_folder",
            file.name
        )));
    }

    match sink {
        DownloadSink::Path(path) => {
            let mut out = std::fs::File::create(&path)
                .map_err(|e| DriveError::io(format!("Cannot create {}: {e}", path.display())))?;
            stream_to(session, file, &mut out).await
        }
        DownloadSink::Writer(writer) => stream_to(session, file, writer).await,
    }
}

async fn stream_to<S: RemoteSession + ?Sized>(
    session: &S,
    file: &DriveNode,
    writer: &mut (dyn Write + Send),
) -> DriveResult<()> {
    let mut body = session.get_file_content(&file.id).await?;

    while let Some(chunk) = body.next_chunk().await? {
        writer
            .write_all(&chunk)
            .map_err(|e| DriveError::io(format!("Write failed for '{}': {e}", file.name)))?;

        let percent = (body.progress() * 100.0).floor() as u32;
        info!("Downloading '{}': {}%", file.name, percent);
    }
    writer
        .flush()
        .map_err(|e| DriveError::io(format!("Flush failed for '{}': {e}", file.name)))?;

    debug!("Downloaded '{}' ({} bytes)", file.name, body.received());
    Ok(())
}

/// Mirror a remote folder's contents under `output`, creating `output`
/// itself if needed. Each child lands at `output/<child.name>`.
///
/// Per-child failures land in the report's error map; the `Err` arm is
/// reserved for failures that sink the whole subtree, such as being unable
/// to create the local directory or list the folder at all.
pub async fn download_folder<S: RemoteSession + ?Sized>(
    session: &S,
    folder: &DriveNode,
    output: &Path,
) -> DriveResult<TransferReport> {
    if !folder.is_dir() {
        return Err(DriveError::invalid(format!(
            "'{}' is not a folder; use download",
            folder.name
        )));
    }
    download_folder_inner(session, folder.clone(), output.to_path_buf()).await
}

fn download_folder_inner<'a, S: RemoteSession + ?Sized>(
    session: &'a S,
    folder: DriveNode,
    dir: PathBuf,
) -> BoxFuture<'a, DriveResult<TransferReport>> {
    Box::pin(async move {
        std::fs::create_dir_all(&dir)
            .map_err(|e| DriveError::io(format!("Cannot create {}: {e}", dir.display())))?;

        let children = lookup::list_children(session, &folder).await?;
        let mut report = TransferReport::default();

        for child in children {
            let target = dir.join(&child.name);
            let outcome = if child.is_dir() {
                match download_folder_inner(session, child.clone(), target).await {
                    Ok(sub) => {
                        report.merge(sub);
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            } else {
                download(session, &child, DownloadSink::Path(target)).await
            };

            if let Err(e) = outcome {
                warn!("Skipping '{}' ({}): {}", child.name, child.id, e);
                report.errors.insert(child.id.clone(), e.to_string());
            }
        }

        Ok(report)
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
