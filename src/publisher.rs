//! Moves tagged files into the library
//!
//! The library layout is `<root>/<artist>/<album>/<title>.mp3`, each segment
//! passed through [`sanitize`]. The records listing rebuilds the same path for
//! its audio URLs, so it must not change shape.

use crate::error::{PublishError, PublishResult};
use crate::types::ResolvedMetadata;
use crate::utils::sanitize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Canonical library location for a track
pub fn canonical_path(root: &Path, metadata: &ResolvedMetadata) -> PathBuf {
    root.join(sanitize(metadata.artist.as_str()))
        .join(sanitize(metadata.album.as_str()))
        .join(format!("{}.mp3", sanitize(metadata.title.as_str())))
}

/// Places tagged files at their canonical path under a library root
#[derive(Debug, Clone)]
pub struct Publisher {
    root: PathBuf,
}

impl Publisher {
    /// Publisher rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Library root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move `temp_file` to its canonical path and return that path
    ///
    /// A file already at the destination is replaced: the idempotency check
    /// has passed, so it can only be a leftover from an interrupted run. The
    /// move is a rename, which is atomic on the same filesystem; across
    /// filesystems it falls back to copy and delete.
    pub async fn publish(
        &self,
        temp_file: &Path,
        metadata: &ResolvedMetadata,
    ) -> PublishResult<PathBuf> {
        let destination = canonical_path(&self.root, metadata);

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PublishError::CreateDir {
                    path: parent.to_path_buf(),
                    reason: e.to_string(),
                })?;
        }

        match fs::remove_file(&destination).await {
            Ok(()) => debug!(?destination, "replacing existing file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PublishError::Replace {
                    path: destination,
                    reason: e.to_string(),
                });
            }
        }

        debug!(?temp_file, ?destination, "moving tagged file");

        let move_failed = |reason: String| PublishError::MoveFailed {
            source_path: temp_file.to_path_buf(),
            dest_path: destination.clone(),
            reason,
        };

        match fs::rename(temp_file, &destination).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                fs::copy(temp_file, &destination)
                    .await
                    .map_err(|e| move_failed(e.to_string()))?;
                fs::remove_file(temp_file)
                    .await
                    .map_err(|e| move_failed(format!("copied but could not remove source: {e}")))?;
            }
            Err(e) => return Err(move_failed(e.to_string())),
        }

        info!(?destination, "published track");
        Ok(destination)
    }
}
