//! Traits and types for audio acquisition

use crate::error::AcquireResult;
use crate::types::TrackMetadata;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Raw audio fetched for a query
#[must_use]
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    /// Temp file holding the MP3 audio
    pub path: PathBuf,
    /// Best-effort metadata reported by the source
    pub metadata: TrackMetadata,
}

/// Fetches raw audio for a search query
///
/// Implementations write into `dest_dir` and must only ever touch the file
/// they return, so concurrent acquisitions of different queries never
/// collide.
#[async_trait]
pub trait AudioAcquirer: Send + Sync {
    /// Search for `query` and download its audio into `dest_dir`
    async fn acquire(&self, query: &str, dest_dir: &Path) -> AcquireResult<AcquiredAudio>;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}
