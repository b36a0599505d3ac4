//! Metadata tagging
//!
//! Rewrites the tags of an acquired file to the effective metadata and embeds
//! cover art. Fetching the cover is a separate, best-effort step so the
//! pipeline can report a failed fetch and carry on without it.
//!
//! - [`LoftyTagger`]: fetches covers over HTTP and writes tags with `lofty`
//! - [`MetadataTagger`]: the seam the pipeline depends on

mod cover;
mod lofty_tagger;

pub use cover::CoverFetcher;
pub use lofty_tagger::LoftyTagger;

use crate::error::{CoverArtResult, TagResult};
use crate::types::ResolvedMetadata;
use async_trait::async_trait;
use std::path::Path;

/// Image bytes fetched for embedding as the front cover
#[derive(Clone, PartialEq, Eq)]
pub struct CoverArt {
    data: Vec<u8>,
}

impl CoverArt {
    /// Wrap already validated image bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Raw image bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for CoverArt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverArt")
            .field("len", &self.data.len())
            .finish()
    }
}

/// Writes track metadata into an audio file
#[async_trait]
pub trait MetadataTagger: Send + Sync {
    /// Fetch cover art from `url`
    ///
    /// Failures here are never fatal to a job.
    async fn fetch_cover(&self, url: &str) -> CoverArtResult<CoverArt>;

    /// Replace the tags of `path` with `metadata`
    ///
    /// Every existing tag item is dropped except embedded pictures. When
    /// `cover` is given it replaces any embedded picture as the front cover.
    async fn write_tags(
        &self,
        path: &Path,
        metadata: &ResolvedMetadata,
        cover: Option<CoverArt>,
    ) -> TagResult<()>;
}
