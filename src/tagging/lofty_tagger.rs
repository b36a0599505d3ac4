//! Tag rewriting backed by `lofty`

use super::{CoverArt, CoverFetcher, MetadataTagger};
use crate::config::CoverArtConfig;
use crate::error::{CoverArtError, CoverArtResult, TagError, TagResult};
use crate::types::ResolvedMetadata;
use async_trait::async_trait;
use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{Tag, TagExt, TagType};
use std::path::{Path, PathBuf};

/// Tagger that downloads covers with [`CoverFetcher`] and writes tags with `lofty`
#[derive(Debug, Clone)]
pub struct LoftyTagger {
    fetcher: CoverFetcher,
}

impl LoftyTagger {
    /// Create a tagger with the given cover-art limits
    pub fn new(config: CoverArtConfig) -> Self {
        Self {
            fetcher: CoverFetcher::new(config),
        }
    }
}

impl Default for LoftyTagger {
    fn default() -> Self {
        Self::new(CoverArtConfig::default())
    }
}

/// Build a front-cover picture, or `None` if the bytes are not a known image format
fn front_cover(cover: &CoverArt) -> Option<Picture> {
    let mut reader = cover.data();
    let mut picture = Picture::from_reader(&mut reader).ok()?;
    picture.set_pic_type(PictureType::CoverFront);
    Some(picture)
}

fn rewrite_tags(
    path: &Path,
    metadata: &ResolvedMetadata,
    cover: Option<&CoverArt>,
) -> TagResult<()> {
    let read_error = |e: lofty::error::LoftyError| TagError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let write_error = |e: lofty::error::LoftyError| TagError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let tagged_file = read_from_path(path).map_err(read_error)?;
    let primary_type = tagged_file.primary_tag_type();
    let existing_types: Vec<TagType> = tagged_file.tags().iter().map(|t| t.tag_type()).collect();

    // Pictures are the only items carried over from the old tags
    let mut kept_pictures: Vec<Picture> = Vec::new();
    for picture in tagged_file.tags().iter().flat_map(|t| t.pictures()) {
        if !kept_pictures.iter().any(|p| p.data() == picture.data()) {
            kept_pictures.push(picture.clone());
        }
    }
    drop(tagged_file);

    let mut tag = Tag::new(primary_type);
    tag.set_title(metadata.title.clone());
    tag.set_artist(metadata.artist.clone());
    tag.set_album(metadata.album.clone());

    match cover.and_then(front_cover) {
        Some(picture) => tag.push_picture(picture),
        None => {
            if cover.is_some() {
                tracing::warn!(path = %path.display(), "Cover art is not a recognized image, keeping existing artwork");
            }
            for picture in kept_pictures {
                tag.push_picture(picture);
            }
        }
    }

    for tag_type in existing_types {
        tag_type.remove_from_path(path).map_err(write_error)?;
    }
    tag.save_to_path(path, WriteOptions::default())
        .map_err(write_error)?;

    Ok(())
}

#[async_trait]
impl MetadataTagger for LoftyTagger {
    async fn fetch_cover(&self, url: &str) -> CoverArtResult<CoverArt> {
        let cover = self.fetcher.fetch(url).await?;
        if front_cover(&cover).is_none() {
            return Err(CoverArtError::Unusable(
                "response is not a recognized image format".to_string(),
            ));
        }
        Ok(cover)
    }

    async fn write_tags(
        &self,
        path: &Path,
        metadata: &ResolvedMetadata,
        cover: Option<CoverArt>,
    ) -> TagResult<()> {
        let path: PathBuf = path.to_path_buf();
        let metadata = metadata.clone();

        tokio::task::spawn_blocking(move || rewrite_tags(&path, &metadata, cover.as_ref()))
            .await
            .map_err(|e| TagError::Aborted(e.to_string()))?
    }
}
