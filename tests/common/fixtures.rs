//! Audio fixtures and a downloader wired to the real store and tagger

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use trackfetch::error::AcquireResult;
use trackfetch::{
    AcquireError, AcquiredAudio, AudioAcquirer, Config, Database, LoftyTagger, TrackDownloader,
    TrackMetadata,
};

/// Ten silent MPEG-1 Layer III frames (128 kbit/s, 44.1 kHz)
pub fn silent_mp3() -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    frame.repeat(10)
}

/// Acquirer that "downloads" the silent MP3 and reports canned metadata
///
/// Queries starting with `missing:` fail with [`AcquireError::NotFound`].
#[derive(Default)]
pub struct SilentAcquirer {
    pub metadata: TrackMetadata,
    pub calls: AtomicUsize,
}

impl SilentAcquirer {
    pub fn reporting(artist: &str, title: &str, album: &str) -> Self {
        Self {
            metadata: TrackMetadata {
                artist: Some(artist.to_string()),
                title: Some(title.to_string()),
                album: Some(album.to_string()),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioAcquirer for SilentAcquirer {
    async fn acquire(&self, query: &str, dest_dir: &Path) -> AcquireResult<AcquiredAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(rest) = query.strip_prefix("missing:") {
            return Err(AcquireError::NotFound {
                query: rest.to_string(),
            });
        }

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(format!("{}.mp3", trackfetch::utils::temp_stem(query)));
        tokio::fs::write(&path, silent_mp3()).await?;

        Ok(AcquiredAudio {
            path,
            metadata: self.metadata.clone(),
        })
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// Config rooted in `dir`
pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("trackfetch.db");
    config.download.download_dir = dir.join("library");
    config.download.temp_dir = dir.join("temp");
    config.download.max_concurrent_downloads = 2;
    config
}

/// Downloader on a real SQLite file and the lofty tagger
///
/// Keep the returned [`TempDir`] alive for the whole test.
pub struct Harness {
    pub downloader: TrackDownloader,
    pub database: Arc<Database>,
    pub acquirer: Arc<SilentAcquirer>,
    pub config: Config,
    pub dir: TempDir,
}

pub async fn harness(acquirer: SilentAcquirer) -> Harness {
    harness_with(acquirer, |_| {}).await
}

pub async fn harness_with(acquirer: SilentAcquirer, configure: impl FnOnce(&mut Config)) -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut config = config_in(dir.path());
    configure(&mut config);

    let database = Arc::new(
        Database::new(&config.persistence.database_path)
            .await
            .expect("open database"),
    );
    let acquirer = Arc::new(acquirer);
    let tagger = Arc::new(LoftyTagger::new(config.cover_art.clone()));

    let downloader =
        TrackDownloader::with_components(config.clone(), database.clone(), acquirer.clone(), tagger)
            .expect("build downloader");

    Harness {
        downloader,
        database,
        acquirer,
        config,
        dir,
    }
}
