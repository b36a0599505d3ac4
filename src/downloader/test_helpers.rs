//! Shared test helpers for creating TrackDownloader instances in tests.

use crate::acquire::{AcquiredAudio, AudioAcquirer};
use crate::config::Config;
use crate::db::{DownloadRecord, DownloadStore, RecordStatus, TrackRecord};
use crate::downloader::TrackDownloader;
use crate::error::{AcquireError, AcquireResult, CoverArtError, CoverArtResult, DatabaseError, Error, Result, TagError, TagResult};
use crate::tagging::{CoverArt, MetadataTagger};
use crate::types::{Event, ResolvedMetadata, TrackMetadata};
use crate::utils::temp_stem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Semaphore, broadcast};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory persistence gateway
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) completed: Mutex<HashMap<String, TrackRecord>>,
    pub(crate) pending: Mutex<Vec<TrackRecord>>,
    pub(crate) record_calls: AtomicUsize,
    pub(crate) fail_check: AtomicBool,
    pub(crate) decline_record: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn mark_completed(&self, query: &str) {
        self.completed
            .lock()
            .unwrap()
            .insert(query.to_string(), TrackRecord::new(query));
    }

    pub(crate) fn add_pending(&self, record: TrackRecord) {
        self.pending.lock().unwrap().push(record);
    }

    pub(crate) fn completed_record(&self, query: &str) -> Option<TrackRecord> {
        self.completed.lock().unwrap().get(query).cloned()
    }

    pub(crate) fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    fn to_download_record(id: usize, record: &TrackRecord, status: RecordStatus) -> DownloadRecord {
        DownloadRecord {
            id: id as i64,
            query: record.query.clone(),
            artist: record.artist.clone(),
            title: record.title.clone(),
            album: record.album.clone(),
            image_url: record.image_url.clone(),
            status: status.as_str().to_string(),
            created_at: 0,
        }
    }
}

#[async_trait]
impl DownloadStore for MemoryStore {
    async fn is_downloaded(&self, query: &str) -> Result<bool> {
        if self.fail_check.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "database is locked".to_string(),
            )));
        }
        Ok(self.completed.lock().unwrap().contains_key(query))
    }

    async fn record_completed(&self, record: &TrackRecord) -> Result<bool> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        if self.decline_record.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.completed
            .lock()
            .unwrap()
            .insert(record.query.clone(), record.clone());
        self.pending
            .lock()
            .unwrap()
            .retain(|r| r.query != record.query);
        Ok(true)
    }

    async fn list_pending(&self) -> Result<Vec<DownloadRecord>> {
        Ok(self
            .pending
            .lock()
            .unwrap()
            .iter()
            .enumerate()
            .map(|(i, r)| Self::to_download_record(i + 1, r, RecordStatus::Pending))
            .collect())
    }

    async fn list_records(
        &self,
        page: u32,
        limit: u32,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<Vec<DownloadRecord>> {
        let offset = (page.max(1) - 1) as usize * limit as usize;
        Ok(self
            .matching(status, search)
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn count_records(
        &self,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<u64> {
        Ok(self.matching(status, search).len() as u64)
    }
}

impl MemoryStore {
    /// Completed records by query, then pending ones, filtered like the SQL store
    fn matching(&self, status: Option<RecordStatus>, search: Option<&str>) -> Vec<DownloadRecord> {
        let mut all: Vec<DownloadRecord> = Vec::new();
        if status != Some(RecordStatus::Pending) {
            let completed = self.completed.lock().unwrap();
            let mut queries: Vec<&String> = completed.keys().collect();
            queries.sort();
            for (i, q) in queries.into_iter().enumerate() {
                all.push(Self::to_download_record(i + 1, &completed[q], RecordStatus::Completed));
            }
        }
        if status != Some(RecordStatus::Completed) {
            let pending = self.pending.lock().unwrap();
            all.extend(
                pending
                    .iter()
                    .enumerate()
                    .map(|(i, r)| Self::to_download_record(i + 1, r, RecordStatus::Pending)),
            );
        }

        let term = search
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        match term {
            Some(term) => all
                .into_iter()
                .filter(|r| {
                    [&r.title, &r.artist, &r.album]
                        .into_iter()
                        .flatten()
                        .any(|v| v.to_lowercase().contains(&term))
                })
                .collect(),
            None => all,
        }
    }
}

/// Acquirer that writes a fixed payload and reports fixed metadata
///
/// With a gate, every acquisition waits for a permit before finishing, which
/// lets tests hold jobs in `Downloading`.
pub(crate) struct ScriptedAcquirer {
    pub(crate) metadata: TrackMetadata,
    pub(crate) payload: Vec<u8>,
    pub(crate) fail_with: Option<String>,
    pub(crate) panics: bool,
    pub(crate) gate: Option<Arc<Semaphore>>,
    pub(crate) calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl Default for ScriptedAcquirer {
    fn default() -> Self {
        Self {
            metadata: TrackMetadata {
                artist: Some("Muse".to_string()),
                title: Some("Uprising (Official Video)".to_string()),
                album: Some("The Resistance".to_string()),
            },
            payload: b"audio".to_vec(),
            fail_with: None,
            panics: false,
            gate: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

impl ScriptedAcquirer {
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Acquirer that panics mid-acquisition, like a buggy plugged-in source
    pub(crate) fn panicking() -> Self {
        Self {
            panics: true,
            ..Default::default()
        }
    }

    /// Acquirer whose calls block until the returned semaphore gets permits
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let acquirer = Self {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        (acquirer, gate)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioAcquirer for ScriptedAcquirer {
    async fn acquire(&self, query: &str, dest_dir: &Path) -> AcquireResult<AcquiredAudio> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.panics {
            panic!("scripted acquirer blew up on {query}");
        }

        let result = async {
            if let Some(message) = &self.fail_with {
                return Err(AcquireError::Tool {
                    tool: "scripted".to_string(),
                    message: message.clone(),
                });
            }
            tokio::fs::create_dir_all(dest_dir).await?;
            let path = dest_dir.join(format!("{}.mp3", temp_stem(query)));
            tokio::fs::write(&path, &self.payload).await?;
            Ok::<_, AcquireError>(AcquiredAudio {
                path,
                metadata: self.metadata.clone(),
            })
        }
        .await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A recorded `write_tags` call
#[derive(Debug, Clone)]
pub(crate) struct TagCall {
    pub(crate) path: PathBuf,
    pub(crate) metadata: ResolvedMetadata,
    pub(crate) cover: Option<CoverArt>,
}

/// Tagger that records calls and leaves files untouched
///
/// With a gate, `write_tags` waits for a permit, which holds a job between
/// acquisition and publishing.
#[derive(Default)]
pub(crate) struct RecordingTagger {
    pub(crate) cover: Option<Vec<u8>>,
    pub(crate) fail_tagging: bool,
    pub(crate) gate: Option<Arc<Semaphore>>,
    pub(crate) calls: Mutex<Vec<TagCall>>,
    pub(crate) cover_requests: Mutex<Vec<String>>,
}

impl RecordingTagger {
    pub(crate) fn with_cover(bytes: &[u8]) -> Self {
        Self {
            cover: Some(bytes.to_vec()),
            ..Default::default()
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_tagging: true,
            ..Default::default()
        }
    }

    /// Tagger whose `write_tags` blocks until the returned semaphore gets permits
    pub(crate) fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let tagger = Self {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        (tagger, gate)
    }

    pub(crate) fn calls(&self) -> Vec<TagCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataTagger for RecordingTagger {
    async fn fetch_cover(&self, url: &str) -> CoverArtResult<CoverArt> {
        self.cover_requests.lock().unwrap().push(url.to_string());
        match &self.cover {
            Some(bytes) => Ok(CoverArt::new(bytes.clone())),
            None => Err(CoverArtError::Status { status: 404 }),
        }
    }

    async fn write_tags(
        &self,
        path: &Path,
        metadata: &ResolvedMetadata,
        cover: Option<CoverArt>,
    ) -> TagResult<()> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.calls.lock().unwrap().push(TagCall {
            path: path.to_path_buf(),
            metadata: metadata.clone(),
            cover,
        });
        if self.fail_tagging {
            return Err(TagError::Write {
                path: path.to_path_buf(),
                reason: "read-only file system".to_string(),
            });
        }
        Ok(())
    }
}

/// Downloader wired to in-memory collaborators inside a temp dir
pub(crate) struct TestDownloader {
    pub(crate) downloader: TrackDownloader,
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) acquirer: Arc<ScriptedAcquirer>,
    pub(crate) tagger: Arc<RecordingTagger>,
    pub(crate) dir: TempDir,
}

/// Config rooted in `dir` with the default three workers
pub(crate) fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.database_path = dir.join("test.db");
    config.download.download_dir = dir.join("downloads");
    config.download.temp_dir = dir.join("temp");
    config.download.max_concurrent_downloads = 3;
    config
}

pub(crate) fn create_test_downloader() -> TestDownloader {
    create_test_downloader_with(ScriptedAcquirer::default(), RecordingTagger::default(), |_| {})
}

pub(crate) fn create_test_downloader_with(
    acquirer: ScriptedAcquirer,
    tagger: RecordingTagger,
    configure: impl FnOnce(&mut Config),
) -> TestDownloader {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    configure(&mut config);

    let store = Arc::new(MemoryStore::default());
    let acquirer = Arc::new(acquirer);
    let tagger = Arc::new(tagger);

    let downloader = TrackDownloader::with_components(
        config,
        store.clone(),
        acquirer.clone(),
        tagger.clone(),
    )
    .unwrap();

    TestDownloader {
        downloader,
        store,
        acquirer,
        tagger,
        dir,
    }
}

/// Receive events until one matches, failing the test after a timeout
pub(crate) async fn next_matching(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> Event {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.expect("event channel closed or lagged");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Poll `condition` until it holds, failing the test after a timeout
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Whether `event` is the terminal event for `query`
pub(crate) fn is_terminal_for(event: &Event, query: &str) -> bool {
    match event {
        Event::Completed { query: q, .. }
        | Event::Skipped { query: q, .. }
        | Event::Failed { query: q, .. } => q == query,
        _ => false,
    }
}
