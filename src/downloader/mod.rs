//! Core downloader implementation split into focused submodules.
//!
//! The `TrackDownloader` struct and its methods are organized by concern:
//! - [`queue`] - Submission, dedup gate and status polling
//! - [`workers`] - The fixed worker pool draining the job queue
//! - [`job_task`] - The per-job pipeline (check, acquire, tag, publish, record)
//! - [`lifecycle`] - Startup and shutdown coordination

mod job_task;
mod lifecycle;
mod queue;
mod workers;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::acquire::{self, AudioAcquirer};
use crate::config::Config;
use crate::db::{Database, DownloadStore};
use crate::error::{Error, Result};
use crate::publisher::Publisher;
use crate::registry::ActiveJobRegistry;
use crate::tagging::{LoftyTagger, MetadataTagger};
use crate::types::{DownloadJob, Event};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Job queue state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Producer side of the FIFO job queue (unbounded; the registry enforces any bound)
    pub(crate) tx: mpsc::UnboundedSender<DownloadJob>,
    /// Consumer side, shared by all workers
    pub(crate) rx: Arc<Mutex<mpsc::UnboundedReceiver<DownloadJob>>>,
    /// Flag to indicate whether new submissions are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Pipeline collaborators a worker runs each job through
#[derive(Clone)]
pub(crate) struct ProcessingPipeline {
    pub(crate) acquirer: Arc<dyn AudioAcquirer>,
    pub(crate) tagger: Arc<dyn MetadataTagger>,
    pub(crate) publisher: Publisher,
}

/// Worker pool bookkeeping
#[derive(Clone)]
pub(crate) struct WorkerPool {
    /// Wakes idle workers on shutdown; never interrupts a job in progress
    pub(crate) cancel: CancellationToken,
    pub(crate) handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    pub(crate) started: Arc<AtomicBool>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the active job registry, the job queue and the worker pool. The
/// REST API and any status broadcaster share one instance through clones.
#[derive(Clone)]
pub struct TrackDownloader {
    /// Persistence gateway used for the idempotency check and completion records
    pub(crate) store: Arc<dyn DownloadStore>,
    /// Queued and in-flight jobs
    pub(crate) registry: ActiveJobRegistry,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    pub(crate) queue_state: QueueState,
    pub(crate) processing: ProcessingPipeline,
    pub(crate) workers: WorkerPool,
}

impl TrackDownloader {
    /// Create a new TrackDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Creates the download and temp directories
    /// - Opens/creates the SQLite database and runs migrations
    /// - Picks the audio acquirer (`yt-dlp` if available)
    ///
    /// Workers are not running until [`start`](Self::start) is called.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        for (dir, what) in [
            (config.download_dir(), "download"),
            (config.temp_dir(), "temp"),
        ] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        what,
                        dir.display(),
                        e
                    ),
                ))
            })?;
        }

        let db = Database::new(&config.persistence.database_path).await?;
        let acquirer = acquire::acquirer_from_config(&config.tools);
        let tagger = Arc::new(LoftyTagger::new(config.cover_art.clone()));

        Self::with_components(config, Arc::new(db), acquirer, tagger)
    }

    /// Assemble a downloader from explicit collaborators
    ///
    /// Use this to plug in another persistence gateway, acquirer or tagger.
    /// Directories are not created here; the acquirer and publisher create
    /// what they need.
    pub fn with_components(
        config: Config,
        store: Arc<dyn DownloadStore>,
        acquirer: Arc<dyn AudioAcquirer>,
        tagger: Arc<dyn MetadataTagger>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::unbounded_channel();

        tracing::info!(
            acquirer = acquirer.name(),
            workers = config.download.max_concurrent_downloads,
            max_queued_jobs = ?config.download.max_queued_jobs,
            "Downloader initialized"
        );

        let publisher = Publisher::new(config.download_dir().clone());

        Ok(Self {
            store,
            registry: ActiveJobRegistry::new(),
            event_tx,
            config: Arc::new(config),
            queue_state: QueueState {
                tx,
                rx: Arc::new(Mutex::new(rx)),
                accepting_new: Arc::new(AtomicBool::new(true)),
            },
            processing: ProcessingPipeline {
                acquirer,
                tagger,
                publisher,
            },
            workers: WorkerPool {
                cancel: CancellationToken::new(),
                handles: Arc::new(Mutex::new(Vec::new())),
                started: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use trackfetch::{Config, TrackDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = TrackDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The persistence gateway this downloader records into
    pub fn store(&self) -> &Arc<dyn DownloadStore> {
        &self.store
    }

    /// The registry of queued and in-flight jobs
    pub fn registry(&self) -> &ActiveJobRegistry {
        &self.registry
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:8000).
    pub fn spawn_api_server(&self) -> JoinHandle<Result<()>> {
        let downloader = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
