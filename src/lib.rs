//! # trackfetch
//!
//! Backend library for a music downloader: submit a track query, and a pool
//! of workers searches for it, downloads the audio, rewrites its tags, embeds
//! cover art and files it under `<download_dir>/<artist>/<album>/<title>.mp3`.
//!
//! - **Deduplicated** - a query that is already queued or downloading is skipped,
//!   and one that is already recorded as completed is never fetched again
//! - **Bounded** - at most `max_concurrent_downloads` jobs run at once
//! - **Event-driven** - consumers subscribe to lifecycle events
//! - **Pluggable** - the acquirer, the tagger and the store are traits
//!
//! ## Quick Start
//!
//! ```no_run
//! use trackfetch::{Config, DownloadRequest, TrackDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = TrackDownloader::new(Config::default()).await?;
//!     downloader.start().await?;
//!
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     downloader.queue_download(DownloadRequest::new("Muse - Uprising"))?;
//!
//!     trackfetch::run_with_shutdown(downloader).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Audio acquisition (search + download)
pub mod acquire;
/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Moving tagged files into the library
pub mod publisher;
/// In-memory registry of queued and in-flight jobs
pub mod registry;
/// Tag rewriting and cover art
pub mod tagging;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use acquire::{AcquiredAudio, AudioAcquirer, UnavailableAcquirer, YtDlpAcquirer};
pub use config::{
    ApiConfig, Config, CoverArtConfig, DownloadConfig, PersistenceConfig, ToolsConfig,
};
pub use db::{Database, DownloadRecord, DownloadStore, RecordStatus, TrackRecord};
pub use downloader::TrackDownloader;
pub use error::{
    AcquireError, ApiError, CoverArtError, DatabaseError, Error, ErrorDetail, PublishError,
    Result, TagError, ToHttpStatus,
};
pub use registry::ActiveJobRegistry;
pub use tagging::{CoverArt, LoftyTagger, MetadataTagger};
pub use types::{
    DownloadRequest, Event, JobStatus, JobView, QueueOutcome, SkipReason, Stage,
    SubmissionStatus, TrackMetadata,
};

/// Run the downloader until a termination signal arrives, then shut it down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use trackfetch::{Config, TrackDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = TrackDownloader::new(Config::default()).await?;
///     downloader.start().await?;
///     let _api = downloader.spawn_api_server();
///
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: TrackDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(term), Err(int)) => {
            tracing::error!(sigterm = %term, sigint = %int, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
