//! Startup and shutdown coordination.

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Event;

use super::TrackDownloader;

/// How long shutdown waits for busy workers to finish their current job
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl TrackDownloader {
    /// Start the worker pool
    ///
    /// Spawns `max_concurrent_downloads` workers. Calling it again is a
    /// no-op; calling it after [`shutdown`](Self::shutdown) fails with
    /// [`Error::ShuttingDown`].
    pub async fn start(&self) -> Result<()> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        if self.workers.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Worker pool already started");
            return Ok(());
        }

        let count = self.config.download.max_concurrent_downloads;
        let mut handles = self.workers.handles.lock().await;
        for worker_id in 0..count {
            handles.push(self.spawn_worker(worker_id));
        }

        tracing::info!(workers = count, "Worker pool started");
        Ok(())
    }

    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Wakes idle workers so they exit
    /// 3. Waits for busy workers to finish their current job, up to 30 seconds
    /// 4. Evicts jobs that never reached a worker
    /// 5. Emits [`Event::Shutdown`]
    ///
    /// Jobs are never interrupted mid-pipeline.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new submissions
        self.queue_state.accepting_new.store(false, Ordering::SeqCst);

        // 2. Wake idle workers
        self.workers.cancel.cancel();

        // 3. Wait for busy workers
        let handles = std::mem::take(&mut *self.workers.handles.lock().await);
        let worker_count = handles.len();
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "Worker task ended abnormally");
                    }
                }
                tracing::info!(workers = worker_count, "All workers stopped");
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
                    "Timeout waiting for workers to finish, proceeding with shutdown"
                );
            }
        }

        // 4. Evict queued jobs and empty the channel
        let dropped = self.registry.drain_queued();
        {
            let mut rx = self.queue_state.rx.lock().await;
            while rx.try_recv().is_ok() {}
        }
        if !dropped.is_empty() {
            tracing::info!(count = dropped.len(), "Dropped queued jobs that never started");
        }

        // 5. Emit shutdown event
        self.emit_event(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.queue_state.accepting_new.load(Ordering::SeqCst)
    }
}
