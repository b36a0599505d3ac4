//! Submission and status polling.

use std::sync::atomic::Ordering;

use crate::error::{Error, Result};
use crate::registry::AddOutcome;
use crate::types::{DownloadJob, DownloadRequest, Event, JobView, QueueOutcome, SubmissionStatus};

use super::TrackDownloader;

impl TrackDownloader {
    /// Submit a track for download
    ///
    /// Returns as soon as the job is queued; the caller never waits for the
    /// download itself. A query that is already queued or downloading is not
    /// queued again and yields [`SubmissionStatus::Skipped`].
    ///
    /// Surrounding whitespace is trimmed from the query before it is used as
    /// the identity key.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for an empty query
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    /// - [`Error::QueueFull`] when `max_queued_jobs` is set and reached
    pub fn queue_download(&self, mut request: DownloadRequest) -> Result<QueueOutcome> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let trimmed = request.query.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".to_string()));
        }
        if trimmed.len() != request.query.len() {
            request.query = trimmed.to_string();
        }

        let job = DownloadJob::new(request);
        let query = job.query().to_string();

        match self
            .registry
            .try_add(job.clone(), self.config.download.max_queued_jobs)
        {
            AddOutcome::Accepted => {}
            AddOutcome::Duplicate => {
                tracing::debug!(query = %query, "Already queued or downloading, skipping");
                return Ok(QueueOutcome::skipped(query));
            }
            AddOutcome::Full { limit } => {
                tracing::warn!(query = %query, limit, "Queue full, rejecting submission");
                return Err(Error::QueueFull { limit });
            }
        }

        self.emit_event(Event::Queued {
            query: query.clone(),
        });

        if self.queue_state.tx.send(job).is_err() {
            // Receiver is owned by self, so this only happens while tearing down
            self.registry.remove(&query);
            return Err(Error::ShuttingDown);
        }

        tracing::info!(query = %query, "Queued download");
        Ok(QueueOutcome::queued(query))
    }

    /// Queue every persisted record that is still pending
    ///
    /// Records go through the same dedup gate as [`queue_download`](Self::queue_download).
    /// Returns how many were newly queued. Stops early, without error, when
    /// the queue bound is reached.
    pub async fn queue_pending(&self) -> Result<usize> {
        let pending = self.store.list_pending().await?;
        let total = pending.len();
        let mut accepted = 0;

        for record in pending {
            let request = DownloadRequest {
                query: record.query,
                artist: record.artist,
                title: record.title,
                album: record.album,
                image_url: record.image_url,
            };

            match self.queue_download(request) {
                Ok(outcome) if outcome.status == SubmissionStatus::Queued => accepted += 1,
                Ok(_) => {}
                Err(Error::InvalidRequest(reason)) => {
                    tracing::warn!(record_id = record.id, reason = %reason, "Skipping unusable pending record");
                }
                Err(Error::QueueFull { limit }) => {
                    tracing::warn!(limit, accepted, total, "Queue full, leaving remaining pending records");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(accepted, total, "Queued pending records");
        Ok(accepted)
    }

    /// Point-in-time snapshot of queued and in-flight jobs
    ///
    /// Safe to iterate while workers keep running. Jobs that just reached a
    /// terminal status may briefly appear before they are evicted.
    pub fn get_active_downloads(&self) -> Vec<JobView> {
        self.registry.snapshot()
    }
}
