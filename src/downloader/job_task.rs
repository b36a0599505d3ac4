//! Per-job pipeline: idempotency re-check, acquire, tag, publish, record.
//!
//! Each step returns its own result type; [`TrackDownloader::process_job`]
//! folds them into a single [`JobOutcome`] that the worker turns into the
//! terminal status.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::db::TrackRecord;
use crate::tagging::CoverArt;
use crate::types::{DownloadJob, Event, JobStatus, ResolvedMetadata, SkipReason, Stage};

use super::TrackDownloader;

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    /// Published at the given path and recorded
    Completed(PathBuf),
    /// Nothing to do
    Skipped(SkipReason),
    /// A step failed
    Failed {
        /// Step that failed
        stage: Stage,
        /// Error message
        error: String,
    },
}

impl JobOutcome {
    pub(super) fn failed(stage: Stage, error: impl std::fmt::Display) -> Self {
        JobOutcome::Failed {
            stage,
            error: error.to_string(),
        }
    }

    /// Terminal registry status for this outcome
    pub(crate) fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Skipped(_) => JobStatus::Skipped,
            JobOutcome::Failed { .. } => JobStatus::Failed,
        }
    }

    /// Terminal event for this outcome
    pub(crate) fn into_event(self, query: String) -> Event {
        match self {
            JobOutcome::Completed(path) => Event::Completed { query, path },
            JobOutcome::Skipped(reason) => Event::Skipped { query, reason },
            JobOutcome::Failed { stage, error } => Event::Failed {
                query,
                stage,
                error,
            },
        }
    }
}

/// Step a job is currently in, readable after its pipeline task is gone
#[derive(Debug, Clone)]
pub(crate) struct StageCursor(Arc<Mutex<Stage>>);

impl Default for StageCursor {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Stage::Check)))
    }
}

impl StageCursor {
    fn enter(&self, stage: Stage) {
        match self.0.lock() {
            Ok(mut current) => *current = stage,
            Err(poisoned) => *poisoned.into_inner() = stage,
        }
    }

    pub(crate) fn current(&self) -> Stage {
        match self.0.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl TrackDownloader {
    /// Run one job through the pipeline
    ///
    /// Never returns early without an outcome; every failure is logged here
    /// with its stage. `cursor` follows the step being run so a panicking
    /// collaborator can still be attributed to one.
    pub(crate) async fn process_job(
        &self,
        job: &DownloadJob,
        cursor: &StageCursor,
    ) -> JobOutcome {
        let query = job.query();

        // Idempotency re-check: an earlier run may have completed this query
        match self.store.is_downloaded(query).await {
            Ok(true) => {
                tracing::info!(query = %query, "Already downloaded, skipping");
                return JobOutcome::Skipped(SkipReason::AlreadyDownloaded);
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(query = %query, error = %e, "Idempotency check failed");
                return JobOutcome::failed(Stage::Check, e);
            }
        }

        cursor.enter(Stage::Acquire);
        let acquirer = &self.processing.acquirer;
        tracing::debug!(query = %query, acquirer = acquirer.name(), "Acquiring audio");
        let audio = match acquirer.acquire(query, self.config.temp_dir()).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(query = %query, error = %e, "Acquisition failed");
                return JobOutcome::failed(Stage::Acquire, e);
            }
        };

        let metadata = job.hints().resolve(&audio.metadata);
        tracing::debug!(
            query = %query,
            artist = %metadata.artist,
            title = %metadata.title,
            album = %metadata.album,
            "Resolved metadata"
        );
        self.registry.set_resolved(query, &metadata);

        cursor.enter(Stage::Tag);
        let cover = match job.image_url() {
            Some(url) if self.config.cover_art.enabled => self.fetch_cover(query, url).await,
            _ => None,
        };

        if let Err(e) = self
            .processing
            .tagger
            .write_tags(&audio.path, &metadata, cover)
            .await
        {
            tracing::error!(query = %query, error = %e, "Tagging failed");
            self.discard_temp(query, &audio.path).await;
            return JobOutcome::failed(Stage::Tag, e);
        }

        cursor.enter(Stage::Publish);
        let published = match self
            .processing
            .publisher
            .publish(&audio.path, &metadata)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(query = %query, error = %e, "Publishing failed");
                self.discard_temp(query, &audio.path).await;
                return JobOutcome::failed(Stage::Publish, e);
            }
        };

        cursor.enter(Stage::Record);
        let record = completion_record(job, &metadata);
        match self.store.record_completed(&record).await {
            Ok(true) => {
                tracing::info!(query = %query, path = ?published, "Download completed");
                JobOutcome::Completed(published)
            }
            Ok(false) => {
                tracing::error!(query = %query, path = ?published, "Store declined the completion record");
                JobOutcome::failed(Stage::Record, "completion record was not written")
            }
            Err(e) => {
                tracing::error!(query = %query, path = ?published, error = %e, "Failed to record completion");
                JobOutcome::failed(Stage::Record, e)
            }
        }
    }

    /// Best-effort cover fetch; a failure is reported and the job carries on
    async fn fetch_cover(&self, query: &str, url: &str) -> Option<CoverArt> {
        match self.processing.tagger.fetch_cover(url).await {
            Ok(cover) => {
                tracing::debug!(query = %query, url, bytes = cover.data().len(), "Fetched cover art");
                Some(cover)
            }
            Err(e) => {
                tracing::warn!(query = %query, url, error = %e, "Cover art unavailable, continuing without it");
                self.emit_event(Event::CoverArtUnavailable {
                    query: query.to_string(),
                    url: url.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Deal with the temp file of a job that failed after acquisition
    async fn discard_temp(&self, query: &str, path: &Path) {
        if !self.config.download.delete_failed_temp {
            tracing::warn!(query = %query, path = ?path, "Leaving temp file of failed job");
            return;
        }

        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(query = %query, path = ?path, "Removed temp file of failed job"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(query = %query, path = ?path, error = %e, "Failed to remove temp file")
            }
        }
    }
}

fn completion_record(job: &DownloadJob, metadata: &ResolvedMetadata) -> TrackRecord {
    TrackRecord {
        query: job.query().to_string(),
        artist: Some(metadata.artist.clone()),
        title: Some(metadata.title.clone()),
        album: Some(metadata.album.clone()),
        image_url: job.image_url().map(str::to_string),
    }
}
