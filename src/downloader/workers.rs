//! Worker pool draining the job queue.

use crate::types::{DownloadJob, Event};
use tokio::task::JoinHandle;

use super::TrackDownloader;
use super::job_task::{JobOutcome, StageCursor};

impl TrackDownloader {
    /// Spawn one worker task
    ///
    /// Workers run an identical loop: wait for the next job, claim it in the
    /// registry, run it to a terminal outcome, evict it. A worker only stops
    /// between jobs.
    pub(crate) fn spawn_worker(&self, worker_id: usize) -> JoinHandle<()> {
        let downloader = self.clone();
        tokio::spawn(async move { downloader.worker_loop(worker_id).await })
    }

    async fn worker_loop(&self, worker_id: usize) {
        tracing::info!(worker_id, "Worker started");
        let cancel = self.workers.cancel.clone();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = self.next_job() => job,
            };

            let Some(job) = next else {
                break;
            };

            self.run_job(worker_id, job).await;
        }

        tracing::info!(worker_id, "Worker stopped");
    }

    /// Pop the next job, waiting while the queue is empty
    ///
    /// The receiver lock is released as soon as a job is handed out, so at
    /// most one idle worker waits on the channel at a time.
    async fn next_job(&self) -> Option<DownloadJob> {
        let mut rx = self.queue_state.rx.lock().await;
        rx.recv().await
    }

    pub(crate) async fn run_job(&self, worker_id: usize, job: DownloadJob) {
        let query = job.query().to_string();

        if !self.registry.claim(&query) {
            // Evicted by shutdown, or already owned through a stale queue entry
            tracing::debug!(worker_id, query = %query, "Job no longer waiting, dropping");
            return;
        }

        tracing::info!(worker_id, query = %query, "Processing download");
        self.emit_event(Event::Downloading {
            query: query.clone(),
        });

        let outcome = self.run_pipeline(worker_id, job).await;
        self.settle_job(&query, outcome);
        self.registry.evict_terminal(&query);
    }

    /// Run the pipeline in its own task so a panicking collaborator turns
    /// into a `Failed` outcome instead of taking the worker down with it
    pub(crate) async fn run_pipeline(
        &self,
        worker_id: usize,
        job: DownloadJob,
    ) -> JobOutcome {
        let query = job.query().to_string();
        let cursor = StageCursor::default();
        let task = {
            let downloader = self.clone();
            let cursor = cursor.clone();
            tokio::spawn(async move { downloader.process_job(&job, &cursor).await })
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let stage = cursor.current();
                tracing::error!(worker_id, query = %query, stage = ?stage, error = %e, "Pipeline task panicked");
                JobOutcome::failed(stage, format!("pipeline panicked: {e}"))
            }
        }
    }

    /// Write the terminal status, then announce it
    ///
    /// Pollers that see the terminal event can still find the job in the
    /// registry with the matching status until the worker evicts it.
    pub(crate) fn settle_job(&self, query: &str, outcome: JobOutcome) {
        self.registry.update_status(query, outcome.status());
        self.emit_event(outcome.into_event(query.to_string()));
    }
}
