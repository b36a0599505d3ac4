//! Active job registry
//!
//! Tracks every job that is queued or being processed so that duplicate
//! submissions can be rejected and pollers can read a consistent snapshot.
//! It is the only mutable state shared between the submission path and the
//! workers, and every access goes through a single mutex.

use crate::types::{DownloadJob, JobStatus, JobView, ResolvedMetadata};
use std::sync::{Arc, Mutex, MutexGuard};

/// Outcome of a bounded insert
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The job is now tracked as `Queued`
    Accepted,
    /// A non-terminal job with the same query is already tracked
    Duplicate,
    /// The configured number of waiting jobs is already reached
    Full {
        /// Configured bound
        limit: usize,
    },
}

/// Concurrency-safe tracker of queued and in-flight jobs
///
/// Cloning is cheap and every clone shares the same underlying registry.
/// Entries keep submission order, so snapshots list jobs FIFO.
#[derive(Clone, Debug, Default)]
pub struct ActiveJobRegistry {
    jobs: Arc<Mutex<Vec<DownloadJob>>>,
}

impl ActiveJobRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // The lock only guards plain data, so a panic in another holder cannot
    // leave it in a state worth refusing to read.
    fn lock(&self) -> MutexGuard<'_, Vec<DownloadJob>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert `job` unless a non-terminal job with the same query exists
    ///
    /// Check and insert happen under one lock acquisition. A leftover
    /// terminal entry for the same query is replaced.
    pub fn add(&self, job: DownloadJob) -> bool {
        self.try_add(job, None) == AddOutcome::Accepted
    }

    /// Like [`add`](Self::add), additionally rejecting the job when
    /// `max_queued` jobs are already waiting
    pub fn try_add(&self, mut job: DownloadJob, max_queued: Option<usize>) -> AddOutcome {
        let mut jobs = self.lock();

        if let Some(pos) = jobs.iter().position(|j| j.query() == job.query()) {
            if !jobs[pos].status().is_terminal() {
                return AddOutcome::Duplicate;
            }
            jobs.remove(pos);
        }

        if let Some(limit) = max_queued {
            let waiting = jobs
                .iter()
                .filter(|j| j.status() == JobStatus::Queued)
                .count();
            if waiting >= limit {
                return AddOutcome::Full { limit };
            }
        }

        job.set_status(JobStatus::Queued);
        jobs.push(job);
        AddOutcome::Accepted
    }

    /// Set the status of the tracked job; returns false if it is not tracked
    pub fn update_status(&self, query: &str, status: JobStatus) -> bool {
        let mut jobs = self.lock();
        match jobs.iter_mut().find(|j| j.query() == query) {
            Some(job) => {
                job.set_status(status);
                true
            }
            None => false,
        }
    }

    /// Record the metadata a tracked job resolved after acquisition
    pub(crate) fn set_resolved(&self, query: &str, metadata: &ResolvedMetadata) -> bool {
        let mut jobs = self.lock();
        match jobs.iter_mut().find(|j| j.query() == query) {
            Some(job) => {
                job.set_resolved(metadata.clone());
                true
            }
            None => false,
        }
    }

    /// Move `query` from `Queued` to `Downloading`
    ///
    /// Returns false when the job is untracked or not waiting, in which case
    /// the caller must not process it.
    pub(crate) fn claim(&self, query: &str) -> bool {
        let mut jobs = self.lock();
        match jobs
            .iter_mut()
            .find(|j| j.query() == query && j.status() == JobStatus::Queued)
        {
            Some(job) => {
                job.set_status(JobStatus::Downloading);
                true
            }
            None => false,
        }
    }

    /// Stop tracking `query`, whatever its status
    pub fn remove(&self, query: &str) -> Option<DownloadJob> {
        let mut jobs = self.lock();
        let pos = jobs.iter().position(|j| j.query() == query)?;
        Some(jobs.remove(pos))
    }

    /// Remove `query` only if it has reached a terminal status
    ///
    /// Workers evict through this so they can never drop a fresh submission
    /// that replaced their own finished entry.
    pub(crate) fn evict_terminal(&self, query: &str) -> bool {
        let mut jobs = self.lock();
        match jobs
            .iter()
            .position(|j| j.query() == query && j.status().is_terminal())
        {
            Some(pos) => {
                jobs.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every job still waiting for a worker and return their queries
    pub(crate) fn drain_queued(&self) -> Vec<String> {
        let mut jobs = self.lock();
        let mut drained = Vec::new();
        jobs.retain(|j| {
            if j.status() == JobStatus::Queued {
                drained.push(j.query().to_string());
                false
            } else {
                true
            }
        });
        drained
    }

    /// View of a single tracked job
    pub fn get(&self, query: &str) -> Option<JobView> {
        self.lock()
            .iter()
            .find(|j| j.query() == query)
            .map(DownloadJob::view)
    }

    /// Point-in-time copy of all tracked jobs, in submission order
    pub fn snapshot(&self) -> Vec<JobView> {
        self.lock().iter().map(DownloadJob::view).collect()
    }

    /// Number of tracked jobs with the given status
    pub fn count(&self, status: JobStatus) -> usize {
        self.lock().iter().filter(|j| j.status() == status).count()
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no jobs are tracked
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DownloadRequest;
    use std::sync::Barrier;

    fn job(query: &str) -> DownloadJob {
        DownloadJob::new(DownloadRequest::new(query))
    }

    #[test]
    fn duplicate_submission_is_rejected_and_registry_unchanged() {
        let registry = ActiveJobRegistry::new();

        assert!(registry.add(job("Muse - Uprising")));
        assert!(!registry.add(job("Muse - Uprising")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].status, JobStatus::Queued);
    }

    #[test]
    fn duplicate_rejected_while_downloading() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("Muse - Uprising"));
        registry.update_status("Muse - Uprising", JobStatus::Downloading);

        assert!(!registry.add(job("Muse - Uprising")));
        assert_eq!(
            registry.get("Muse - Uprising").unwrap().status,
            JobStatus::Downloading
        );
    }

    #[test]
    fn terminal_entry_is_visible_until_evicted_and_does_not_block_resubmission() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("Muse - Uprising"));
        registry.update_status("Muse - Uprising", JobStatus::Failed);

        assert_eq!(registry.snapshot()[0].status, JobStatus::Failed);

        // A fresh submission replaces the finished entry...
        assert!(registry.add(job("Muse - Uprising")));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("Muse - Uprising").unwrap().status,
            JobStatus::Queued
        );

        // ...and the old worker's eviction must not drop it.
        assert!(!registry.evict_terminal("Muse - Uprising"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn evict_terminal_removes_finished_jobs() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("a"));
        registry.update_status("a", JobStatus::Completed);

        assert!(registry.evict_terminal("a"));
        assert!(registry.is_empty());
    }

    #[test]
    fn claim_only_takes_waiting_jobs() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("a"));

        assert!(registry.claim("a"));
        assert_eq!(registry.get("a").unwrap().status, JobStatus::Downloading);
        assert!(!registry.claim("a"), "second claim must fail");
        assert!(!registry.claim("missing"));
    }

    #[test]
    fn resolved_metadata_replaces_hints_in_views() {
        let registry = ActiveJobRegistry::new();
        registry.add(DownloadJob::new(
            DownloadRequest::new("Muse - Uprising").title("Uprising"),
        ));
        assert_eq!(registry.get("Muse - Uprising").unwrap().artist, None);

        let resolved = ResolvedMetadata {
            artist: "Muse".into(),
            title: "Uprising".into(),
            album: "The Resistance".into(),
        };
        assert!(registry.set_resolved("Muse - Uprising", &resolved));
        assert!(!registry.set_resolved("missing", &resolved));

        let view = registry.get("Muse - Uprising").unwrap();
        assert_eq!(view.artist.as_deref(), Some("Muse"));
        assert_eq!(view.title.as_deref(), Some("Uprising"));
        assert_eq!(view.album.as_deref(), Some("The Resistance"));
    }

    #[test]
    fn update_status_on_unknown_query_is_noop() {
        let registry = ActiveJobRegistry::new();
        assert!(!registry.update_status("missing", JobStatus::Downloading));
        assert!(registry.remove("missing").is_none());
    }

    #[test]
    fn snapshot_is_detached_from_live_registry() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("a"));
        registry.add(job("b"));

        let snapshot = registry.snapshot();
        registry.update_status("a", JobStatus::Downloading);
        registry.remove("b");

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].query, "a");
        assert_eq!(snapshot[0].status, JobStatus::Queued);
        assert_eq!(snapshot[1].query, "b");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn bounded_add_counts_only_waiting_jobs() {
        let registry = ActiveJobRegistry::new();

        assert_eq!(registry.try_add(job("a"), Some(2)), AddOutcome::Accepted);
        assert_eq!(registry.try_add(job("b"), Some(2)), AddOutcome::Accepted);
        assert_eq!(
            registry.try_add(job("c"), Some(2)),
            AddOutcome::Full { limit: 2 }
        );

        registry.update_status("a", JobStatus::Downloading);
        assert_eq!(registry.try_add(job("c"), Some(2)), AddOutcome::Accepted);
        assert_eq!(registry.try_add(job("c"), Some(2)), AddOutcome::Duplicate);
    }

    #[test]
    fn drain_queued_leaves_in_flight_jobs() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("a"));
        registry.add(job("b"));
        registry.add(job("c"));
        registry.update_status("b", JobStatus::Downloading);

        let drained = registry.drain_queued();

        assert_eq!(drained, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.count(JobStatus::Downloading), 1);
    }

    #[test]
    fn concurrent_adds_of_same_query_accept_exactly_one() {
        let registry = ActiveJobRegistry::new();
        let threads = 32;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.add(job("Muse - Uprising"))
                })
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let registry = ActiveJobRegistry::new();
        registry.add(job("a"));

        let poisoner = registry.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.jobs.lock().unwrap();
            panic!("poison the registry lock");
        })
        .join();

        assert!(registry.jobs.is_poisoned());
        assert_eq!(registry.snapshot().len(), 1);
        assert!(registry.add(job("b")));
    }
}
