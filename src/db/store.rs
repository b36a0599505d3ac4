//! Persistence contract consumed by the download pipeline.

use async_trait::async_trait;

use super::{Database, DownloadRecord, RecordStatus, TrackRecord};
use crate::Result;

/// Store of persisted track records
///
/// The pipeline asks it whether a query was completed by an earlier run and
/// records completions. Implementations handle their own write serialization;
/// workers call it independently and concurrently.
#[async_trait]
pub trait DownloadStore: Send + Sync {
    /// Whether `query` already has a completed record
    async fn is_downloaded(&self, query: &str) -> Result<bool>;

    /// Idempotent upsert of a completed record keyed on `record.query`
    ///
    /// Returns false if the store declined to write.
    async fn record_completed(&self, record: &TrackRecord) -> Result<bool>;

    /// Records requested but not yet completed
    async fn list_pending(&self) -> Result<Vec<DownloadRecord>>;

    /// One page of records, newest first
    async fn list_records(
        &self,
        page: u32,
        limit: u32,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<Vec<DownloadRecord>>;

    /// Number of records matching the same filters as `list_records`
    async fn count_records(
        &self,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<u64>;
}

#[async_trait]
impl DownloadStore for Database {
    async fn is_downloaded(&self, query: &str) -> Result<bool> {
        Database::is_downloaded(self, query).await
    }

    async fn record_completed(&self, record: &TrackRecord) -> Result<bool> {
        Database::record_completed(self, record).await
    }

    async fn list_pending(&self) -> Result<Vec<DownloadRecord>> {
        Database::list_pending(self).await
    }

    async fn list_records(
        &self,
        page: u32,
        limit: u32,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<Vec<DownloadRecord>> {
        Database::list_records(self, page, limit, status, search).await
    }

    async fn count_records(
        &self,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<u64> {
        Database::count_records(self, status, search).await
    }
}
