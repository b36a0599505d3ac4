//! Track record CRUD operations.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::{Database, DownloadRecord, RecordStatus, TrackRecord};

const RECORD_COLUMNS: &str = "id, query, artist, title, album, image_url, status, created_at";

// Binds: status twice, then the search pattern four times
const FILTER: &str = "(? IS NULL OR status = ?) \
    AND (? IS NULL OR title LIKE ? OR artist LIKE ? OR album LIKE ?)";

impl Database {
    /// Whether `query` has a completed record
    pub async fn is_downloaded(&self, query: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM downloads WHERE query = ? AND status = ? LIMIT 1")
                .bind(query)
                .bind(RecordStatus::Completed.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to check download status: {}",
                        e
                    )))
                })?;

        Ok(found.is_some())
    }

    /// Upsert `record` as completed
    ///
    /// An existing row for the same query is promoted to completed, its
    /// metadata replaced and its `created_at` moved to now, so a promoted
    /// record lists as newest. A missing `image_url` keeps the previously
    /// stored one. Returns whether a row was written.
    pub async fn record_completed(&self, record: &TrackRecord) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO downloads (query, artist, title, album, image_url, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(query) DO UPDATE SET
                artist = excluded.artist,
                title = excluded.title,
                album = excluded.album,
                image_url = COALESCE(excluded.image_url, downloads.image_url),
                status = excluded.status,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.query)
        .bind(&record.artist)
        .bind(&record.title)
        .bind(&record.album)
        .bind(&record.image_url)
        .bind(RecordStatus::Completed.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record completed download: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert `record` as pending unless the query is already known
    ///
    /// Returns true if a new row was created.
    pub async fn record_pending(&self, record: &TrackRecord) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO downloads (query, artist, title, album, image_url, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(query) DO NOTHING
            "#,
        )
        .bind(&record.query)
        .bind(&record.artist)
        .bind(&record.title)
        .bind(&record.album)
        .bind(&record.image_url)
        .bind(RecordStatus::Pending.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record pending download: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Get the record for `query`
    pub async fn get_record(&self, query: &str) -> Result<Option<DownloadRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM downloads WHERE query = ?");
        let row = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(query)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get download record: {}",
                    e
                )))
            })?;

        Ok(row)
    }

    /// Status of the record for `query`, if one exists
    pub async fn get_status(&self, query: &str) -> Result<Option<RecordStatus>> {
        Ok(self
            .get_record(query)
            .await?
            .map(|record| record.record_status()))
    }

    /// All pending records, oldest first
    pub async fn list_pending(&self) -> Result<Vec<DownloadRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM downloads WHERE status = ? ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(RecordStatus::Pending.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list pending downloads: {}",
                    e
                )))
            })?;

        Ok(rows)
    }

    /// One page of records, newest first
    ///
    /// `page` is 1-based; page 0 is treated as page 1. `search` matches a
    /// substring of title, artist or album; a blank term matches everything.
    pub async fn list_records(
        &self,
        page: u32,
        limit: u32,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<Vec<DownloadRecord>> {
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);
        let status = status.map(|s| s.as_str());
        let pattern = search_pattern(search);

        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM downloads
            WHERE {FILTER}
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        );
        let rows = sqlx::query_as::<_, DownloadRecord>(&sql)
            .bind(status)
            .bind(status)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list download records: {}",
                    e
                )))
            })?;

        Ok(rows)
    }

    /// Number of records matching the same filters as [`list_records`](Self::list_records)
    pub async fn count_records(
        &self,
        status: Option<RecordStatus>,
        search: Option<&str>,
    ) -> Result<u64> {
        let status = status.map(|s| s.as_str());
        let pattern = search_pattern(search);

        let sql = format!("SELECT COUNT(*) FROM downloads WHERE {FILTER}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(status)
            .bind(status)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count download records: {}",
                    e
                )))
            })?;

        Ok(count.max(0) as u64)
    }
}

/// LIKE pattern for a search term, or `None` when there is nothing to match
fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{term}%"))
}
