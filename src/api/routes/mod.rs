//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`]: submission, job polling and persisted records
//! - [`system`]: health, events, OpenAPI

use crate::db::DownloadRecord;
use crate::utils::audio_url;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod downloads;
mod system;

pub use downloads::*;
pub use system::*;

/// Default page size for GET /downloads
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
/// Largest page size GET /downloads accepts
pub const MAX_PAGE_LIMIT: u32 = 200;

// ============================================================================
// Query/Response Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /downloads
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct RecordsQuery {
    /// 1-based page number (default: 1)
    pub page: Option<u32>,
    /// Page size (default: 50, max: 200)
    pub limit: Option<u32>,
    /// Filter by status: "pending" or "completed"
    pub status: Option<String>,
    /// Case-insensitive substring of title, artist or album
    pub search: Option<String>,
}

/// Response for POST /download/all
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QueueAllResponse {
    /// Number of pending records newly queued
    pub queued: usize,
}

/// A persisted record as returned by GET /downloads
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RecordInfo {
    /// Database ID
    pub id: i64,
    /// Identity key
    pub query: String,
    /// Artist name
    pub artist: Option<String>,
    /// Track title
    pub title: Option<String>,
    /// Album name
    pub album: Option<String>,
    /// Remote cover-art URL
    pub image_url: Option<String>,
    /// "pending" or "completed"
    pub status: String,
    /// When the record was created
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
    /// Where the static file layer serves the track (completed records only)
    pub audio_url: Option<String>,
}

impl From<DownloadRecord> for RecordInfo {
    fn from(record: DownloadRecord) -> Self {
        let audio_url = match record.record_status() {
            crate::db::RecordStatus::Completed => Some(audio_url(
                record.artist.as_deref(),
                record.album.as_deref(),
                record.title.as_deref(),
            )),
            crate::db::RecordStatus::Pending => None,
        };

        Self {
            created_at: DateTime::from_timestamp(record.created_at, 0).unwrap_or_else(Utc::now),
            id: record.id,
            query: record.query,
            artist: record.artist,
            title: record.title,
            album: record.album,
            image_url: record.image_url,
            status: record.status,
            audio_url,
        }
    }
}

/// Response for GET /downloads
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RecordsPage {
    /// Records on this page, newest first
    pub items: Vec<RecordInfo>,
    /// 1-based page number
    pub page: u32,
    /// Page size used
    pub limit: u32,
    /// Total number of records matching the filter
    pub total: u64,
    /// Number of pages of `limit` records needed to list `total`
    pub total_pages: u64,
}
