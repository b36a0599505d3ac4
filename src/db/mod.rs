//! Database layer for trackfetch
//!
//! SQLite persistence for the record of which tracks have been requested and
//! which have been completed. The download pipeline only talks to it through
//! the [`DownloadStore`] trait.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: database lifecycle, schema migrations
//! - [`downloads`]: track record upserts and queries
//! - [`store`]: [`DownloadStore`] trait and its SQLite implementation

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::str::FromStr;
use utoipa::ToSchema;

mod downloads;
mod migrations;
mod store;

pub use store::DownloadStore;

/// Persisted status of a track record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Requested by an external collaborator, not yet fetched
    Pending,
    /// Tagged file published to the library
    Completed,
}

impl RecordStatus {
    /// Value stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Completed => "completed",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordStatus::Pending),
            "completed" => Ok(RecordStatus::Completed),
            other => Err(format!("unknown record status '{other}'")),
        }
    }
}

/// Track metadata written to the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRecord {
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
}

impl TrackRecord {
    /// Record with only a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Track record from database
#[derive(Debug, Clone, FromRow)]
pub struct DownloadRecord {
    /// Unique database ID
    pub id: i64,
    /// Identity key (unique)
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
    /// Unix timestamp when the record was created
    pub created_at: i64,
}

impl DownloadRecord {
    /// Parsed status; unknown values read as pending
    pub fn record_status(&self) -> RecordStatus {
        self.status.parse().unwrap_or(RecordStatus::Pending)
    }
}

/// Database handle for trackfetch
pub struct Database {
    pool: SqlitePool,
}
