//! Core types for trackfetch

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Fallback artist written when neither caller nor acquirer supplied one
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
/// Fallback title written when neither caller nor acquirer supplied one
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Fallback album written when neither caller nor acquirer supplied one
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Lifecycle status of an in-memory download job
///
/// `Queued -> Downloading -> {Completed | Skipped | Failed}`. The three
/// right-hand states are terminal and evict the job from the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a free worker
    Queued,
    /// Owned by a worker and moving through the pipeline
    Downloading,
    /// Tagged, published and recorded
    Completed,
    /// Already completed by an earlier run
    Skipped,
    /// A pipeline step failed
    Failed,
}

impl JobStatus {
    /// Whether this status ends the job's life in the registry
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Skipped | JobStatus::Failed
        )
    }

    /// Lowercase name as it appears on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Skipped => "skipped",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission for one track
///
/// `query` is the identity key (commonly `"Artist - Title"`); the remaining
/// fields are hints that take precedence over whatever the acquirer reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Canonical track query, used for dedup and search
    pub query: String,

    /// Artist name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,

    /// Track title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Album name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,

    /// Remote cover-art URL
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DownloadRequest {
    /// Request with only a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Set the artist hint
    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set the title hint
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the album hint
    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the cover-art URL
    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// One in-flight request to acquire, tag, and publish a single track
///
/// The identity (`query`) and the caller hints are fixed at construction.
/// Status and the resolved metadata change only through the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadJob {
    query: String,
    hints: TrackMetadata,
    resolved: Option<ResolvedMetadata>,
    image_url: Option<String>,
    status: JobStatus,
}

impl DownloadJob {
    /// Build a `Queued` job from a submission
    pub fn new(request: DownloadRequest) -> Self {
        Self {
            query: request.query,
            hints: TrackMetadata {
                artist: request.artist,
                title: request.title,
                album: request.album,
            },
            resolved: None,
            image_url: request.image_url,
            status: JobStatus::Queued,
        }
    }

    /// Identity key
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Caller-supplied metadata
    pub fn hints(&self) -> &TrackMetadata {
        &self.hints
    }

    /// Cover-art URL, if any
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    /// Current status
    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    pub(crate) fn set_resolved(&mut self, metadata: ResolvedMetadata) {
        self.resolved = Some(metadata);
    }

    /// Point-in-time copy for status polling
    ///
    /// Shows the caller hints until acquisition resolves the effective
    /// metadata, and the resolved values after that.
    pub fn view(&self) -> JobView {
        let (artist, title, album) = match &self.resolved {
            Some(m) => (
                Some(m.artist.clone()),
                Some(m.title.clone()),
                Some(m.album.clone()),
            ),
            None => (
                self.hints.artist.clone(),
                self.hints.title.clone(),
                self.hints.album.clone(),
            ),
        };
        JobView {
            query: self.query.clone(),
            artist,
            title,
            album,
            status: self.status,
        }
    }
}

/// Snapshot of a job as exposed to pollers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobView {
    /// Identity key
    pub query: String,
    /// Artist hint, or the resolved artist once acquired
    pub artist: Option<String>,
    /// Title hint, or the resolved title once acquired
    pub title: Option<String>,
    /// Album hint, or the resolved album once acquired
    pub album: Option<String>,
    /// Status at the moment of the snapshot
    pub status: JobStatus,
}

/// Result of a submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Accepted and pushed to the queue
    Queued,
    /// Rejected because the same query is already queued or downloading
    Skipped,
}

/// Response to `queue_download`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueOutcome {
    /// Whether the job was queued or skipped as a duplicate
    pub status: SubmissionStatus,
    /// The submitted query
    pub query: String,
}

impl QueueOutcome {
    /// Outcome for an accepted submission
    pub fn queued(query: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Queued,
            query: query.into(),
        }
    }

    /// Outcome for a duplicate submission
    pub fn skipped(query: impl Into<String>) -> Self {
        Self {
            status: SubmissionStatus::Skipped,
            query: query.into(),
        }
    }
}

/// Partially known track metadata
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrackMetadata {
    /// Artist name
    pub artist: Option<String>,
    /// Track title
    pub title: Option<String>,
    /// Album name
    pub album: Option<String>,
}

impl TrackMetadata {
    /// Fill blanks in `self` from `fallback`, then fill remaining blanks with
    /// the `Unknown ...` placeholders
    ///
    /// Empty or whitespace-only values count as missing.
    pub fn resolve(&self, fallback: &TrackMetadata) -> ResolvedMetadata {
        fn pick(primary: &Option<String>, secondary: &Option<String>, default: &str) -> String {
            [primary, secondary]
                .into_iter()
                .flatten()
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        }

        ResolvedMetadata {
            artist: pick(&self.artist, &fallback.artist, UNKNOWN_ARTIST),
            title: pick(&self.title, &fallback.title, UNKNOWN_TITLE),
            album: pick(&self.album, &fallback.album, UNKNOWN_ALBUM),
        }
    }
}

/// Effective metadata written into tags and used for the canonical path
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedMetadata {
    /// Artist name
    pub artist: String,
    /// Track title
    pub title: String,
    /// Album name
    pub album: String,
}

/// Pipeline step a job failed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Idempotency re-check against the store
    Check,
    /// Audio acquisition
    Acquire,
    /// Tag rewrite
    Tag,
    /// Move into the library
    Publish,
    /// Completion record
    Record,
}

/// Why a worker skipped a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The store already has a completed record for the query
    AlreadyDownloaded,
}

/// Event emitted by the downloader
///
/// Per job, events follow the state machine; the terminal event is sent
/// before the job leaves the registry.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted into the queue
    Queued {
        /// Job query
        query: String,
    },

    /// A worker picked the job up
    Downloading {
        /// Job query
        query: String,
    },

    /// Track published and recorded
    Completed {
        /// Job query
        query: String,
        /// Canonical location of the published file
        #[schema(value_type = String)]
        path: PathBuf,
    },

    /// Worker skipped the job
    Skipped {
        /// Job query
        query: String,
        /// Reason for skipping
        reason: SkipReason,
    },

    /// Job failed
    Failed {
        /// Job query
        query: String,
        /// Step that failed
        stage: Stage,
        /// Error message
        error: String,
    },

    /// Cover art could not be fetched; the job continues without it
    CoverArtUnavailable {
        /// Job query
        query: String,
        /// Requested image URL
        url: String,
        /// Error message
        error: String,
    },

    /// Downloader is shutting down
    Shutdown,
}
