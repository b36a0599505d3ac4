//! Error types for trackfetch
//!
//! This module provides error handling for the library, including:
//! - Per-step pipeline errors (acquire, tag, cover art, publish)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for trackfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result of the acquire step
pub type AcquireResult<T> = std::result::Result<T, AcquireError>;

/// Result of the tag step
pub type TagResult<T> = std::result::Result<T, TagError>;

/// Result of a cover-art fetch
pub type CoverArtResult<T> = std::result::Result<T, CoverArtError>;

/// Result of the publish step
pub type PublishResult<T> = std::result::Result<T, PublishError>;

/// Main error type for trackfetch
///
/// This is the primary error type used throughout the library. Pipeline steps
/// return their own narrower error types which convert into this one.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_downloads")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Audio acquisition failed
    #[error("acquisition error: {0}")]
    Acquire(#[from] AcquireError),

    /// Tag writing failed
    #[error("tagging error: {0}")]
    Tag(#[from] TagError),

    /// Cover art could not be fetched
    #[error("cover art error: {0}")]
    CoverArt(#[from] CoverArtError),

    /// Moving the tagged file into the library failed
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A submission was rejected before reaching the queue
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// The optional queue bound was reached
    #[error("download queue is full ({limit} jobs waiting)")]
    QueueFull {
        /// Configured maximum number of waiting jobs
        limit: usize,
    },

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Errors reported by an audio acquirer
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The search returned nothing for the query
    #[error("no result found for '{query}'")]
    NotFound {
        /// The query that produced no match
        query: String,
    },

    /// The acquirer tool ran but reported a failure
    #[error("{tool} failed: {message}")]
    Tool {
        /// Name of the tool (e.g. "yt-dlp")
        tool: String,
        /// Error output or exit description
        message: String,
    },

    /// The acquirer did not finish within its time budget
    #[error("acquisition timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed, in seconds
        seconds: u64,
    },

    /// The tool reported success but the expected audio file is missing
    #[error("expected audio file not found at {path}")]
    MissingOutput {
        /// Path where the audio file was expected
        path: PathBuf,
    },

    /// No acquirer is available (binary missing)
    #[error("no audio acquirer available: {0}")]
    Unavailable(String),

    /// I/O error while launching or reading the tool
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while rewriting audio tags
#[derive(Debug, Error)]
pub enum TagError {
    /// The audio file could not be read or parsed
    #[error("failed to read tags from {path}: {reason}")]
    Read {
        /// Audio file path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// The tags could not be written back
    #[error("failed to write tags to {path}: {reason}")]
    Write {
        /// Audio file path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// The blocking tag task panicked or was cancelled
    #[error("tagging task aborted: {0}")]
    Aborted(String),
}

/// Errors while fetching remote cover art (never fatal to a job)
#[derive(Debug, Error)]
pub enum CoverArtError {
    /// The URL is malformed or not http(s)
    #[error("invalid cover art URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// The server answered with a non-success status
    #[error("cover art request returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The body was empty, too large, or not a recognizable image
    #[error("unusable cover art: {0}")]
    Unusable(String),

    /// Transport error (connect, timeout, body read)
    #[error("cover art request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Errors while moving a tagged file into its canonical location
#[derive(Debug, Error)]
pub enum PublishError {
    /// The artist/album directory could not be created
    #[error("failed to create directory {path}: {reason}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// A stale file at the destination could not be replaced
    #[error("failed to replace existing file {path}: {reason}")]
    Replace {
        /// Destination path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// File move/rename failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should be moved
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "shutting_down",
///     "message": "shutdown in progress: not accepting new downloads"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "queue_full", "invalid_request")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::InvalidRequest(_) => 400,

            // 422 Unprocessable Entity - the job itself could not be fulfilled
            Error::Acquire(AcquireError::NotFound { .. }) => 422,
            Error::Tag(_) => 422,
            Error::Publish(_) => 422,

            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 502 Bad Gateway - External service errors
            Error::Acquire(_) => 502,
            Error::CoverArt(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::QueueFull { .. } => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Acquire(e) => match e {
                AcquireError::NotFound { .. } => "track_not_found",
                AcquireError::Tool { .. } => "acquirer_failed",
                AcquireError::Timeout { .. } => "acquirer_timeout",
                AcquireError::MissingOutput { .. } => "acquirer_missing_output",
                AcquireError::Unavailable(_) => "acquirer_unavailable",
                AcquireError::Io(_) => "acquirer_io_error",
            },
            Error::Tag(_) => "tagging_failed",
            Error::CoverArt(_) => "cover_art_failed",
            Error::Publish(e) => match e {
                PublishError::CreateDir { .. } => "create_dir_failed",
                PublishError::Replace { .. } => "replace_failed",
                PublishError::MoveFailed { .. } => "move_failed",
            },
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::QueueFull { .. } => "queue_full",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            Error::QueueFull { limit } => Some(serde_json::json!({ "limit": limit })),
            Error::Publish(PublishError::MoveFailed {
                source_path,
                dest_path,
                ..
            }) => Some(serde_json::json!({
                "source_path": source_path.display().to_string(),
                "dest_path": dest_path.display().to_string(),
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
