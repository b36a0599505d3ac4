//! Configuration types for trackfetch

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (directories, concurrency, queue bound)
///
/// Groups settings related to where tracks are fetched to, where they end up,
/// and how many are processed at once. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Library root for published tracks (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Scratch directory for freshly acquired audio (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Number of worker tasks draining the queue (default: 3)
    ///
    /// Kept low to avoid provider-side throttling, not for throughput.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Maximum number of jobs waiting in the queue (None = unbounded)
    ///
    /// When set, a submission that would exceed the bound is rejected with
    /// [`Error::QueueFull`] instead of blocking the caller.
    #[serde(default)]
    pub max_queued_jobs: Option<usize>,

    /// Remove the temp file when tagging or publishing fails (default: true)
    ///
    /// When false the file is left in `temp_dir` and its path is logged.
    #[serde(default = "default_true")]
    pub delete_failed_temp: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            temp_dir: default_temp_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            max_queued_jobs: None,
            delete_failed_temp: true,
        }
    }
}

/// External tool configuration for the yt-dlp acquirer
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// yt-dlp search extractor prefix (default: "ytsearch1")
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,

    /// Target MP3 quality passed to the extractor (default: "192K")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Upper bound on a single acquisition, in seconds (default: 600)
    #[serde(default = "default_acquire_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub acquire_timeout: Duration,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            search_path: true,
            search_prefix: default_search_prefix(),
            audio_quality: default_audio_quality(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

/// Remote cover-art fetching
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CoverArtConfig {
    /// Fetch and embed cover art when an image URL is supplied (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Timeout for the whole image request, in seconds (default: 10)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub fetch_timeout: Duration,

    /// Largest accepted image body in bytes (default: 10 MiB)
    #[serde(default = "default_max_cover_bytes")]
    pub max_bytes: usize,
}

impl Default for CoverArtConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_timeout: default_fetch_timeout(),
            max_bytes: default_max_cover_bytes(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./data/downloads.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// API and external server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Interval between active-job snapshots on the SSE stream (default: 500)
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            snapshot_interval_ms: default_snapshot_interval_ms(),
        }
    }
}

impl ApiConfig {
    /// Snapshot interval as a [`Duration`]
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}

/// Main configuration for [`TrackDownloader`](crate::TrackDownloader)
///
/// Download and tool settings are flattened, so the serialized form keeps
/// `download_dir`, `yt_dlp_path` etc. at the top level, while cover art,
/// persistence and the API stay nested.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings (directories, concurrency, queue bound)
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// yt-dlp location and invocation settings
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Cover-art fetching
    #[serde(default)]
    pub cover_art: CoverArtConfig,

    /// Data storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Library root for published tracks
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Scratch directory for acquired audio
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }

    /// Reject settings that would leave the downloader unable to make progress
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("max_concurrent_downloads".to_string()),
            });
        }

        if self.download.max_queued_jobs == Some(0) {
            return Err(Error::Config {
                message: "max_queued_jobs must be at least 1 when set".to_string(),
                key: Some("max_queued_jobs".to_string()),
            });
        }

        if self.server.api.snapshot_interval_ms == 0 {
            return Err(Error::Config {
                message: "snapshot_interval_ms must be greater than zero".to_string(),
                key: Some("snapshot_interval_ms".to_string()),
            });
        }

        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/downloads.db")
}

fn default_true() -> bool {
    true
}

fn default_search_prefix() -> String {
    "ytsearch1".to_string()
}

fn default_audio_quality() -> String {
    "192K".to_string()
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_cover_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_snapshot_interval_ms() -> u64 {
    500
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
