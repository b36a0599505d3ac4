//! yt-dlp based acquirer using the external binary

use super::parser::{error_summary, parse_info_json};
use super::traits::{AcquiredAudio, AudioAcquirer};
use crate::config::ToolsConfig;
use crate::error::{AcquireError, AcquireResult};
use crate::utils::temp_stem;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const TOOL_NAME: &str = "yt-dlp";

/// Acquirer that runs `yt-dlp` to search for a query and extract MP3 audio
///
/// Each query is written to `<dest_dir>/<hash>.mp3`, where `<hash>` is
/// derived from the query alone. The process is killed if it runs past the
/// configured timeout.
///
/// # Examples
///
/// ```no_run
/// use trackfetch::acquire::{AudioAcquirer, YtDlpAcquirer};
/// use std::path::{Path, PathBuf};
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let acquirer = YtDlpAcquirer::new(PathBuf::from("/usr/local/bin/yt-dlp"))
///     .with_timeout(Duration::from_secs(120));
///
/// let audio = acquirer.acquire("Muse - Uprising", Path::new("./temp")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    binary_path: PathBuf,
    search_prefix: String,
    audio_quality: String,
    timeout: Duration,
}

impl YtDlpAcquirer {
    /// Create an acquirer with an explicit binary path and default options
    pub fn new(binary_path: PathBuf) -> Self {
        let defaults = ToolsConfig::default();
        Self {
            binary_path,
            search_prefix: defaults.search_prefix,
            audio_quality: defaults.audio_quality,
            timeout: defaults.acquire_timeout,
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which(TOOL_NAME).ok().map(Self::new)
    }

    /// Take search prefix, quality and timeout from `tools`
    pub fn with_tools_config(mut self, tools: &ToolsConfig) -> Self {
        self.search_prefix = tools.search_prefix.clone();
        self.audio_quality = tools.audio_quality.clone();
        self.timeout = tools.acquire_timeout;
        self
    }

    /// Override the per-acquisition timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the binary this acquirer runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn command(&self, query: &str, output_template: &Path) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--no-playlist")
            .args(["--format", "bestaudio/best"])
            .arg("--extract-audio")
            .args(["--audio-format", "mp3"])
            .args(["--audio-quality", &self.audio_quality])
            .arg("--embed-thumbnail")
            .arg("--dump-json")
            .arg("--no-simulate")
            .arg("--no-progress")
            .arg("--force-overwrites")
            .arg("--output")
            .arg(output_template)
            .arg(format!("{}:{}", self.search_prefix, query))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl AudioAcquirer for YtDlpAcquirer {
    async fn acquire(&self, query: &str, dest_dir: &Path) -> AcquireResult<AcquiredAudio> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let stem = temp_stem(query);
        let output_template = dest_dir.join(format!("{stem}.%(ext)s"));
        let expected = dest_dir.join(format!("{stem}.mp3"));

        tracing::debug!(query, binary = %self.binary_path.display(), "Running yt-dlp");

        let output = tokio::time::timeout(
            self.timeout,
            self.command(query, &output_template).output(),
        )
        .await
        .map_err(|_| AcquireError::Timeout {
            seconds: self.timeout.as_secs(),
        })?
        .map_err(|e| AcquireError::Tool {
            tool: TOOL_NAME.to_string(),
            message: format!("failed to execute {}: {}", self.binary_path.display(), e),
        })?;

        if !output.status.success() {
            return Err(AcquireError::Tool {
                tool: TOOL_NAME.to_string(),
                message: error_summary(&output.stderr),
            });
        }

        let metadata = parse_info_json(&output.stdout).ok_or_else(|| AcquireError::NotFound {
            query: query.to_string(),
        })?;

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(AcquireError::MissingOutput { path: expected });
        }

        Ok(AcquiredAudio {
            path: expected,
            metadata,
        })
    }

    fn name(&self) -> &'static str {
        TOOL_NAME
    }
}
