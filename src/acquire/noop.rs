//! Acquirer used when yt-dlp is unavailable

use super::traits::{AcquiredAudio, AudioAcquirer};
use crate::error::{AcquireError, AcquireResult};
use async_trait::async_trait;
use std::path::Path;

/// Acquirer that fails every request
///
/// Lets the downloader start and serve its API when no yt-dlp binary is
/// configured or on PATH; each job then fails at the acquire stage with a
/// message telling the operator what is missing.
///
/// # Examples
///
/// ```
/// use trackfetch::acquire::{AudioAcquirer, UnavailableAcquirer};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = UnavailableAcquirer
///     .acquire("Muse - Uprising", Path::new("./temp"))
///     .await;
/// assert!(result.is_err());
/// # }
/// ```
pub struct UnavailableAcquirer;

#[async_trait]
impl AudioAcquirer for UnavailableAcquirer {
    async fn acquire(&self, _query: &str, _dest_dir: &Path) -> AcquireResult<AcquiredAudio> {
        Err(AcquireError::Unavailable(
            "downloading requires the yt-dlp binary. \
             Configure yt_dlp_path in config or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}
