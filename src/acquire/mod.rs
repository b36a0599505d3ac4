//! Audio acquisition
//!
//! Turns a search query into a raw audio file in the temp directory plus
//! whatever metadata the source reported. The pipeline only depends on the
//! [`AudioAcquirer`] trait; two implementations ship with the crate:
//!
//! - [`YtDlpAcquirer`]: shells out to `yt-dlp` and extracts MP3 audio
//! - [`UnavailableAcquirer`]: fails every request, used when no binary is found
//!
//! ## Usage
//!
//! ```no_run
//! use trackfetch::acquire::{AudioAcquirer, YtDlpAcquirer};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let acquirer = YtDlpAcquirer::from_path().expect("yt-dlp not found");
//!
//!     let audio = acquirer
//!         .acquire("Muse - Uprising", Path::new("./temp"))
//!         .await?;
//!     println!("fetched {} ({:?})", audio.path.display(), audio.metadata.title);
//!
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod parser;
mod traits;

pub use cli::YtDlpAcquirer;
pub use noop::UnavailableAcquirer;
pub use traits::{AcquiredAudio, AudioAcquirer};

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Pick the acquirer for `tools`
///
/// An explicit `yt_dlp_path` wins; otherwise PATH is searched when
/// `search_path` is set. Without a binary every acquisition fails with
/// [`AcquireError::Unavailable`](crate::error::AcquireError::Unavailable)
/// instead of refusing to start.
pub fn acquirer_from_config(tools: &ToolsConfig) -> Arc<dyn AudioAcquirer> {
    let binary = match &tools.yt_dlp_path {
        Some(path) => Some(path.clone()),
        None if tools.search_path => which::which("yt-dlp").ok(),
        None => None,
    };

    match binary {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using yt-dlp acquirer");
            Arc::new(YtDlpAcquirer::new(path).with_tools_config(tools))
        }
        None => {
            tracing::warn!("yt-dlp not found; downloads will fail until it is installed");
            Arc::new(UnavailableAcquirer)
        }
    }
}
