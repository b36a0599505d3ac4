//! Parser for yt-dlp command output

use crate::types::TrackMetadata;
use serde::Deserialize;

/// Fields of a yt-dlp info JSON line that map to track metadata
#[derive(Debug, Default, Deserialize)]
struct InfoJson {
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    creator: Option<String>,
    #[serde(default)]
    track: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    album: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Extract metadata from `--dump-json` output
///
/// yt-dlp prints one JSON object per processed entry; the last one is the
/// entry that was downloaded. Returns `None` when no line parses, which is
/// what an empty search result looks like.
pub(crate) fn parse_info_json(stdout: &[u8]) -> Option<TrackMetadata> {
    // Invalid bytes in progress lines or titles must not hide the metadata
    let output = String::from_utf8_lossy(stdout);

    let info = output
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<InfoJson>(line).ok())?;

    Some(TrackMetadata {
        artist: non_empty(info.artist).or_else(|| non_empty(info.creator)),
        title: non_empty(info.track).or_else(|| non_empty(info.title)),
        album: non_empty(info.album),
    })
}

/// Best one-line description of why yt-dlp failed
///
/// Prefers the last `ERROR:` line, falling back to the last non-empty line.
pub(crate) fn error_summary(stderr: &[u8]) -> String {
    let output = String::from_utf8_lossy(stderr);
    let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

    let last_error = output
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .next_back();

    match last_error.or_else(|| lines.next_back()) {
        Some(line) => line.trim_start_matches("ERROR:").trim().to_string(),
        None => "no error output".to_string(),
    }
}
