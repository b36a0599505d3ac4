//! Utility functions for path segments and file naming

use sha2::{Digest, Sha256};

/// Replacement for names that are missing or sanitize to nothing
pub const UNKNOWN_SEGMENT: &str = "Unknown";

/// Number of hex characters of the query hash used for temp file names
const TEMP_STEM_LEN: usize = 16;

/// Map arbitrary text to a filesystem-safe path segment
///
/// Keeps letters, digits, space, `-`, `_`, `(` and `)`; every other character
/// is dropped rather than replaced. Surrounding spaces are trimmed. Missing,
/// empty, or fully filtered input becomes `"Unknown"`.
///
/// "Letters and digits" means [`char::is_alphanumeric`], so every Unicode
/// numeric character survives too, including fractions (`½`) and letter-like
/// numerals (`Ⅻ`).
///
/// Every path built from track metadata goes through this one function, so
/// the library layout and the served audio URLs always agree.
///
/// # Examples
///
/// ```
/// use trackfetch::utils::sanitize;
///
/// assert_eq!(sanitize("AC/DC"), "ACDC");
/// assert_eq!(sanitize("Guns N' Roses"), "Guns N Roses");
/// assert_eq!(sanitize(None), "Unknown");
/// ```
pub fn sanitize<'a>(name: impl Into<Option<&'a str>>) -> String {
    let Some(name) = name.into() else {
        return UNKNOWN_SEGMENT.to_string();
    };

    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '(' | ')'))
        .collect();
    let trimmed = kept.trim();

    if trimmed.is_empty() {
        UNKNOWN_SEGMENT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Stable temp file stem for a query
///
/// Two different queries never share a stem in practice, and the same query
/// always maps to the same stem, which the registry guarantees is in use by
/// at most one worker at a time.
pub fn temp_stem(query: &str) -> String {
    let digest = Sha256::digest(query.as_bytes());
    let hex = format!("{digest:x}");
    hex[..TEMP_STEM_LEN].to_string()
}

/// Public URL under which the static file layer serves a published track
///
/// Mirrors the canonical library layout: `/api/audio/<artist>/<album>/<title>.mp3`,
/// each segment sanitized and then percent-encoded.
pub fn audio_url(artist: Option<&str>, album: Option<&str>, title: Option<&str>) -> String {
    format!(
        "/api/audio/{}/{}/{}.mp3",
        urlencoding::encode(&sanitize(artist)),
        urlencoding::encode(&sanitize(album)),
        urlencoding::encode(&sanitize(title)),
    )
}
