//! Waiting on events and inspecting the library on disk

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use trackfetch::{Event, TrackDownloader};
use walkdir::WalkDir;

/// Terminal outcome of one job, as seen on the event stream
#[derive(Debug)]
pub enum WaitResult {
    Completed(PathBuf),
    Skipped,
    Failed(String),
    Timeout,
    ChannelClosed,
}

/// Wait for the terminal event of `query`
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<Event>,
    query: &str,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed { query: q, path }) if q == query => {
                    return WaitResult::Completed(path);
                }
                Ok(Event::Skipped { query: q, .. }) if q == query => return WaitResult::Skipped,
                Ok(Event::Failed { query: q, error, .. }) if q == query => {
                    return WaitResult::Failed(error);
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Wait for the terminal events of every query in `queries`, in any order
///
/// Queries with no terminal event before the deadline map to [`WaitResult::Timeout`].
pub async fn wait_for_all(
    events: &mut broadcast::Receiver<Event>,
    queries: &[&str],
    timeout: Duration,
) -> HashMap<String, WaitResult> {
    let mut outcomes: HashMap<String, WaitResult> = HashMap::new();
    let _ = tokio::time::timeout(timeout, async {
        while outcomes.len() < queries.len() {
            let (query, outcome) = match events.recv().await {
                Ok(Event::Completed { query, path }) => (query, WaitResult::Completed(path)),
                Ok(Event::Skipped { query, .. }) => (query, WaitResult::Skipped),
                Ok(Event::Failed { query, error, .. }) => (query, WaitResult::Failed(error)),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if queries.contains(&query.as_str()) {
                outcomes.insert(query, outcome);
            }
        }
    })
    .await;

    for query in queries {
        outcomes
            .entry(query.to_string())
            .or_insert(WaitResult::Timeout);
    }
    outcomes
}

/// Wait until no job is queued or in flight
///
/// The terminal event is sent before the job leaves the registry, so a
/// resubmission right after it may still be deduplicated.
pub async fn wait_for_idle(downloader: &TrackDownloader, timeout: Duration) {
    tokio::time::timeout(timeout, async {
        while !downloader.get_active_downloads().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("registry did not drain in time");
}

/// Every regular file under `root`, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Read back title, artist and album from an audio file
pub fn read_tags(path: &Path) -> (Option<String>, Option<String>, Option<String>) {
    use lofty::file::TaggedFileExt;
    use lofty::prelude::Accessor;

    let tagged = lofty::read_from_path(path).expect("readable audio file");
    let tag = tagged.primary_tag().expect("primary tag present");
    (
        tag.title().map(|s| s.to_string()),
        tag.artist().map(|s| s.to_string()),
        tag.album().map(|s| s.to_string()),
    )
}
