//! Application state for the API server

use crate::{Config, TrackDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The downloader all handlers delegate to
    pub downloader: Arc<TrackDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<TrackDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
