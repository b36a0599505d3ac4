//! Best-effort cover-art download

use super::CoverArt;
use crate::config::CoverArtConfig;
use crate::error::{CoverArtError, CoverArtResult};

/// Downloads cover images over HTTP(S) with a size and time budget
#[derive(Debug, Clone)]
pub struct CoverFetcher {
    client: reqwest::Client,
    config: CoverArtConfig,
}

impl CoverFetcher {
    /// Create a fetcher using `config` limits
    pub fn new(config: CoverArtConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Download the image at `url`
    ///
    /// Rejects non-http(s) URLs, non-success statuses, empty bodies, and bodies
    /// larger than `max_bytes`.
    pub async fn fetch(&self, url: &str) -> CoverArtResult<CoverArt> {
        if !self.config.enabled {
            return Err(CoverArtError::Unusable(
                "cover art fetching is disabled".to_string(),
            ));
        }

        let parsed = url::Url::parse(url).map_err(|e| CoverArtError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(CoverArtError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let mut response = self
            .client
            .get(parsed)
            .timeout(self.config.fetch_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoverArtError::Status {
                status: status.as_u16(),
            });
        }

        let max = self.config.max_bytes;
        if let Some(len) = response.content_length() {
            if len > max as u64 {
                return Err(CoverArtError::Unusable(format!(
                    "image is {len} bytes, limit is {max}"
                )));
            }
        }

        let mut data = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if data.len() + chunk.len() > max {
                return Err(CoverArtError::Unusable(format!(
                    "image exceeds {max} bytes"
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(CoverArtError::Unusable("empty response body".to_string()));
        }

        tracing::debug!(url, bytes = data.len(), "Fetched cover art");
        Ok(CoverArt::new(data))
    }
}
