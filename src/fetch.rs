//! HTTP fetching for candidate images and source pages
//!
//! All requests go through one [`ImageFetcher`] carrying the configured
//! timeout, user agent, and retry policy. Image responses must declare an
//! image content type before their bytes are accepted.

use crate::config::PipelineConfig;
use crate::error::{Result, TracksetError};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

/// Source of raw image bytes keyed by URL
///
/// Abstracted so the transcoder and collectors can be exercised in tests
/// without a network.
#[async_trait]
pub trait FetchImage: Send + Sync {
    /// Fetch the bytes at `url`, verifying the response declares an image
    /// content type
    async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP fetcher built from the pipeline configuration
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl ImageFetcher {
    /// Create a fetcher with the configured timeout, user agent, and retry
    /// policy
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TracksetError::network_error("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            retry: config.retry,
        })
    }

    /// Fetch a page or API response as text
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        self.retry
            .run("fetch text", || self.fetch_text_once(url))
            .await
    }

    /// Fetch raw bytes without a content-type requirement
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.retry
            .run("fetch bytes", || self.fetch_once(url, false))
            .await
    }

    async fn fetch_text_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TracksetError::network_error(format!("Failed to fetch {}", url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TracksetError::http_status(status, url));
        }

        response
            .text()
            .await
            .map_err(|e| TracksetError::network_error(format!("Failed to read body of {}", url), e))
    }

    async fn fetch_once(&self, url: &str, require_image: bool) -> Result<Vec<u8>> {
        debug!(url = %url, "Fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TracksetError::network_error(format!("Failed to fetch {}", url), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TracksetError::http_status(status, url));
        }

        if require_image {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if !content_type.contains("image") {
                return Err(TracksetError::content_type(format!(
                    "'{}' returned non-image content type '{}'",
                    url, content_type
                )));
            }
        }

        let bytes = response.bytes().await.map_err(|e| {
            TracksetError::network_error(format!("Failed to read body of {}", url), e)
        })?;

        debug!(url = %url, bytes = bytes.len(), "Fetched");
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl FetchImage for ImageFetcher {
    async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.retry
            .run("fetch image", || self.fetch_once(url, true))
            .await
    }
}
