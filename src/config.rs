//! Configuration types for the collection, transcoding, and curation pipelines
//!
//! All paths, delays, and limits are resolved once at startup and passed
//! explicitly to every component; no module-level globals.

use crate::error::{Result, TracksetError};
use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-request timeout (matches the acquisition scripts' 10s bound)
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default inter-row delay honored by the transcoder
pub const DEFAULT_TRANSCODE_DELAY: Duration = Duration::from_secs(1);

/// Default delay between gallery image downloads
pub const DEFAULT_DOWNLOAD_DELAY: Duration = Duration::from_secs(2);

/// Process-wide pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Destination CSV the collectors append to
    pub dataset_csv: PathBuf,

    /// Root of the label-partitioned image tree written by curation
    pub images_dir: PathBuf,

    /// Bound on every HTTP request
    pub request_timeout: Duration,

    /// Fixed delay between transcoder rows
    pub transcode_delay: Duration,

    /// Fixed delay between bulk image downloads
    pub download_delay: Duration,

    /// Retry policy applied to every network-calling operation
    pub retry: RetryPolicy,

    /// Cap on candidate images collected per label
    pub max_images_per_label: usize,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_csv: PathBuf::from("tracks.csv"),
            images_dir: PathBuf::from("images"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            transcode_delay: DEFAULT_TRANSCODE_DELAY,
            download_delay: DEFAULT_DOWNLOAD_DELAY,
            retry: RetryPolicy::default(),
            max_images_per_label: 20,
            user_agent: concat!("trackset/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(TracksetError::invalid_config(
                "request timeout must be non-zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(TracksetError::invalid_config(
                "retry policy needs at least one attempt",
            ));
        }
        if self.max_images_per_label == 0 {
            return Err(TracksetError::invalid_config(
                "max images per label must be at least 1",
            ));
        }
        if self.user_agent.is_empty() {
            return Err(TracksetError::invalid_config("user agent cannot be empty"));
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`] with validation at build time
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Create a builder holding the defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination CSV path
    #[must_use]
    pub fn dataset_csv<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.dataset_csv = path.into();
        self
    }

    /// Set the curation image tree root
    #[must_use]
    pub fn images_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.images_dir = path.into();
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the transcoder inter-row delay
    #[must_use]
    pub fn transcode_delay(mut self, delay: Duration) -> Self {
        self.config.transcode_delay = delay;
        self
    }

    /// Set the bulk download delay
    #[must_use]
    pub fn download_delay(mut self, delay: Duration) -> Self {
        self.config.download_delay = delay;
        self
    }

    /// Set the retry policy
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the per-label candidate cap
    #[must_use]
    pub fn max_images_per_label(mut self, max: usize) -> Self {
        self.config.max_images_per_label = max;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Options for one curation run
///
/// The filtered CSV is optional; the image tree is always written. This is
/// the single parameterized form of the historically copy-pasted review
/// variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationOptions {
    /// Where to write the filtered CSV of accepted rows, if anywhere
    pub output_csv: Option<PathBuf>,
    /// Root of the label-partitioned image tree
    pub images_dir: PathBuf,
}

impl Default for CurationOptions {
    fn default() -> Self {
        Self {
            output_csv: None,
            images_dir: PathBuf::from("images"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = PipelineConfig::builder().build().expect("default config");
        assert_eq!(config.max_images_per_label, 20);
        assert_eq!(config.transcode_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = PipelineConfig::builder()
            .request_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(TracksetError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let result = PipelineConfig::builder()
            .retry(RetryPolicy {
                max_attempts: 0,
                base_delay: Duration::from_secs(1),
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_sets_paths() {
        let config = PipelineConfig::builder()
            .dataset_csv("data/tracks.csv")
            .images_dir("data/images")
            .build()
            .expect("config");
        assert_eq!(config.dataset_csv, PathBuf::from("data/tracks.csv"));
        assert_eq!(config.images_dir, PathBuf::from("data/images"));
    }
}
