//! Configuration conversion utilities for CLI arguments

use super::main_impl::PipelineArgs;
use crate::config::PipelineConfig;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use std::time::Duration;

/// Convert CLI arguments to a validated [`PipelineConfig`]
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a pipeline configuration from the shared CLI arguments
    pub(crate) fn from_args(args: &PipelineArgs) -> Result<PipelineConfig> {
        let mut builder = PipelineConfig::builder()
            .dataset_csv(&args.dataset)
            .images_dir(&args.images_dir)
            .request_timeout(Duration::from_secs(args.timeout))
            .retry(RetryPolicy {
                max_attempts: args.retries,
                ..RetryPolicy::default()
            })
            .max_images_per_label(args.max_images);

        if let Some(user_agent) = &args.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        builder.build().context("Invalid pipeline configuration")
    }
}
