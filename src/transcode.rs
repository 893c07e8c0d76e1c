//! Base64 transcoding of URL-valued datasets
//!
//! Rewrites the `image_url` column in place: each URL is fetched and
//! replaced with the standard base64 text encoding of the raw bytes, or with
//! the [`UNRESOLVED_SENTINEL`] on any failure. No rows are dropped at this
//! stage; validation is deferred to curation. A fixed delay is honored
//! between requests.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::fetch::FetchImage;
use crate::progress::ProgressIndicator;
use crate::record::{IMAGE_COLUMN, UNRESOLVED_SENTINEL};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use csv::StringRecord;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Counters from one transcode run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeReport {
    /// Rows in the input (and output)
    pub total: usize,
    /// Rows whose URL was replaced with base64 text
    pub encoded: usize,
    /// Rows marked with the unresolved sentinel
    pub unresolved: usize,
    /// Rows passed through untouched (empty or missing URL field)
    pub skipped: usize,
}

/// Transcode `input` into `output`, fetching every row's image URL
///
/// The output has exactly one row per input row, in input order, with every
/// column other than `image_url` unchanged. The input file is not modified.
pub async fn transcode_csv(
    input: &Path,
    output: &Path,
    fetcher: &dyn FetchImage,
    delay: Duration,
    progress: &ProgressIndicator,
) -> Result<TranscodeReport> {
    let dataset = Dataset::read_from_path(input)?;
    info!(
        input = %input.display(),
        rows = dataset.len(),
        "Transcoding dataset"
    );
    transcode_dataset(&dataset, output, fetcher, delay, progress).await
}

/// Transcode an already-loaded dataset into `output`
///
/// Lets a caller that has read the input for its own purposes (sizing a
/// progress bar, say) avoid a second read.
pub async fn transcode_dataset(
    dataset: &Dataset,
    output: &Path,
    fetcher: &dyn FetchImage,
    delay: Duration,
    progress: &ProgressIndicator,
) -> Result<TranscodeReport> {
    let url_idx = dataset.require_column(IMAGE_COLUMN)?;

    let mut out = Dataset::with_headers(dataset.headers().iter());
    let mut report = TranscodeReport {
        total: dataset.len(),
        ..TranscodeReport::default()
    };

    for (index, row) in dataset.rows().iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let replacement = match row.get(url_idx) {
            None | Some("") => {
                warn!(row = index, "Row has no image URL; passing through");
                report.skipped += 1;
                None
            },
            Some(url) => {
                progress.set_message(format!("Fetching {}", url));
                match fetcher.fetch_image_bytes(url).await {
                    Ok(bytes) => {
                        debug!(row = index, bytes = bytes.len(), "Encoded image");
                        report.encoded += 1;
                        Some(BASE64.encode(bytes))
                    },
                    Err(e) => {
                        warn!(row = index, url = %url, error = %e, "Marking row unresolved");
                        report.unresolved += 1;
                        Some(UNRESOLVED_SENTINEL.to_string())
                    },
                }
            },
        };

        out.push_row(replace_field(row, url_idx, replacement));
        progress.inc();
    }

    out.write_to_path(output)?;
    progress.finish_with_message(format!(
        "Encoded {}/{} rows ({} unresolved)",
        report.encoded, report.total, report.unresolved
    ));
    info!(
        output = %output.display(),
        encoded = report.encoded,
        unresolved = report.unresolved,
        "Transcode complete"
    );
    Ok(report)
}

/// Copy a row, substituting one field when a replacement is given
fn replace_field(row: &StringRecord, index: usize, replacement: Option<String>) -> StringRecord {
    match replacement {
        None => row.clone(),
        Some(value) => {
            let fields: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    if i == index {
                        value.clone()
                    } else {
                        field.to_string()
                    }
                })
                .collect();
            StringRecord::from_iter(fields)
        },
    }
}
