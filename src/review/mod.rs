//! Interactive curation of a base64-encoded dataset
//!
//! Each row walks a small state machine: `Pending` rows whose payload fails
//! base64 or image decoding are rejected outright; the rest are `Displayed`
//! to a [`Reviewer`], whose decision is terminal. After the full scan the
//! accepted rows are written as a filtered CSV (same header, same relative
//! order) and as a label-partitioned tree of JPEG files. The input file is
//! never modified, and identical input plus identical decisions produces
//! byte-identical outputs.

#[cfg(feature = "cli")]
mod console;

#[cfg(feature = "cli")]
pub use console::ConsoleReviewer;

use crate::config::CurationOptions;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::record::{image_output_path, IMAGE_COLUMN, ID_COLUMN, LABEL_COLUMN};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// A reviewer's verdict on one displayed row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep the row
    Accept,
    /// Drop the row
    Reject,
}

/// Why a row ended up rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The image field was absent or empty
    MissingPayload,
    /// The payload was not well-formed base64
    InvalidBase64,
    /// The decoded bytes were not a decodable image
    UndecodableImage,
    /// The reviewer rejected it
    Operator,
}

/// Per-row review state; each row moves through it exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// Not yet examined
    Pending,
    /// Decoded and shown to the reviewer, awaiting a decision
    Displayed,
    /// Terminal: kept
    Accepted,
    /// Terminal: dropped
    Rejected(RejectReason),
}

/// What a reviewer sees for one row
#[derive(Debug)]
pub struct ReviewItem<'a> {
    /// Zero-based row position
    pub index: usize,
    /// Total rows in the run
    pub total: usize,
    /// Row id, when the dataset has an `id` column
    pub id: Option<&'a str>,
    /// Row label
    pub label: &'a str,
    /// The decoded image
    pub image: &'a DynamicImage,
}

/// Source of accept/reject decisions
///
/// The curation loop is decoupled from where decisions come from: an
/// interactive console, a scripted test driver, or anything else that can
/// answer per item.
pub trait Reviewer {
    /// Render the item and return a decision
    ///
    /// Only a failure of the decision channel itself (for example, stdin
    /// closing) should return an error; it aborts the run.
    fn review(&mut self, item: &ReviewItem<'_>) -> Result<Decision>;
}

/// Counters from one curation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurationOutcome {
    /// Rows in the input
    pub total: usize,
    /// Rows accepted by the reviewer
    pub accepted: usize,
    /// Rows the reviewer rejected
    pub rejected: usize,
    /// Rows rejected without prompting (bad payload)
    pub auto_rejected: usize,
    /// Image files written
    pub images_saved: usize,
    /// Accepted rows whose image could not be written
    pub save_failures: usize,
}

/// One configured curation run
#[derive(Debug)]
pub struct CurationSession {
    options: CurationOptions,
}

impl CurationSession {
    /// Create a session with the given options
    pub fn new(options: CurationOptions) -> Self {
        Self { options }
    }

    /// Review every row of `input` and persist the accepted set
    ///
    /// The whole dataset is held in memory: the outputs are written only
    /// after the full interactive scan. Per-image save failures are logged
    /// and do not abort the remaining saves.
    pub fn run<R: Reviewer>(&self, input: &Path, reviewer: &mut R) -> Result<CurationOutcome> {
        let dataset = Dataset::read_from_path(input)?;
        let url_idx = dataset.require_column(IMAGE_COLUMN)?;
        let label_idx = dataset.column_index(LABEL_COLUMN);
        let id_idx = dataset.column_index(ID_COLUMN);

        info!(input = %input.display(), rows = dataset.len(), "Starting review");

        let total = dataset.len();
        let mut states = vec![RowState::Pending; total];
        let mut outcome = CurationOutcome {
            total,
            ..CurationOutcome::default()
        };

        for (index, row) in dataset.rows().iter().enumerate() {
            let payload = row.get(url_idx).unwrap_or("");
            if payload.is_empty() {
                warn!(row = index, "Missing image payload; rejected");
                states[index] = RowState::Rejected(RejectReason::MissingPayload);
                outcome.auto_rejected += 1;
                continue;
            }

            let bytes = match BASE64.decode(payload) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(row = index, error = %e, "Invalid base64; rejected");
                    states[index] = RowState::Rejected(RejectReason::InvalidBase64);
                    outcome.auto_rejected += 1;
                    continue;
                },
            };

            let image = match image::load_from_memory(&bytes) {
                Ok(image) => image,
                Err(e) => {
                    warn!(row = index, error = %e, "Undecodable image; rejected");
                    states[index] = RowState::Rejected(RejectReason::UndecodableImage);
                    outcome.auto_rejected += 1;
                    continue;
                },
            };

            states[index] = RowState::Displayed;
            let item = ReviewItem {
                index,
                total,
                id: id_idx.and_then(|i| row.get(i)),
                label: label_idx.and_then(|i| row.get(i)).unwrap_or(""),
                image: &image,
            };

            match reviewer.review(&item)? {
                Decision::Accept => {
                    debug!(row = index, "Accepted");
                    states[index] = RowState::Accepted;
                    outcome.accepted += 1;
                },
                Decision::Reject => {
                    debug!(row = index, "Rejected by reviewer");
                    states[index] = RowState::Rejected(RejectReason::Operator);
                    outcome.rejected += 1;
                },
            }
        }

        let accepted_rows: Vec<usize> = states
            .iter()
            .enumerate()
            .filter(|(_, state)| matches!(state, RowState::Accepted))
            .map(|(index, _)| index)
            .collect();

        if let Some(output_csv) = &self.options.output_csv {
            let mut filtered = Dataset::with_headers(dataset.headers().iter());
            for &index in &accepted_rows {
                filtered.push_row(dataset.rows()[index].clone());
            }
            filtered.write_to_path(output_csv)?;
            info!(path = %output_csv.display(), rows = filtered.len(), "Wrote filtered dataset");
        }

        for &index in &accepted_rows {
            let row = &dataset.rows()[index];
            // Accepted rows always have a payload; the empty default keeps
            // the save loop total rather than panicking.
            let payload = row.get(url_idx).unwrap_or("");
            let label = label_idx.and_then(|i| row.get(i)).unwrap_or("");
            let id = id_idx.and_then(|i| row.get(i));

            match self.save_image(payload, label, id) {
                Ok(path) => {
                    info!(path = %path.display(), "Saved image");
                    outcome.images_saved += 1;
                },
                Err(e) => {
                    warn!(row = index, error = %e, "Failed to save image");
                    outcome.save_failures += 1;
                },
            }
        }

        info!(
            accepted = outcome.accepted,
            rejected = outcome.rejected,
            auto_rejected = outcome.auto_rejected,
            saved = outcome.images_saved,
            "Review complete"
        );
        Ok(outcome)
    }

    fn save_image(
        &self,
        payload: &str,
        label: &str,
        id: Option<&str>,
    ) -> Result<std::path::PathBuf> {
        let bytes = BASE64
            .decode(payload)
            .map_err(|e| crate::error::TracksetError::decode(format!("payload at save time: {}", e)))?;

        let path = image_output_path(&self.options.images_dir, label, id, payload);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                crate::error::TracksetError::file_io_error("create label directory", parent, e)
            })?;
        }
        std::fs::write(&path, bytes)
            .map_err(|e| crate::error::TracksetError::file_io_error("write image", &path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reviewer that replays a fixed script of decisions
    pub(crate) struct ScriptedReviewer {
        decisions: Vec<Decision>,
        next: usize,
    }

    impl ScriptedReviewer {
        pub(crate) fn new(decisions: Vec<Decision>) -> Self {
            Self { decisions, next: 0 }
        }
    }

    impl Reviewer for ScriptedReviewer {
        fn review(&mut self, _item: &ReviewItem<'_>) -> Result<Decision> {
            let decision = self.decisions.get(self.next).copied().unwrap_or(Decision::Reject);
            self.next += 1;
            Ok(decision)
        }
    }

    fn jpeg_payload() -> String {
        use image::{Rgb, RgbImage};
        use std::io::Cursor;

        let img = image::DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 40, 40])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
            .expect("encode jpeg");
        BASE64.encode(buf)
    }

    fn write_input(dir: &Path, rows: &[(&str, &str, &str)]) -> std::path::PathBuf {
        let mut dataset = Dataset::with_headers(["id", "animal", "image_url"]);
        for (id, animal, payload) in rows {
            dataset.push_row(csv::StringRecord::from_iter([*id, *animal, *payload]));
        }
        let path = dir.join("encoded.csv");
        dataset.write_to_path(&path).expect("write input");
        path
    }

    #[test]
    fn test_corrupted_base64_rejected_without_prompting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = jpeg_payload();
        let input = write_input(
            dir.path(),
            &[
                ("0", "lynx", payload.as_str()),
                ("1", "fox", "not-base64!!"),
                ("2", "moose", payload.as_str()),
            ],
        );

        let session = CurationSession::new(CurationOptions {
            output_csv: Some(dir.path().join("validated.csv")),
            images_dir: dir.path().join("images"),
        });

        // Two prompts only: the corrupted row never reaches the reviewer.
        let mut reviewer = ScriptedReviewer::new(vec![Decision::Accept, Decision::Accept]);
        let outcome = session.run(&input, &mut reviewer).expect("run");

        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.auto_rejected, 1);
        assert_eq!(outcome.images_saved, 2);

        let filtered = Dataset::read_from_path(dir.path().join("validated.csv")).expect("read");
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.rows()[0].get(1), Some("lynx"));
        assert_eq!(filtered.rows()[1].get(1), Some("moose"));
    }

    #[test]
    fn test_operator_rejection_excludes_row() {
        let dir = tempfile::tempdir().expect("tempdir");
        let payload = jpeg_payload();
        let input = write_input(
            dir.path(),
            &[("0", "lynx", payload.as_str()), ("1", "fox", payload.as_str())],
        );

        let session = CurationSession::new(CurationOptions {
            output_csv: Some(dir.path().join("validated.csv")),
            images_dir: dir.path().join("images"),
        });
        let mut reviewer = ScriptedReviewer::new(vec![Decision::Reject, Decision::Accept]);
        let outcome = session.run(&input, &mut reviewer).expect("run");

        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.rejected, 1);

        let filtered = Dataset::read_from_path(dir.path().join("validated.csv")).expect("read");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows()[0].get(1), Some("fox"));
    }
}
