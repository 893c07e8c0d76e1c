#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Trackset
//!
//! A toolkit for building labeled mammal track photo datasets: collecting
//! candidate image URLs from several web sources, embedding the images into
//! portable CSV files as base64, and interactively curating the result into
//! a validated dataset plus a label-partitioned image tree.
//!
//! The pipeline is strictly sequential: at most one HTTP request is in
//! flight at any time, with configurable delays between fetches.
//!
//! ## Pipeline stages
//!
//! - **Collection**: [`sources`] provide candidate `(animal, image_url)`
//!   rows from an image search API, a tracking-guide photo gallery, and a
//!   paginated observation site; [`collector::DedupCollector`] appends only
//!   URLs not already present in the destination CSV.
//! - **Transcoding**: [`transcode::transcode_csv`] replaces each row's URL
//!   with the base64 of its downloaded bytes, writing a sentinel for rows
//!   that cannot be resolved.
//! - **Curation**: [`review::CurationSession`] walks an encoded dataset,
//!   auto-rejecting undecodable rows and asking a [`review::Reviewer`] about
//!   the rest, then writes the accepted rows as a filtered CSV and as JPEG
//!   files named deterministically from a content digest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trackset::{CurationOptions, CurationSession, Decision, ReviewItem, Reviewer};
//! use std::path::Path;
//!
//! struct AcceptAll;
//!
//! impl Reviewer for AcceptAll {
//!     fn review(&mut self, _item: &ReviewItem<'_>) -> trackset::Result<Decision> {
//!         Ok(Decision::Accept)
//!     }
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let session = CurationSession::new(CurationOptions {
//!     output_csv: Some("validated.csv".into()),
//!     images_dir: "images".into(),
//! });
//! let outcome = session.run(Path::new("encoded.csv"), &mut AcceptAll)?;
//! println!("kept {} of {} rows", outcome.accepted, outcome.total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): command-line interface, progress bars, and tracing
//!   subscriber setup. Disable for library-only usage:
//!
//! ```toml
//! [dependencies]
//! trackset = { version = "0.1", default-features = false }
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod collector;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod footprint;
pub mod progress;
pub mod record;
pub mod retry;
pub mod review;
pub mod sources;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod transcode;

// Public API exports
pub use collector::{collect_from_source, DedupCollector};
pub use config::{CurationOptions, PipelineConfig, PipelineConfigBuilder};
pub use dataset::{append_candidates, load_seen_urls, merge_sources, Dataset, MergeInputs};
pub use error::{Result, TracksetError};
pub use fetch::{FetchImage, ImageFetcher};
pub use footprint::{has_strong_edges, EdgeFilterOptions};
pub use progress::ProgressIndicator;
pub use record::{sanitize_label, Candidate, UNRESOLVED_SENTINEL};
pub use retry::RetryPolicy;
pub use review::{
    CurationOutcome, CurationSession, Decision, RejectReason, ReviewItem, Reviewer, RowState,
};
pub use sources::{
    download_candidates, GalleryConfig, GallerySource, ImageSource, ObservationConfig,
    ObservationSource, PageSession, SearchApiConfig, SearchApiSource, StaticPageSession,
};
pub use transcode::{transcode_csv, transcode_dataset, TranscodeReport};

#[cfg(feature = "cli")]
pub use review::ConsoleReviewer;
#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
