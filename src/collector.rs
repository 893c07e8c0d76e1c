//! Deduplicating candidate collector
//!
//! Accumulates `(label, url)` pairs from a source while skipping URLs
//! already present in the destination CSV. The seen-set is loaded once at
//! construction; the destination file is append-only.

use crate::dataset::{append_candidates, load_seen_urls};
use crate::error::Result;
use crate::fetch::FetchImage;
use crate::footprint::{has_strong_edges, EdgeFilterOptions};
use crate::record::Candidate;
use crate::sources::ImageSource;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Collector that appends new candidates to a destination CSV
#[derive(Debug)]
pub struct DedupCollector {
    destination: PathBuf,
    seen: HashSet<String>,
    pending: Vec<Candidate>,
}

impl DedupCollector {
    /// Create a collector, loading the seen-set from the destination file
    pub fn load<P: Into<PathBuf>>(destination: P) -> Result<Self> {
        let destination = destination.into();
        let seen = load_seen_urls(&destination)?;
        info!(
            destination = %destination.display(),
            known_urls = seen.len(),
            "Collector ready"
        );
        Ok(Self {
            destination,
            seen,
            pending: Vec::new(),
        })
    }

    /// Whether a URL is already recorded or pending
    pub fn is_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Buffer a candidate unless its URL was already seen
    ///
    /// Returns `true` when the candidate was added.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if !self.seen.insert(candidate.url.clone()) {
            debug!(url = %candidate.url, "Skipping duplicate URL");
            return false;
        }
        self.pending.push(candidate);
        true
    }

    /// Number of buffered candidates
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Append the buffered batch to the destination file
    ///
    /// An empty batch leaves the destination untouched. Returns the number
    /// of rows written.
    pub fn commit(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            debug!("Nothing to commit");
            return Ok(0);
        }
        let written = append_candidates(&self.destination, &self.pending)?;
        self.pending.clear();
        Ok(written)
    }
}

/// Drain a source into a collector and commit the result
///
/// Page failures are logged and the source moves on to its next work item;
/// they never abort the run. When an edge filter is supplied, each new
/// candidate's image is fetched and must pass [`has_strong_edges`]; fetch or
/// decode failures drop the candidate. Returns the number of rows appended.
pub async fn collect_from_source<S: ImageSource + ?Sized>(
    source: &mut S,
    collector: &mut DedupCollector,
    edge_filter: Option<(&dyn FetchImage, &EdgeFilterOptions)>,
) -> Result<usize> {
    let description = source.describe();

    loop {
        match source.next_page().await {
            Ok(None) => break,
            Ok(Some(batch)) => {
                for candidate in batch {
                    if collector.is_seen(&candidate.url) {
                        debug!(url = %candidate.url, "Already recorded");
                        continue;
                    }

                    if let Some((fetcher, options)) = edge_filter {
                        match passes_edge_filter(fetcher, &candidate, options).await {
                            Ok(true) => {},
                            Ok(false) => {
                                debug!(url = %candidate.url, "Rejected by edge filter");
                                continue;
                            },
                            Err(e) => {
                                warn!(url = %candidate.url, error = %e, "Could not screen candidate");
                                continue;
                            },
                        }
                    }

                    collector.push(candidate);
                }
            },
            Err(e) => {
                warn!(source = %description, error = %e, "Page failed, continuing");
            },
        }
    }

    let appended = collector.commit()?;
    info!(source = %description, appended, "Collection finished");
    Ok(appended)
}

async fn passes_edge_filter(
    fetcher: &dyn FetchImage,
    candidate: &Candidate,
    options: &EdgeFilterOptions,
) -> Result<bool> {
    let bytes = fetcher.fetch_image_bytes(&candidate.url).await?;
    let image = image::load_from_memory(&bytes)?;
    Ok(has_strong_edges(&image, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn test_push_skips_duplicates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut collector = DedupCollector::load(dir.path().join("tracks.csv")).expect("collector");

        assert!(collector.push(Candidate::new("lynx", "https://x.test/1.jpg")));
        assert!(!collector.push(Candidate::new("lynx", "https://x.test/1.jpg")));
        assert!(collector.push(Candidate::new("fox", "https://x.test/2.jpg")));
        assert_eq!(collector.pending(), 2);
    }

    #[test]
    fn test_seen_set_loaded_from_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracks.csv");
        append_candidates(&path, &[Candidate::new("lynx", "https://x.test/old.jpg")])
            .expect("seed");

        let mut collector = DedupCollector::load(&path).expect("collector");
        assert!(collector.is_seen("https://x.test/old.jpg"));
        assert!(!collector.push(Candidate::new("lynx", "https://x.test/old.jpg")));
    }

    #[test]
    fn test_empty_commit_does_not_create_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracks.csv");

        let mut collector = DedupCollector::load(&path).expect("collector");
        assert_eq!(collector.commit().expect("commit"), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_commit_appends_and_clears() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracks.csv");

        let mut collector = DedupCollector::load(&path).expect("collector");
        collector.push(Candidate::new("lynx", "https://x.test/1.jpg"));
        assert_eq!(collector.commit().expect("commit"), 1);
        assert_eq!(collector.pending(), 0);

        let dataset = Dataset::read_from_path(&path).expect("read");
        assert_eq!(dataset.len(), 1);
    }
}
