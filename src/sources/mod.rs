//! Acquisition sources and the page-session contract they consume
//!
//! A source yields batches of [`Candidate`]s, one page of results at a
//! time. Browser automation internals are out of scope: dynamic sources are
//! written against the [`PageSession`] contract, for which this crate ships
//! only the plain-HTTP [`StaticPageSession`].

mod gallery;
mod inaturalist;
mod search;

pub use gallery::{download_candidates, GalleryConfig, GallerySource};
pub use inaturalist::{ObservationConfig, ObservationSource};
pub use search::{SearchApiConfig, SearchApiSource};

use crate::error::{Result, TracksetError};
use crate::fetch::ImageFetcher;
use crate::record::Candidate;
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

/// A paginated acquisition source
#[async_trait]
pub trait ImageSource {
    /// Yield the next page of candidates, or `None` when exhausted
    ///
    /// Implementations advance their cursor before any fallible work, so a
    /// caller that logs an error and calls again moves on to the next work
    /// item rather than retrying the failed one.
    async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>>;

    /// Human-readable description for log messages
    fn describe(&self) -> String;
}

/// Contract over a browser-automation session
///
/// Operations a dynamic page scraper needs: navigate, scroll to the bottom,
/// wait for a selector, click an element, and read the current document.
/// Interaction operations return `Ok(false)` when the session cannot perform
/// them, letting scrapers degrade to whatever the initial document contains.
#[async_trait]
pub trait PageSession: Send {
    /// Load a URL, replacing the current document
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Scroll to the bottom of the page, triggering lazy loading
    async fn scroll_to_bottom(&mut self) -> Result<()>;

    /// Wait until an element matching `selector` is present
    async fn wait_for(&mut self, selector: &str) -> Result<bool>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<bool>;

    /// The current document source
    fn page_source(&self) -> &str;
}

/// Plain-HTTP page session: one GET per navigation, no script execution
///
/// Scrolling and clicking are unsupported; `wait_for` degrades to a presence
/// check against the fetched document.
pub struct StaticPageSession {
    fetcher: ImageFetcher,
    source: String,
}

impl StaticPageSession {
    /// Create a session performing requests through the given fetcher
    pub fn new(fetcher: ImageFetcher) -> Self {
        Self {
            fetcher,
            source: String::new(),
        }
    }
}

#[async_trait]
impl PageSession for StaticPageSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(url = %url, "Navigating");
        self.source = self.fetcher.fetch_text(url).await?;
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        // No script engine; the initial document is all there is.
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str) -> Result<bool> {
        let parsed = parse_selector(selector)?;
        let document = Html::parse_document(&self.source);
        Ok(document.select(&parsed).next().is_some())
    }

    async fn click(&mut self, _selector: &str) -> Result<bool> {
        Ok(false)
    }

    fn page_source(&self) -> &str {
        &self.source
    }
}

/// Parse a CSS selector, mapping failures to a configuration error
pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| TracksetError::invalid_config(format!("bad selector '{}': {}", selector, e)))
}
