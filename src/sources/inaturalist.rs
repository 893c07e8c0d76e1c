//! Observation-site source (iNaturalist-shaped)
//!
//! Pages through an observation search for mammal track photos. The photo
//! grid is rendered as thumbnails whose image lives in an inline
//! `background-image` style; the species name sits in a caption next to it.
//! Paging stops at the first page with no photo elements.

use super::{parse_selector, ImageSource, PageSession};
use crate::error::Result;
use crate::record::Candidate;
use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info};

/// Configuration for the observation source
#[derive(Debug, Clone)]
pub struct ObservationConfig {
    /// Observation search base URL
    pub base_url: String,
    /// Free-text query
    pub query: String,
    /// Taxon filter
    pub iconic_taxa: String,
    /// Upper bound on pages fetched
    pub max_pages: usize,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.inaturalist.org/observations".to_string(),
            query: "track".to_string(),
            iconic_taxa: "Mammalia".to_string(),
            max_pages: 20,
        }
    }
}

impl ObservationConfig {
    fn page_url(&self, page: usize) -> String {
        format!(
            "{}?photos&q={}&iconic_taxa={}&page={}",
            self.base_url, self.query, self.iconic_taxa, page
        )
    }
}

/// Paginated observation-site source over any page session
pub struct ObservationSource<S: PageSession> {
    config: ObservationConfig,
    session: S,
    next_page: usize,
    done: bool,
}

impl<S: PageSession> ObservationSource<S> {
    /// Create a source starting at page 1
    pub fn new(config: ObservationConfig, session: S) -> Self {
        Self {
            config,
            session,
            next_page: 1,
            done: false,
        }
    }
}

#[async_trait]
impl<S: PageSession> ImageSource for ObservationSource<S> {
    async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>> {
        if self.done || self.next_page > self.config.max_pages {
            return Ok(None);
        }

        let page = self.next_page;
        self.next_page += 1;

        let url = self.config.page_url(page);
        self.session.navigate(&url).await?;
        self.session.scroll_to_bottom().await?;

        if !self.session.wait_for(".photo.has-photo").await? {
            debug!(page, "No more photos; stopping");
            self.done = true;
            return Ok(None);
        }

        let candidates = parse_observation_document(self.session.page_source(), page)?;
        if candidates.is_empty() {
            self.done = true;
            return Ok(None);
        }

        info!(page, candidates = candidates.len(), "Parsed observation page");
        Ok(Some(candidates))
    }

    fn describe(&self) -> String {
        format!("observations at {}", self.config.base_url)
    }
}

/// Extract candidates from one observation page
fn parse_observation_document(source: &str, page: usize) -> Result<Vec<Candidate>> {
    let thumbnail_sel = parse_selector("div.thumbnail")?;
    let photo_sel = parse_selector(".photo.has-photo")?;
    let name_sel = parse_selector(".display-name.comname, .secondary-name")?;

    let document = Html::parse_document(source);
    let mut candidates = Vec::new();

    for thumbnail in document.select(&thumbnail_sel) {
        let Some(photo) = thumbnail.select(&photo_sel).next() else {
            continue;
        };
        let Some(url) = photo.value().attr("style").and_then(extract_style_url) else {
            continue;
        };

        let label = thumbnail
            .select(&name_sel)
            .next()
            .map(|name| {
                name.text()
                    .collect::<String>()
                    .trim()
                    .to_lowercase()
                    .replace(' ', "_")
            })
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "unknown_animal".to_string());

        let index = candidates.len() + 1;
        candidates.push(Candidate {
            url,
            filename: Some(format!("{}_{}_{}.jpg", page, index, label)),
            label,
            preview_url: None,
        });
    }

    Ok(candidates)
}

/// Pull the URL out of an inline `background-image: url("...")` style
fn extract_style_url(style: &str) -> Option<String> {
    let (_, rest) = style.split_once("url(\"")?;
    let (url, _) = rest.split_once("\")")?;
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBSERVATION_HTML: &str = r#"
        <html><body>
          <div class="thumbnail borderless d-flex flex-column">
            <div class="photo has-photo" style="background-image: url(&quot;https://inat.test/photos/1/medium.jpg&quot;);"></div>
            <div class="display-name comname">Canada Lynx</div>
          </div>
          <div class="thumbnail borderless d-flex flex-column">
            <div class="photo has-photo" style="background-image: url(&quot;https://inat.test/photos/2/medium.jpg&quot;);"></div>
          </div>
          <div class="thumbnail borderless d-flex flex-column">
            <div class="photo"></div>
            <div class="display-name comname">No Photo Here</div>
          </div>
        </body></html>"#;

    #[test]
    fn test_extract_style_url() {
        assert_eq!(
            extract_style_url(r#"background-image: url("https://x.test/p.jpg");"#),
            Some("https://x.test/p.jpg".to_string())
        );
        assert_eq!(extract_style_url("color: red"), None);
    }

    #[test]
    fn test_parse_observation_document() {
        let candidates = parse_observation_document(OBSERVATION_HTML, 3).expect("parse");
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].label, "canada_lynx");
        assert_eq!(candidates[0].url, "https://inat.test/photos/1/medium.jpg");
        assert_eq!(candidates[0].filename.as_deref(), Some("3_1_canada_lynx.jpg"));

        assert_eq!(candidates[1].label, "unknown_animal");
        assert_eq!(candidates[1].filename.as_deref(), Some("3_2_unknown_animal.jpg"));
    }

    #[test]
    fn test_page_url() {
        let config = ObservationConfig::default();
        assert!(config.page_url(2).ends_with("page=2"));
        assert!(config.page_url(2).contains("iconic_taxa=Mammalia"));
    }
}
