//! Tracking-guide gallery source
//!
//! Scrapes a gallery page of track photographs: applies the "tracks" filter,
//! exhausts the load-more button when the session supports clicking, then
//! queries every image container for its link, caption, and preview image.

use super::{parse_selector, ImageSource, PageSession};
use crate::error::Result;
use crate::fetch::FetchImage;
use crate::record::{sanitize_label, Candidate};
use async_trait::async_trait;
use scraper::Html;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the gallery source
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Gallery page URL
    pub url: String,
    /// Selector of the category filter to activate, if any
    pub filter_selector: Option<String>,
    /// Selector of the load-more button
    pub load_more_selector: String,
    /// Upper bound on load-more clicks
    pub max_load_more: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            url: "https://naturetracking.com/mammal-tracks/".to_string(),
            filter_selector: Some("div[data-filter-slug='tracks']".to_string()),
            load_more_selector: "div.jig-loadMoreButton".to_string(),
            max_load_more: 50,
        }
    }
}

/// Gallery source over any page session
pub struct GallerySource<S: PageSession> {
    config: GalleryConfig,
    session: S,
    done: bool,
}

impl<S: PageSession> GallerySource<S> {
    /// Create a gallery source on a fresh session
    pub fn new(config: GalleryConfig, session: S) -> Self {
        Self {
            config,
            session,
            done: false,
        }
    }

    async fn load_full_page(&mut self) -> Result<()> {
        self.session.navigate(&self.config.url).await?;

        if let Some(filter) = self.config.filter_selector.clone() {
            if !self.session.click(&filter).await? {
                debug!(selector = %filter, "Session cannot click the category filter");
            }
        }

        for _ in 0..self.config.max_load_more {
            if !self.session.click(&self.config.load_more_selector).await? {
                break;
            }
        }
        self.session.scroll_to_bottom().await?;

        if !self.session.wait_for(".jig-imageContainer").await? {
            warn!(url = %self.config.url, "No image containers found on gallery page");
        }
        Ok(())
    }
}

#[async_trait]
impl<S: PageSession> ImageSource for GallerySource<S> {
    async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;

        self.load_full_page().await?;
        let candidates = parse_gallery_document(self.session.page_source())?;
        info!(url = %self.config.url, candidates = candidates.len(), "Parsed gallery");
        Ok(Some(candidates))
    }

    fn describe(&self) -> String {
        format!("gallery at {}", self.config.url)
    }
}

/// Extract candidates from a gallery document
///
/// Each `.jig-imageContainer` contributes one candidate: the `a.jig-link`
/// href is the full-resolution URL, the `.jig-caption-title` text is the
/// label, and the `img.jig-photo-image` `src`/`data-src` is kept as a
/// preview. Containers missing the link or caption are skipped.
fn parse_gallery_document(source: &str) -> Result<Vec<Candidate>> {
    let container_sel = parse_selector(".jig-imageContainer")?;
    let link_sel = parse_selector("a.jig-link")?;
    let title_sel = parse_selector(".jig-caption-title")?;
    let photo_sel = parse_selector("img.jig-photo-image")?;

    let document = Html::parse_document(source);
    let mut candidates = Vec::new();

    for container in document.select(&container_sel) {
        let Some(link) = container.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href").filter(|h| !h.is_empty()) else {
            continue;
        };
        let Some(title) = container.select(&title_sel).next() else {
            continue;
        };
        let label = title.text().collect::<String>().trim().to_string();
        if label.is_empty() {
            continue;
        }

        let preview_url = container
            .select(&photo_sel)
            .next()
            .and_then(|img| img.value().attr("src").or_else(|| img.value().attr("data-src")))
            .map(String::from);

        candidates.push(Candidate {
            label,
            url: href.to_string(),
            preview_url,
            filename: url_basename(href),
        });
    }

    Ok(candidates)
}

/// Basename of a URL path, without query or fragment
fn url_basename(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    let path = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let base = path.rsplit('/').next()?;
    if base.is_empty() || !base.contains('.') {
        None
    } else {
        Some(base.to_string())
    }
}

/// Download gallery candidates into `<dir>/<label>/<filename>`
///
/// Per-item failures are logged and skipped; a fixed delay is honored
/// between downloads. Returns the number of files written.
pub async fn download_candidates(
    fetcher: &dyn FetchImage,
    candidates: &[Candidate],
    output_dir: &Path,
    delay: Duration,
) -> Result<usize> {
    let mut saved = 0usize;

    for (index, candidate) in candidates.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let label_dir = output_dir.join(sanitize_label(&candidate.label).to_lowercase());
        if let Err(e) = std::fs::create_dir_all(&label_dir) {
            warn!(dir = %label_dir.display(), error = %e, "Failed to create label directory");
            continue;
        }

        let filename = candidate
            .filename
            .clone()
            .or_else(|| url_basename(&candidate.url))
            .unwrap_or_else(|| format!("item_{}.jpg", index));
        let path = label_dir.join(filename);

        match fetcher.fetch_image_bytes(&candidate.url).await {
            Ok(bytes) => match std::fs::write(&path, &bytes) {
                Ok(()) => {
                    info!(path = %path.display(), "Downloaded image");
                    saved += 1;
                },
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to write image"),
            },
            Err(e) => warn!(url = %candidate.url, error = %e, "Failed to download image"),
        }
    }

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GALLERY_HTML: &str = r#"
        <html><body>
          <div class="jig-imageContainer">
            <a class="jig-link" href="https://tracks.test/photos/red-fox-track.jpg">
              <img class="jig-photo-image" src="https://tracks.test/previews/red-fox.jpg">
            </a>
            <div class="jig-caption-title"> Red Fox </div>
          </div>
          <div class="jig-imageContainer">
            <a class="jig-link" href="https://tracks.test/photos/moose.jpg"></a>
            <div class="jig-caption-title">Moose</div>
          </div>
          <div class="jig-imageContainer">
            <a class="jig-link" href=""></a>
            <div class="jig-caption-title">Broken</div>
          </div>
        </body></html>"#;

    #[test]
    fn test_parse_gallery_document() {
        let candidates = parse_gallery_document(GALLERY_HTML).expect("parse");
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].label, "Red Fox");
        assert_eq!(candidates[0].url, "https://tracks.test/photos/red-fox-track.jpg");
        assert_eq!(
            candidates[0].preview_url.as_deref(),
            Some("https://tracks.test/previews/red-fox.jpg")
        );
        assert_eq!(candidates[0].filename.as_deref(), Some("red-fox-track.jpg"));

        assert_eq!(candidates[1].label, "Moose");
        assert!(candidates[1].preview_url.is_none());
    }

    #[test]
    fn test_url_basename() {
        assert_eq!(
            url_basename("https://x.test/a/b/track.jpg?w=300"),
            Some("track.jpg".to_string())
        );
        assert_eq!(url_basename("https://x.test/a/b/"), None);
        assert_eq!(url_basename("https://x.test"), None);
    }
}
