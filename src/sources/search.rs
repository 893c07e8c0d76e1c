//! JSON image-search API source
//!
//! Queries a Google-custom-search-shaped endpoint, one footprint keyword at
//! a time, and filters the hits: stock-photo domains are excluded, and a
//! candidate must mention at least one footprint keyword in its URL or
//! snippet. An API failure skips the rest of the current keyword's pages
//! and moves on to the next keyword.

use super::ImageSource;
use crate::error::{Result, TracksetError};
use crate::fetch::ImageFetcher;
use crate::record::Candidate;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// Configuration for the search API source
#[derive(Debug, Clone)]
pub struct SearchApiConfig {
    /// API endpoint
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Search engine id
    pub cx: String,
    /// Keywords combined with the animal name, one query batch per keyword
    pub keywords: Vec<String>,
    /// Result domains to drop
    pub excluded_domains: Vec<String>,
    /// Results requested per page
    pub results_per_page: usize,
    /// Cap on candidates yielded for the label
    pub max_images: usize,
}

impl SearchApiConfig {
    /// Defaults matching the historical collection runs
    pub fn new<K: Into<String>, C: Into<String>>(api_key: K, cx: C) -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            api_key: api_key.into(),
            cx: cx.into(),
            keywords: ["footprint", "paw print", "track", "tracks"]
                .map(String::from)
                .to_vec(),
            excluded_domains: ["shutterstock.com", "alamy.com"].map(String::from).to_vec(),
            results_per_page: 10,
            max_images: 20,
        }
    }

    fn pages_per_keyword(&self) -> usize {
        self.max_images / self.results_per_page.max(1) + 1
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
    #[serde(rename = "displayLink", default)]
    display_link: String,
    #[serde(default)]
    snippet: String,
}

/// One label's worth of paginated image search
pub struct SearchApiSource {
    config: SearchApiConfig,
    fetcher: ImageFetcher,
    label: String,
    keyword_idx: usize,
    page_idx: usize,
    yielded: HashSet<String>,
}

impl SearchApiSource {
    /// Create a source searching for one animal label
    pub fn new<L: Into<String>>(
        config: SearchApiConfig,
        fetcher: ImageFetcher,
        label: L,
    ) -> Self {
        Self {
            config,
            fetcher,
            label: label.into(),
            keyword_idx: 0,
            page_idx: 0,
            yielded: HashSet::new(),
        }
    }

    fn exhausted(&self) -> bool {
        self.keyword_idx >= self.config.keywords.len()
            || self.yielded.len() >= self.config.max_images
    }

    fn request_url(&self, keyword: &str, page: usize) -> Result<String> {
        let start_index = page * self.config.results_per_page + 1;
        let query = format!("{} {} -shutterstock -alamy", self.label, keyword);
        let url = reqwest::Url::parse_with_params(
            &self.config.endpoint,
            &[
                ("q", query.as_str()),
                ("cx", self.config.cx.as_str()),
                ("key", self.config.api_key.as_str()),
                ("searchType", "image"),
                ("imgSize", "medium"),
                ("num", &self.config.results_per_page.to_string()),
                ("start", &start_index.to_string()),
            ],
        )
        .map_err(|e| {
            TracksetError::invalid_config(format!(
                "bad search endpoint '{}': {}",
                self.config.endpoint, e
            ))
        })?;
        Ok(url.to_string())
    }

    /// Advance the cursor past the request that is about to run
    fn advance(&mut self) {
        self.page_idx += 1;
        if self.page_idx >= self.config.pages_per_keyword() {
            self.page_idx = 0;
            self.keyword_idx += 1;
        }
    }

    /// Skip what remains of the given keyword, landing on the one after it
    ///
    /// Idempotent with respect to [`advance`](Self::advance) having already
    /// rolled the cursor onto the next keyword, so a failure on a keyword's
    /// last page does not drop the following keyword.
    fn skip_keyword(&mut self, keyword_idx: usize) {
        self.page_idx = 0;
        self.keyword_idx = keyword_idx + 1;
    }

    fn accept_item(&self, item: &SearchItem) -> Option<String> {
        let url = item.link.as_deref()?;
        if url.is_empty() || self.yielded.contains(url) {
            return None;
        }

        let url_lower = url.to_lowercase();
        let snippet_lower = item.snippet.to_lowercase();
        let mentions_keyword = self
            .config
            .keywords
            .iter()
            .any(|k| url_lower.contains(k.as_str()) || snippet_lower.contains(k.as_str()));
        if !mentions_keyword {
            return None;
        }

        if self
            .config
            .excluded_domains
            .iter()
            .any(|domain| item.display_link.contains(domain.as_str()))
        {
            return None;
        }

        Some(url.to_string())
    }
}

#[async_trait]
impl ImageSource for SearchApiSource {
    async fn next_page(&mut self) -> Result<Option<Vec<Candidate>>> {
        if self.exhausted() {
            return Ok(None);
        }

        let keyword_idx = self.keyword_idx;
        let page_idx = self.page_idx;
        let keyword = self.config.keywords[keyword_idx].clone();
        self.advance();

        let url = self.request_url(&keyword, page_idx)?;
        let body = match self.fetcher.fetch_text(&url).await {
            Ok(body) => body,
            Err(e) => {
                // A failed page gives up on this keyword entirely.
                self.skip_keyword(keyword_idx);
                return Err(e);
            },
        };

        let response: SearchResponse = match serde_json::from_str::<SearchResponse>(&body) {
            Ok(response) => response,
            Err(e) => {
                self.skip_keyword(keyword_idx);
                return Err(TracksetError::network_error(
                    format!("Malformed search response for '{}'", keyword),
                    e,
                ));
            },
        };

        let mut batch = Vec::new();
        for item in &response.items {
            if self.yielded.len() >= self.config.max_images {
                break;
            }
            if let Some(url) = self.accept_item(item) {
                debug!(label = %self.label, url = %url, "Search hit");
                self.yielded.insert(url.clone());
                batch.push(Candidate::new(self.label.clone(), url));
            }
        }

        Ok(Some(batch))
    }

    fn describe(&self) -> String {
        format!("image search for '{}'", self.label)
    }
}
