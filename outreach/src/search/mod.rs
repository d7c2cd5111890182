use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::SearchResult;

pub mod serpapi;

/// One page of search results as returned by the search API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub organic_results: Option<Vec<SearchResult>>,
    #[serde(default)]
    pub serpapi_pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

impl SearchPage {
    pub fn has_next(&self) -> bool {
        self.serpapi_pagination
            .as_ref()
            .map_or(false, |p| p.next.is_some())
    }

    pub fn into_results(self) -> Vec<SearchResult> {
        self.organic_results.unwrap_or_default()
    }
}

/// Transport for a single search page. `start` is the result offset.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search_page(&self, query: &str, start: usize, num: usize) -> Result<SearchPage>;
}

/// Search query restricted to one site's dated URL prefix, e.g.
/// `site:https://www.hawaiinewsnow.com/2024/01/15/`.
pub fn site_query(site: &str, date_path: &str, keyword: Option<&str>) -> String {
    let mut query = format!("site:{}/{}/", site.trim_end_matches('/'), date_path);
    if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        query.push(' ');
        query.push_str(keyword);
    }
    query
}

/// Collects organic results page by page.
#[derive(Clone)]
pub struct ArticleFetcher {
    provider: Arc<dyn SearchProvider>,
}

impl ArticleFetcher {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }

    /// Results for one site on one day, in upstream ranking order.
    pub async fn fetch(
        &self,
        site: &str,
        date_path: &str,
        max_results: usize,
        page_size: usize,
    ) -> Result<Vec<SearchResult>> {
        self.fetch_query(&site_query(site, date_path, None), max_results, page_size)
            .await
    }

    /// Pages through `query` until `max_results` are collected, a page comes back
    /// empty, or the API stops advertising a next page. Any failed page aborts.
    pub async fn fetch_query(
        &self,
        query: &str,
        max_results: usize,
        page_size: usize,
    ) -> Result<Vec<SearchResult>> {
        let mut collected = Vec::new();
        if max_results == 0 || page_size == 0 {
            return Ok(collected);
        }

        let mut start = 0;
        while collected.len() < max_results {
            let page = self.provider.search_page(query, start, page_size).await?;
            let has_next = page.has_next();
            let results = page.into_results();
            debug!(start, count = results.len(), "search page received");

            if results.is_empty() {
                break;
            }
            collected.extend(results);

            if !has_next {
                break;
            }
            start += page_size;
        }

        collected.truncate(max_results);
        info!(query = %query, total = collected.len(), "collected organic results");
        Ok(collected)
    }
}
