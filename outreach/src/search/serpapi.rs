use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{SearchPage, SearchProvider};
use crate::error::{OutreachError, Result};

/// SerpApi client. One GET per page, no retries.
pub struct SerpApiClient {
    base_url: String,
    api_key: String,
    engine: String,
    language: String,
    client: Client,
}

impl SerpApiClient {
    /// Every request made by this client is bounded by `timeout_secs`.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("Outreach/0.1.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            engine: "google".to_string(),
            language: "en".to_string(),
            client,
        })
    }

    pub fn with_engine(mut self, engine: impl Into<String>, language: impl Into<String>) -> Self {
        self.engine = engine.into();
        self.language = language.into();
        self
    }
}

/// reqwest errors carry the request URL, and with it the `api_key` parameter.
fn redact(err: reqwest::Error) -> OutreachError {
    OutreachError::UpstreamRequest(err.without_url())
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search_page(&self, query: &str, start: usize, num: usize) -> Result<SearchPage> {
        let num = num.to_string();
        let start_param = start.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query),
                ("hl", self.language.as_str()),
                ("num", num.as_str()),
                ("start", start_param.as_str()),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(redact)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutreachError::UpstreamStatus { status, body });
        }

        let page = response.json::<SearchPage>().await.map_err(redact)?;
        debug!(
            start,
            organic = page.organic_results.as_ref().map_or(0, Vec::len),
            has_next = page.has_next(),
            "serpapi page"
        );
        Ok(page)
    }
}
