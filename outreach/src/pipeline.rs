use anyhow::anyhow;
use chrono_tz::Tz;
use common::{Config, Credentials};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{OutreachError, Result};
use crate::llm::summarizer::NewsletterSummarizer;
use crate::models::{IssueDate, SearchResult};
use crate::search::{site_query, ArticleFetcher};
use crate::storage::NewsletterStore;

/// Listing sent to the summarizer when the search came back empty.
pub const NO_RESULTS: &str = "No organic results found.";

/// Knobs the pipeline needs from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub site: String,
    pub timezone: Tz,
    pub max_results: usize,
    pub page_size: usize,
    /// Env var names, used to word configuration errors
    pub search_key_env: String,
    pub llm_key_env: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let zone = config.newsletter.timezone();
        let timezone: Tz = zone
            .parse()
            .map_err(|e| anyhow!("invalid newsletter.timezone '{}': {}", zone, e))?;

        Ok(Self {
            site: config.search.site().to_string(),
            timezone,
            max_results: config.search.max_results(),
            page_size: config.search.page_size(),
            search_key_env: config.search.api_key_env().to_string(),
            llm_key_env: config.llm.api_key_env().to_string(),
        })
    }
}

/// Check the cache, otherwise search, summarize and store.
pub struct Pipeline {
    store: Arc<dyn NewsletterStore>,
    fetcher: ArticleFetcher,
    summarizer: NewsletterSummarizer,
    settings: PipelineSettings,
    credentials: Credentials,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn NewsletterStore>,
        fetcher: ArticleFetcher,
        summarizer: NewsletterSummarizer,
        settings: PipelineSettings,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            fetcher,
            summarizer,
            settings,
            credentials,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Today's issue date in the configured zone, not the host's.
    pub fn today(&self) -> IssueDate {
        IssueDate::today_in(self.settings.timezone)
    }

    pub async fn todays_newsletter(&self) -> Result<String> {
        self.newsletter_for(self.today()).await
    }

    /// Cached newsletter for `date`, generating and storing it on a miss.
    ///
    /// Concurrent misses for the same date both generate; the later write wins.
    pub async fn newsletter_for(&self, date: IssueDate) -> Result<String> {
        self.ensure_credentials()?;

        let date_key = date.key();
        if let Some(cached) = self.store.get(&date_key).await?.filter(|c| !c.is_empty()) {
            info!(date = %date_key, "cache hit, returning stored newsletter");
            return Ok(cached);
        }

        info!(date = %date_key, "cache miss, generating newsletter");
        self.generate(date).await
    }

    /// Generate `date` again and overwrite whatever is stored.
    pub async fn regenerate(&self, date: IssueDate) -> Result<String> {
        self.ensure_credentials()?;
        info!(date = %date, "regenerating newsletter");
        self.generate(date).await
    }

    /// Today's site results narrowed by a free-text keyword. Nothing is cached.
    pub async fn search(&self, keyword: &str) -> Result<Vec<SearchResult>> {
        self.ensure_credentials()?;

        let today = self.today();
        let query = site_query(&self.settings.site, &today.path(), Some(keyword));
        info!(query = %query, "keyword search");
        self.fetcher
            .fetch_query(&query, self.settings.max_results, self.settings.page_size)
            .await
    }

    async fn generate(&self, date: IssueDate) -> Result<String> {
        let query = site_query(&self.settings.site, &date.path(), None);
        info!(query = %query, "search query");

        let results = self
            .fetcher
            .fetch_query(&query, self.settings.max_results, self.settings.page_size)
            .await?;

        let articles = format_search_results(&results);
        debug!(len = articles.len(), "formatted articles");

        // LLM failures come back as warning text and are stored like any newsletter
        let newsletter = self.summarizer.summarize(&articles).await;

        self.store.put(&date.key(), &newsletter).await?;
        Ok(newsletter)
    }

    fn ensure_credentials(&self) -> Result<()> {
        if self.credentials.search_api_key.is_none() {
            return Err(OutreachError::Configuration(self.settings.search_key_env.clone()));
        }
        if self.credentials.llm_api_key.is_none() {
            return Err(OutreachError::Configuration(self.settings.llm_key_env.clone()));
        }
        Ok(())
    }
}

/// Numbered, human-readable listing of results for the LLM prompt.
pub fn format_search_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "{}. {}\n   {}\n   {}\n",
                i + 1,
                result.title.as_deref().unwrap_or("No title"),
                result.link.as_deref().unwrap_or("No link"),
                result.snippet.as_deref().unwrap_or("No snippet"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_listing() {
        assert_eq!(format_search_results(&[]), "No organic results found.");
    }

    #[test]
    fn numbered_listing_with_placeholders() {
        let results = vec![
            SearchResult::new("Rates hold", "https://example.com/a", "The bank held rates."),
            SearchResult {
                title: None,
                link: Some("https://example.com/b".into()),
                snippet: None,
            },
        ];

        assert_eq!(
            format_search_results(&results),
            "1. Rates hold\n   https://example.com/a\n   The bank held rates.\n\n\
             2. No title\n   https://example.com/b\n   No snippet\n"
        );
    }

    #[test]
    fn settings_reject_unknown_zone() {
        let mut config = Config::default();
        config.newsletter.timezone = Some("Mars/Olympus_Mons".into());
        assert!(PipelineSettings::from_config(&config).is_err());
    }

    #[test]
    fn settings_default_to_honolulu() {
        let settings = PipelineSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.timezone, chrono_tz::Pacific::Honolulu);
        assert_eq!(settings.site, "https://www.hawaiinewsnow.com");
        assert_eq!(settings.max_results, 100);
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.search_key_env, "SERP_API_KEY");
    }
}
