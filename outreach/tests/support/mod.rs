// Fakes shared by the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::Credentials;
use outreach::llm::summarizer::NewsletterSummarizer;
use outreach::llm::{LlmProvider, LlmRequest, LlmResponse, UsageMetadata};
use outreach::search::{ArticleFetcher, Pagination, SearchPage, SearchProvider};
use outreach::storage::{NewsletterStore, SqliteNewsletterStore};
use outreach::{OutreachError, Pipeline, PipelineSettings, SearchResult};
use sqlx::sqlite::SqlitePoolOptions;

/// Serves canned pages in order; records every query it receives.
pub struct FakeSearch {
    pages: Vec<SearchPage>,
    fail_with: Option<reqwest::StatusCode>,
    queries: Mutex<Vec<(String, usize)>>,
}

impl FakeSearch {
    pub fn with_pages(pages: Vec<SearchPage>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            fail_with: None,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: reqwest::StatusCode) -> Arc<Self> {
        Arc::new(Self {
            pages: Vec::new(),
            fail_with: Some(status),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search_page(
        &self,
        query: &str,
        start: usize,
        _num: usize,
    ) -> outreach::Result<SearchPage> {
        let mut queries = self.queries.lock().unwrap();
        let index = queries.len();
        queries.push((query.to_string(), start));

        if let Some(status) = self.fail_with {
            return Err(OutreachError::UpstreamStatus {
                status,
                body: "upstream unavailable".into(),
            });
        }
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

/// Replies with fixed text, or fails when `reply` is `None`.
pub struct FakeLlm {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl FakeLlm {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for FakeLlm {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt);
        match &self.reply {
            Some(text) => Ok(LlmResponse {
                content: text.clone(),
                usage: UsageMetadata::default(),
                model: "fake".into(),
            }),
            None => anyhow::bail!("LLM API error 503 Service Unavailable"),
        }
    }
}

pub fn results(count: usize) -> Vec<SearchResult> {
    (1..=count)
        .map(|i| {
            SearchResult::new(
                format!("Story {i}"),
                format!("https://www.hawaiinewsnow.com/2024/01/15/story-{i}/"),
                format!("Snippet {i}"),
            )
        })
        .collect()
}

/// A single page with no next link.
pub fn last_page(results: Vec<SearchResult>) -> SearchPage {
    SearchPage {
        organic_results: Some(results),
        serpapi_pagination: None,
    }
}

pub fn page_with_next(results: Vec<SearchResult>) -> SearchPage {
    SearchPage {
        organic_results: Some(results),
        serpapi_pagination: Some(Pagination {
            next: Some("https://serpapi.com/search?start=10".into()),
        }),
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        site: "https://www.hawaiinewsnow.com".into(),
        timezone: chrono_tz::Pacific::Honolulu,
        max_results: 100,
        page_size: 10,
        search_key_env: "SERP_API_KEY".into(),
        llm_key_env: "OPENROUTER_API_KEY".into(),
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        search_api_key: Some("serp-test".into()),
        llm_api_key: Some("llm-test".into()),
    }
}

pub async fn memory_store() -> Arc<SqliteNewsletterStore> {
    // One connection, otherwise every connection sees its own empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test pool");
    let store = SqliteNewsletterStore::new(pool);
    store.init().await.expect("init store");
    Arc::new(store)
}

/// Accepts connections and never answers. Returns its base URL.
pub async fn silent_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind silent server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// Nothing listens on port 1.
pub const CLOSED_PORT_URL: &str = "http://127.0.0.1:1";

pub struct Harness {
    pub pipeline: Arc<Pipeline>,
    pub search: Arc<FakeSearch>,
    pub llm: Arc<FakeLlm>,
    pub store: Arc<SqliteNewsletterStore>,
}

pub async fn harness(
    search: Arc<FakeSearch>,
    llm: Arc<FakeLlm>,
    credentials: Credentials,
) -> Harness {
    let store = memory_store().await;
    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        ArticleFetcher::new(search.clone()),
        NewsletterSummarizer::new(llm.clone()),
        settings(),
        credentials,
    ));
    Harness {
        pipeline,
        search,
        llm,
        store,
    }
}
