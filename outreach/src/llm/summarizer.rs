// Newsletter summarizer
use std::sync::Arc;
use tracing::{info, warn};

use super::{LlmProvider, LlmRequest};

/// Instruction prepended to the article listing.
pub const NEWSLETTER_PROMPT: &str = "Write a business and accounting focused newsletter in markdown format \
with emojis and links that summarizes all of the articles:\n\n";

/// Returned in place of a newsletter whenever the LLM call fails.
pub const LLM_FAILURE_MESSAGE: &str = "⚠️ LLM request failed. Check your API key or network.";

/// Turns a formatted article listing into newsletter text.
#[derive(Clone)]
pub struct NewsletterSummarizer {
    provider: Arc<dyn LlmProvider>,
}

impl NewsletterSummarizer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Never fails: any provider error yields [`LLM_FAILURE_MESSAGE`].
    pub async fn summarize(&self, formatted_articles: &str) -> String {
        let request = LlmRequest::new(format!("{NEWSLETTER_PROMPT}{formatted_articles}"));

        match self.provider.generate(request).await {
            Ok(response) => {
                info!(
                    model = %response.model,
                    total_tokens = response.usage.total_tokens,
                    chars = response.content.len(),
                    "newsletter generated"
                );
                response.content
            }
            Err(e) => {
                warn!("LLM newsletter generation failed: {:#}", e);
                LLM_FAILURE_MESSAGE.to_string()
            }
        }
    }
}
