use thiserror::Error;

/// Failures the newsletter pipeline can surface to its callers.
///
/// LLM failures never appear here: the summarizer swaps them for a warning
/// text instead of failing the request.
#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("{0} is not set in the environment.")]
    Configuration(String),

    #[error("Search API returned {status}: {body}")]
    UpstreamStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Holds the error with its request URL removed.
    #[error("Search request failed: {0}")]
    UpstreamRequest(#[source] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl OutreachError {
    /// True for both flavours of search API failure.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::UpstreamStatus { .. } | Self::UpstreamRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, OutreachError>;
