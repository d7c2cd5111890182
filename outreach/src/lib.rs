// Library interface for outreach modules
// This allows tests and the binary to import modules

pub mod error;
pub mod export;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod storage;
pub mod views;

pub use error::{OutreachError, Result};
pub use models::{IssueDate, SearchResult};
pub use pipeline::{Pipeline, PipelineSettings};
