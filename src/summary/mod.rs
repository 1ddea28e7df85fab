//! On-demand article summaries
//!
//! A [`Summarizer`] turns text into a short summary. [`CachedSummarizer`]
//! puts a keyed, expiring [`SummaryCache`](crate::storage::SummaryCache)
//! in front of it so repeated requests for the same item skip the model.

mod cached;
mod http;

pub use cached::{CachedSummarizer, DEFAULT_TTL};
pub use http::HttpSummarizer;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the summarization model
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Nothing to summarize")]
    EmptyInput,

    #[error("Summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Summarizer returned HTTP {0}")]
    Status(u16),

    #[error("Summarizer response had no text")]
    EmptyResponse,
}

/// Text to summary
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}
