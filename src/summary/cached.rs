use crate::storage::SummaryCache;
use crate::summary::{Summarizer, SummaryError};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a cached summary
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Summarizer with a keyed cache in front
///
/// Cache read and write failures are logged and otherwise ignored; they
/// never stop a summary from being produced.
pub struct CachedSummarizer {
    inner: Arc<dyn Summarizer>,
    cache: Arc<dyn SummaryCache>,
    ttl: Duration,
}

impl CachedSummarizer {
    pub fn new(inner: Arc<dyn Summarizer>, cache: Arc<dyn SummaryCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    pub async fn summarize(&self, text: &str, cache_key: &str) -> Result<String, SummaryError> {
        match self.cache.get_summary(cache_key, self.ttl).await {
            Ok(Some(summary)) => {
                tracing::debug!("Summary cache hit for {}", cache_key);
                return Ok(summary);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Summary cache read failed for {}: {}", cache_key, e),
        }

        let summary = self.inner.summarize(text).await?;

        if let Err(e) = self.cache.put_summary(cache_key, &summary).await {
            tracing::warn!("Summary cache write failed for {}: {}", cache_key, e);
        }
        Ok(summary)
    }
}
