use serde::{Deserialize, Serialize};

/// A listing entry produced by a source handler, before content resolution
///
/// `url` is the canonical dedup key downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub title: String,
    pub url: String,
    /// Publication date (RFC 3339 where the source provides one)
    pub date: Option<String>,
    pub upvotes: Option<i64>,
    /// Discussion-thread URL tried before `url` during content resolution
    pub discussion_url: Option<String>,
}

impl RawItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            date: None,
            upvotes: None,
            discussion_url: None,
        }
    }
}

/// A raw item plus its resolved text
///
/// `content` is the empty string when resolution failed; that is a valid
/// terminal state rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub title: String,
    pub url: String,
    pub date: Option<String>,
    pub upvotes: Option<i64>,
    pub discussion_url: Option<String>,
    pub content: String,
}

impl EnrichedItem {
    pub fn new(item: RawItem, content: String) -> Self {
        Self {
            title: item.title,
            url: item.url,
            date: item.date,
            upvotes: item.upvotes,
            discussion_url: item.discussion_url,
            content,
        }
    }

    /// An item that skips content resolution
    pub fn without_content(item: RawItem) -> Self {
        Self::new(item, String::new())
    }

    /// Stable sink key derived from `(source, url)`
    pub fn record_id(&self, source_name: &str) -> String {
        format!("{}-{}", source_name, self.url)
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sources_processed: u32,
    pub sources_failed: u32,
    /// Items that went through content resolution
    pub items_resolved: u64,
    /// Items accepted by the sink
    pub items_persisted: u64,
    pub batches_failed: u32,
}

impl RunSummary {
    pub fn total_sources(&self) -> u32 {
        self.sources_processed + self.sources_failed
    }
}
