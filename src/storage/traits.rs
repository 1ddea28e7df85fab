//! Storage traits and error types
//!
//! The pipeline talks to persistence through three narrow collaborators:
//! a [`SourceRegistry`] it reads sources from, an [`ItemSink`] it upserts
//! enriched items into, and a [`SummaryCache`] used by the summarizer.

use crate::model::{EnrichedItem, RunSummary, SourceDescriptor};
use crate::storage::{RunRecord, RunStatus};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Source already exists: {0}")]
    DuplicateSource(String),

    #[error("Invalid source '{name}': {message}")]
    InvalidSource { name: String, message: String },

    #[error("Index request to {endpoint} failed: {message}")]
    Index { endpoint: String, message: String },

    #[error("{failed} of {total} sinks failed: {first}")]
    Fanout {
        failed: usize,
        total: usize,
        first: Box<StorageError>,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for enriched items
///
/// `upsert` must be idempotent under the `(source, url)` key: repeating a
/// call with unchanged items leaves one logical record per key.
#[async_trait]
pub trait ItemSink: Send + Sync {
    /// Upserts a batch, returning how many records were written
    async fn upsert(&self, source_name: &str, items: &[EnrichedItem]) -> StorageResult<usize>;
}

/// Source of truth for configured sources
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    async fn list_sources(&self) -> StorageResult<Vec<SourceDescriptor>>;
}

/// Keyed summary cache with expiry
#[async_trait]
pub trait SummaryCache: Send + Sync {
    /// Returns a cached summary younger than `ttl`
    async fn get_summary(&self, key: &str, ttl: Duration) -> StorageResult<Option<String>>;

    async fn put_summary(&self, key: &str, summary: &str) -> StorageResult<()>;
}

/// Run bookkeeping
pub trait RunLog: Send + Sync {
    fn start_run(&self, config_hash: &str) -> StorageResult<i64>;

    fn finish_run(&self, run_id: i64, status: RunStatus, summary: &RunSummary) -> StorageResult<()>;

    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
