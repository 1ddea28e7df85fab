//! Storage module for persisting harvested data
//!
//! This module handles:
//! - SQLite database initialization and schema management
//! - The source registry and idempotent item upserts
//! - Run bookkeeping and the summary cache
//! - Forwarding items to a remote search index

mod fanout;
mod index;
mod schema;
mod sqlite;
mod traits;

pub use fanout::FanoutSink;
pub use index::HttpIndexSink;
pub use sqlite::SqliteStorage;
pub use traits::{
    ItemSink, RunLog, SourceRegistry, StorageError, StorageResult, SummaryCache,
};

use crate::config::Config;
use crate::model::RunSummary;
use crate::ConfigResult;
use std::path::Path;
use std::sync::Arc;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// The database, plus the remote index when `[index]` is configured
pub fn sink_from_config(config: &Config, storage: Arc<SqliteStorage>) -> ConfigResult<Arc<dyn ItemSink>> {
    match &config.index {
        Some(index) => {
            let index = HttpIndexSink::from_config(index)?;
            tracing::info!("Forwarding items to index at {}", index.endpoint());
            let sinks: Vec<Arc<dyn ItemSink>> = vec![storage, Arc::new(index)];
            Ok(Arc::new(FanoutSink::new(sinks)))
        }
        None => Ok(storage),
    }
}

/// A stored item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub source: String,
    pub title: String,
    pub url: String,
    pub date: Option<String>,
    pub upvotes: Option<i64>,
    pub discussion_url: Option<String>,
    pub content: String,
    pub first_seen_at: String,
    pub updated_at: String,
}

/// Per-source item counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    pub items: u64,
    pub empty_content: u64,
    pub last_updated: Option<String>,
}

/// A pipeline run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub summary: RunSummary,
}

/// Status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
