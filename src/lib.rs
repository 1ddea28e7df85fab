//! News Harvester: a resilient content-acquisition pipeline
//!
//! This crate ingests items from API feeds, RSS feeds and browser-scraped
//! listing pages, resolves each item's article text through a headless
//! browser, and upserts the enriched records into a searchable sink.

pub mod browser;
pub mod config;
pub mod dispatch;
pub mod extract;
pub mod fetcher;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod summary;
pub mod url;

use thiserror::Error;

/// Main error type for News Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed parse error for {url}: {message}")]
    Feed { url: String, message: String },

    #[error("Listing extraction failed for {url}: {message}")]
    Listing { url: String, message: String },

    #[error("Unexpected API response from {url}: {message}")]
    Api { url: String, message: String },

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Summary error: {0}")]
    Summary(#[from] summary::SummaryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Content resolution failed for {url}: {message}")]
    Content { url: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Result type alias for News Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{EnrichedItem, RawItem, RunSummary, SourceDescriptor, SourceKind};
pub use pipeline::{BatchProcessor, Orchestrator};
