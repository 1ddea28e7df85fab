use crate::browser::ResourceKind;
use crate::model::SourceDescriptor;
use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure for News Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub index: Option<IndexConfig>,
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceDescriptor>,
}

/// Batching and politeness settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Items resolved concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between consecutive batches (milliseconds)
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_ms: u64,

    /// Pause between sequential API detail requests (milliseconds)
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,

    /// Story identifiers taken from a story-index API
    #[serde(default = "default_api_top_n")]
    pub api_top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            inter_batch_delay_ms: default_inter_batch_delay(),
            item_delay_ms: default_item_delay(),
            api_top_n: default_api_top_n(),
        }
    }
}

/// Which browser substrate drives page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserBackend {
    /// Headless Chrome over the DevTools protocol
    Chromium,
    /// Plain HTTP fetch of the static HTML
    Http,
}

/// How the pause before a retry grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryBackoff {
    /// Same pause before every retry
    #[default]
    Fixed,
    /// Pause doubles per retry, capped at `retry-max-delay-ms`
    Exponential,
}

/// Browser and navigation policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserConfig {
    #[serde(default = "default_backend")]
    pub backend: BrowserBackend,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Path to a Chrome/Chromium binary; autodetected when absent
    #[serde(default)]
    pub executable: Option<String>,

    /// Extra command-line arguments for the browser process
    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    #[serde(default = "default_listing_navigation_timeout")]
    pub listing_navigation_timeout_ms: u64,

    #[serde(default = "default_body_wait_timeout")]
    pub body_wait_timeout_ms: u64,

    #[serde(default = "default_selector_wait_timeout")]
    pub selector_wait_timeout_ms: u64,

    /// Total content-resolution attempts per URL
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause before a retry (milliseconds); 0 retries immediately
    #[serde(default)]
    pub retry_delay_ms: u64,

    #[serde(default)]
    pub retry_backoff: RetryBackoff,

    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,

    #[serde(default = "default_blocked_resources")]
    pub blocked_resources: Vec<ResourceKind>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            headless: true,
            executable: None,
            args: Vec::new(),
            user_agent: default_user_agent(),
            navigation_timeout_ms: default_navigation_timeout(),
            listing_navigation_timeout_ms: default_listing_navigation_timeout(),
            body_wait_timeout_ms: default_body_wait_timeout(),
            selector_wait_timeout_ms: default_selector_wait_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: 0,
            retry_backoff: RetryBackoff::Fixed,
            retry_max_delay_ms: default_retry_max_delay(),
            blocked_resources: default_blocked_resources(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Daily run schedule
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Local wall-clock time as `HH:MM`
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daily_at: default_daily_at(),
        }
    }
}

/// Remote search index receiving upserts alongside the database
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexConfig {
    pub endpoint: String,

    /// Environment variable holding the index API key
    #[serde(default = "default_index_key_env")]
    pub api_key_env: String,

    /// Upper bound on one upsert request (milliseconds)
    #[serde(default = "default_index_timeout")]
    pub timeout_ms: u64,
}

/// Completion endpoint used for on-demand summaries
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SummarizerConfig {
    pub endpoint: String,
    pub model: String,

    #[serde(default = "default_summarizer_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    #[serde(default = "default_summarizer_timeout")]
    pub timeout_ms: u64,
}

/// User-defined extraction profile
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileConfig {
    /// Content-container selectors, tried in order
    pub selectors: Vec<String>,

    /// Replaces the shared denylist when present
    #[serde(default)]
    pub denylist: Option<Vec<String>>,

    #[serde(default = "default_true")]
    pub body_fallback: bool,
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    5
}

fn default_inter_batch_delay() -> u64 {
    1000
}

fn default_item_delay() -> u64 {
    100
}

fn default_api_top_n() -> usize {
    30
}

fn default_backend() -> BrowserBackend {
    if cfg!(feature = "chromium") {
        BrowserBackend::Chromium
    } else {
        BrowserBackend::Http
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_navigation_timeout() -> u64 {
    15_000
}

fn default_listing_navigation_timeout() -> u64 {
    30_000
}

fn default_body_wait_timeout() -> u64 {
    2_000
}

fn default_selector_wait_timeout() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_max_delay() -> u64 {
    30_000
}

fn default_blocked_resources() -> Vec<ResourceKind> {
    vec![
        ResourceKind::Image,
        ResourceKind::Stylesheet,
        ResourceKind::Font,
        ResourceKind::Media,
    ]
}

fn default_daily_at() -> String {
    "05:00".to_string()
}

fn default_index_key_env() -> String {
    "INDEX_API_KEY".to_string()
}

fn default_index_timeout() -> u64 {
    30_000
}

fn default_summarizer_timeout() -> u64 {
    60_000
}

fn default_summarizer_key_env() -> String {
    "SUMMARIZER_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_cache_ttl_hours() -> u64 {
    24
}
