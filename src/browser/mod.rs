//! Browser automation substrate
//!
//! The pipeline only needs a handful of primitives from a browser:
//! launch, open a page, navigate, wait for a selector, snapshot the DOM
//! and close. They are expressed as object-safe async traits so the
//! headless Chrome backend, the plain HTTP backend and test fakes are
//! interchangeable.

#[cfg(feature = "chromium")]
mod chromium;
mod http;
mod session;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumLauncher;
pub use http::HttpLauncher;
pub use session::PageSession;

use crate::config::{BrowserBackend, BrowserConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by browser backends
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {elapsed_ms}ms waiting for {what}")]
    Timeout { what: String, elapsed_ms: u64 },

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Page is already closed")]
    Closed,
}

impl BrowserError {
    pub(crate) fn timeout(what: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Result type alias for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Sub-resource classes that can be aborted during navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Stylesheet,
    Font,
    Media,
    Script,
}

/// Navigation policy applied when a page session opens
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    pub navigation_timeout: Duration,
    pub user_agent: Option<String>,
    pub blocked: Vec<ResourceKind>,
}

impl NavigationOptions {
    /// Policy for item pages visited during content resolution
    pub fn for_items(config: &BrowserConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            user_agent: Some(config.user_agent.clone()),
            blocked: config.blocked_resources.clone(),
        }
    }

    /// Policy for listing pages, which get a longer navigation budget
    pub fn for_listings(config: &BrowserConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(config.listing_navigation_timeout_ms),
            ..Self::for_items(config)
        }
    }
}

/// A single open tab
#[async_trait]
pub trait Page: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()>;

    /// Installs interception aborting the given resource kinds
    async fn block_resources(&self, kinds: &[ResourceKind]) -> BrowserResult<()>;

    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Serialized HTML of the current DOM
    async fn content(&self) -> BrowserResult<String>;

    async fn close(&self) -> BrowserResult<()>;
}

/// A running browser instance
#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>>;

    async fn close(&self) -> BrowserResult<()>;
}

/// Starts browser instances
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>>;
}

/// Builds the launcher selected by `[browser].backend`
pub fn launcher_from_config(config: &BrowserConfig) -> BrowserResult<Arc<dyn BrowserLauncher>> {
    match config.backend {
        #[cfg(feature = "chromium")]
        BrowserBackend::Chromium => Ok(Arc::new(ChromiumLauncher::from_config(config))),
        #[cfg(not(feature = "chromium"))]
        BrowserBackend::Chromium => Err(BrowserError::Launch(
            "built without the `chromium` feature; set [browser] backend = \"http\"".to_string(),
        )),
        BrowserBackend::Http => Ok(Arc::new(HttpLauncher::from_config(config)?)),
    }
}
