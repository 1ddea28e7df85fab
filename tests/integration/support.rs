//! Test doubles shared by the integration tests

use async_trait::async_trait;
use news_harvester::browser::{Browser, BrowserError, BrowserLauncher, BrowserResult, Page, ResourceKind};
use news_harvester::dispatch::ItemSource;
use news_harvester::extract::ExtractionProfile;
use news_harvester::fetcher::ContentResolver;
use news_harvester::model::{EnrichedItem, RawItem, SourceDescriptor};
use news_harvester::storage::{ItemSink, SourceRegistry, StorageError, StorageResult};
use news_harvester::{HarvestError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Launcher whose pages never finish navigating and never render anything
#[derive(Default)]
pub struct TimeoutLauncher {
    pub launches: AtomicUsize,
    pub browsers_closed: Arc<AtomicUsize>,
    pub pages_closed: Arc<AtomicUsize>,
}

struct TimeoutBrowser {
    browsers_closed: Arc<AtomicUsize>,
    pages_closed: Arc<AtomicUsize>,
}

struct TimeoutPage {
    pages_closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserLauncher for TimeoutLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TimeoutBrowser {
            browsers_closed: Arc::clone(&self.browsers_closed),
            pages_closed: Arc::clone(&self.pages_closed),
        }))
    }
}

#[async_trait]
impl Browser for TimeoutBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        Ok(Box::new(TimeoutPage {
            pages_closed: Arc::clone(&self.pages_closed),
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        self.browsers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Page for TimeoutPage {
    async fn set_user_agent(&self, _user_agent: &str) -> BrowserResult<()> {
        Ok(())
    }

    async fn block_resources(&self, _kinds: &[ResourceKind]) -> BrowserResult<()> {
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        Err(BrowserError::Timeout {
            what: format!("navigation to {}", url),
            elapsed_ms: timeout.as_millis() as u64,
        })
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        Err(BrowserError::Timeout {
            what: selector.to_string(),
            elapsed_ms: timeout.as_millis() as u64,
        })
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok("<html><head></head><body></body></html>".to_string())
    }

    async fn close(&self) -> BrowserResult<()> {
        self.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher that always fails
pub struct BrokenLauncher;

#[async_trait]
impl BrowserLauncher for BrokenLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        Err(BrowserError::Launch("no browser installed".to_string()))
    }
}

/// Echoes the URL as content, except for URLs listed as failing
#[derive(Default)]
pub struct EchoResolver {
    pub failing: Vec<String>,
}

#[async_trait]
impl ContentResolver for EchoResolver {
    async fn fetch_content(&self, url: &str, _profile: &ExtractionProfile) -> Result<String> {
        if self.failing.iter().any(|f| f == url) {
            return Err(HarvestError::Content {
                url: url.to_string(),
                message: "renderer crashed".to_string(),
            });
        }
        Ok(format!("content of {}", url))
    }
}

/// Records every upsert with the time it arrived, optionally forwarding
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<(String, Instant, Vec<EnrichedItem>)>>,
    pub inner: Option<Arc<dyn ItemSink>>,
}

impl RecordingSink {
    pub fn forwarding(inner: Arc<dyn ItemSink>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            inner: Some(inner),
        }
    }

    pub fn sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|(_, _, items)| items.len()).collect()
    }

    pub fn items_for(&self, source: &str) -> Vec<EnrichedItem> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name == source)
            .flat_map(|(_, _, items)| items.clone())
            .collect()
    }
}

#[async_trait]
impl ItemSink for RecordingSink {
    async fn upsert(&self, source_name: &str, items: &[EnrichedItem]) -> StorageResult<usize> {
        self.calls
            .lock()
            .unwrap()
            .push((source_name.to_string(), Instant::now(), items.to_vec()));
        match &self.inner {
            Some(inner) => inner.upsert(source_name, items).await,
            None => Ok(items.len()),
        }
    }
}

/// Fixed registry
pub struct StaticRegistry(pub Vec<SourceDescriptor>);

#[async_trait]
impl SourceRegistry for StaticRegistry {
    async fn list_sources(&self) -> StorageResult<Vec<SourceDescriptor>> {
        Ok(self.0.clone())
    }
}

/// Registry whose backing store is gone
pub struct FailingRegistry;

#[async_trait]
impl SourceRegistry for FailingRegistry {
    async fn list_sources(&self) -> StorageResult<Vec<SourceDescriptor>> {
        Err(StorageError::Poisoned)
    }
}

/// Serves canned items per source name; unknown names fail
#[derive(Default)]
pub struct CannedDispatcher {
    pub items: HashMap<String, Vec<RawItem>>,
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl ItemSource for CannedDispatcher {
    async fn resolve_items(&self, source: &SourceDescriptor, _browser: &dyn Browser) -> Result<Vec<RawItem>> {
        self.calls.lock().unwrap().push(source.name.clone());
        self.items
            .get(&source.name)
            .cloned()
            .ok_or_else(|| HarvestError::Listing {
                url: source.url.clone(),
                message: "listing layout changed".to_string(),
            })
    }
}

pub fn raw_items(prefix: &str, n: usize) -> Vec<RawItem> {
    (1..=n)
        .map(|i| RawItem::new(format!("{} {}", prefix, i), format!("https://{}.example.com/{}", prefix, i)))
        .collect()
}
