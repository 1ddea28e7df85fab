//! Static HTML backend
//!
//! Fetches the server-rendered document over HTTP without running
//! scripts. Sufficient for listing pages and articles that render on the
//! server, and for running without a local Chrome install.

use super::{Browser, BrowserError, BrowserLauncher, BrowserResult, Page, ResourceKind};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Mutex;
use std::time::Duration;

/// Hands out HTTP "browsers" sharing one connection pool
#[derive(Debug, Clone)]
pub struct HttpLauncher {
    client: Client,
}

impl HttpLauncher {
    pub fn from_config(config: &BrowserConfig) -> BrowserResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        Ok(Box::new(HttpBrowser {
            client: self.client.clone(),
        }))
    }
}

struct HttpBrowser {
    client: Client,
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            state: Mutex::new(PageState::default()),
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct PageState {
    user_agent: Option<String>,
    html: Option<String>,
    closed: bool,
}

struct HttpPage {
    client: Client,
    state: Mutex<PageState>,
}

impl HttpPage {
    fn with_state<T>(&self, f: impl FnOnce(&mut PageState) -> T) -> BrowserResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BrowserError::Protocol("page state poisoned".to_string()))?;
        if state.closed {
            return Err(BrowserError::Closed);
        }
        Ok(f(&mut state))
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        self.with_state(|state| state.user_agent = Some(user_agent.to_string()))
    }

    async fn block_resources(&self, _kinds: &[ResourceKind]) -> BrowserResult<()> {
        // Sub-resources are never requested
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let user_agent = self.with_state(|state| state.user_agent.clone())?;

        let mut request = self.client.get(url).timeout(timeout);
        if let Some(user_agent) = user_agent {
            request = request.header(USER_AGENT, user_agent);
        }

        let navigation_error = |e: reqwest::Error| {
            if e.is_timeout() {
                BrowserError::timeout(format!("navigation to {}", url), timeout)
            } else {
                BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = request.send().await.map_err(navigation_error)?;
        // An error page is still a loaded page, as in a real browser
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} answered HTTP {}", url, status.as_u16());
        }
        let body = response.text().await.map_err(navigation_error)?;
        self.with_state(|state| state.html = Some(body))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let parsed = Selector::parse(selector)
            .map_err(|e| BrowserError::Protocol(format!("bad selector '{}': {:?}", selector, e)))?;
        let html = self.with_state(|state| state.html.clone())?.unwrap_or_default();

        // The document is static, so the selector is either there or never will be
        let present = Html::parse_document(&html).select(&parsed).next().is_some();
        if present {
            Ok(())
        } else {
            Err(BrowserError::timeout(format!("selector '{}'", selector), timeout))
        }
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.with_state(|state| state.html.clone())?.unwrap_or_default())
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| BrowserError::Protocol("page state poisoned".to_string()))?;
        state.closed = true;
        state.html = None;
        Ok(())
    }
}
