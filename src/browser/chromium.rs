//! Headless Chrome backend over the DevTools protocol

use super::{Browser, BrowserError, BrowserLauncher, BrowserResult, Page, ResourceKind};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{ErrorReason, ResourceType};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches a fresh Chrome process per call
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    headless: bool,
    executable: Option<String>,
    args: Vec<String>,
}

impl ChromiumLauncher {
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            executable: config.executable.clone(),
            args: config.args.clone(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        let mut builder = CdpBrowserConfig::builder()
            .no_sandbox()
            .args(self.args.iter().map(String::as_str));
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler drives the CDP connection and must be polled for the
        // browser's whole lifetime.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler error: {}", e);
                }
            }
        });

        tracing::debug!("Launched Chromium (headless: {})", self.headless);
        Ok(Box::new(ChromiumBrowser {
            inner: Mutex::new(Some(browser)),
            handler_task,
        }))
    }
}

struct ChromiumBrowser {
    inner: Mutex<Option<CdpBrowser>>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_page(&self) -> BrowserResult<Box<dyn Page>> {
        let guard = self.inner.lock().await;
        let browser = guard.as_ref().ok_or(BrowserError::Closed)?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;
        Ok(Box::new(ChromiumPage {
            page,
            interception: Mutex::new(None),
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        let Some(mut browser) = self.inner.lock().await.take() else {
            return Ok(());
        };
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Protocol(e.to_string()));
        if let Err(e) = browser.wait().await {
            tracing::debug!("Chromium process wait failed: {}", e);
        }
        self.handler_task.abort();
        closed
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

struct ChromiumPage {
    page: chromiumoxide::Page,
    interception: Mutex<Option<JoinHandle<()>>>,
}

fn blocks(kinds: &[ResourceKind], resource: &ResourceType) -> bool {
    kinds.iter().any(|kind| {
        matches!(
            (kind, resource),
            (ResourceKind::Image, ResourceType::Image)
                | (ResourceKind::Stylesheet, ResourceType::Stylesheet)
                | (ResourceKind::Font, ResourceType::Font)
                | (ResourceKind::Media, ResourceType::Media)
                | (ResourceKind::Script, ResourceType::Script)
        )
    })
}

#[async_trait]
impl Page for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> BrowserResult<()> {
        self.page
            .set_user_agent(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn block_resources(&self, kinds: &[ResourceKind]) -> BrowserResult<()> {
        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        let pattern = RequestPattern::builder()
            .url_pattern("*")
            .request_stage(RequestStage::Request)
            .build();
        self.page
            .execute(EnableParams::builder().pattern(pattern).build())
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))?;

        let page = self.page.clone();
        let kinds = kinds.to_vec();
        let task = tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let outcome = if blocks(&kinds, &event.resource_type) {
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    tracing::trace!("Interception reply failed: {}", e);
                }
            }
        });

        if let Some(previous) = self.interception.lock().await.replace(task) {
            previous.abort();
        }
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(BrowserError::timeout(format!("navigation to {}", url), timeout)),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let started = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::timeout(format!("selector '{}'", selector), timeout));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> BrowserResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }

    async fn close(&self) -> BrowserResult<()> {
        if let Some(task) = self.interception.lock().await.take() {
            task.abort();
        }
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| BrowserError::Protocol(e.to_string()))
    }
}
