use super::{Browser, BrowserError, BrowserResult, NavigationOptions, Page};
use crate::extract::{extract, ExtractionProfile};
use std::time::Duration;

/// Scoped page resource
///
/// Opens one page, applies the navigation policy and navigates. The page
/// is released on every exit path: explicitly through [`PageSession::close`],
/// or by the `Drop` fallback which schedules the close on the current
/// Tokio runtime.
///
/// A failed navigation does not fail the session. It is recorded in
/// [`PageSession::navigation_succeeded`] and the caller extracts from
/// whatever DOM state exists.
pub struct PageSession {
    page: Option<Box<dyn Page>>,
    url: String,
    navigation_succeeded: bool,
}

impl PageSession {
    /// Opens a page on `browser` and navigates it to `url`
    ///
    /// Errors only when the page itself cannot be created.
    pub async fn open(
        browser: &dyn Browser,
        url: &str,
        options: &NavigationOptions,
    ) -> BrowserResult<Self> {
        let page = browser.new_page().await?;
        let mut session = Self {
            page: Some(page),
            url: url.to_string(),
            navigation_succeeded: false,
        };

        let page = session.page()?;
        if !options.blocked.is_empty() {
            if let Err(e) = page.block_resources(&options.blocked).await {
                tracing::warn!("Request interception unavailable for {}: {}", url, e);
            }
        }
        if let Some(user_agent) = options.user_agent.as_deref() {
            if let Err(e) = page.set_user_agent(user_agent).await {
                tracing::warn!("Could not set user agent for {}: {}", url, e);
            }
        }

        let navigated = match page.goto(url, options.navigation_timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Navigation to {} did not complete: {}", url, e);
                false
            }
        };
        session.navigation_succeeded = navigated;

        Ok(session)
    }

    fn page(&self) -> BrowserResult<&dyn Page> {
        self.page.as_deref().ok_or(BrowserError::Closed)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn navigation_succeeded(&self) -> bool {
        self.navigation_succeeded
    }

    /// Waits for `selector`; returns whether it appeared in time
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> bool {
        let Ok(page) = self.page() else {
            return false;
        };
        match page.wait_for_selector(selector, timeout).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("'{}' not present on {}: {}", selector, self.url, e);
                false
            }
        }
    }

    /// Current DOM as HTML
    pub async fn snapshot(&self) -> BrowserResult<String> {
        self.page()?.content().await
    }

    /// Runs the extraction strategy against the current DOM
    pub async fn extract(&self, profile: &ExtractionProfile) -> BrowserResult<String> {
        let html = self.snapshot().await?;
        Ok(extract(&html, profile))
    }

    /// Closes the page, consuming the session
    pub async fn close(mut self) -> BrowserResult<()> {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                tracing::warn!("Failed to close page for {}: {}", self.url, e);
                return Err(e);
            }
            tracing::trace!("Page closed for {}", self.url);
        }
        Ok(())
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let url = std::mem::take(&mut self.url);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::warn!("Deferred page close failed for {}: {}", url, e);
                    }
                });
            }
            Err(_) => tracing::warn!("No runtime to close page for {}", url),
        }
    }
}
