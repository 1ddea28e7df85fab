use super::retry::{AttemptOutcome, AttemptState, DelayPolicy, ExtractionResult, FailureKind, RetryPolicy};
use crate::browser::{Browser, BrowserLauncher, BrowserResult, NavigationOptions, PageSession};
use crate::config::BrowserConfig;
use crate::extract::ExtractionProfile;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Resolves the article text behind a URL
///
/// Implementations may fail; the batch processor turns a failure into
/// empty content for that item only.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn fetch_content(&self, url: &str, profile: &ExtractionProfile) -> crate::Result<String>;
}

/// Content resolution with a bounded retry budget
///
/// Each attempt launches a private browser, so a crashed renderer on one
/// attempt cannot poison the next. The browser is closed after every
/// attempt whatever its outcome.
pub struct ResilientFetcher {
    launcher: Arc<dyn BrowserLauncher>,
    options: NavigationOptions,
    body_wait: Duration,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        options: NavigationOptions,
        body_wait: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            launcher,
            options,
            body_wait,
            policy,
        }
    }

    pub fn from_config(launcher: Arc<dyn BrowserLauncher>, config: &BrowserConfig) -> Self {
        let delay = DelayPolicy::from_config(config);
        Self::new(
            launcher,
            NavigationOptions::for_items(config),
            Duration::from_millis(config.body_wait_timeout_ms),
            RetryPolicy::new(config.max_attempts, delay),
        )
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches and extracts `url`, returning `""` when no content could be had
    ///
    /// Never fails: every error is logged and absorbed by the attempt budget.
    pub async fn fetch(&self, url: &str, profile: &ExtractionProfile) -> String {
        let mut state = AttemptState::Attempting { attempt: 0 };
        loop {
            state = match state {
                AttemptState::Attempting { attempt } => {
                    let outcome = self.attempt(url, profile, attempt).await;
                    self.policy.next_state(attempt, outcome)
                }
                AttemptState::RetryScheduled { attempt, delay } => {
                    tracing::debug!(url = %url, attempt, "Retrying content fetch");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    AttemptState::Attempting { attempt }
                }
                AttemptState::Succeeded(text) => return text,
                AttemptState::Exhausted { attempts } => {
                    tracing::info!(url = %url, attempts, "No content extracted");
                    return String::new();
                }
            };
        }
    }

    async fn attempt(&self, url: &str, profile: &ExtractionProfile, attempt: u32) -> AttemptOutcome {
        let browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => {
                tracing::warn!(url = %url, attempt, "Browser launch failed: {}", e);
                return AttemptOutcome::Failed(FailureKind::classify(&e));
            }
        };

        let result = self.extract_with(browser.as_ref(), url, profile).await;

        if let Err(e) = browser.close().await {
            tracing::debug!("Browser close failed after {}: {}", url, e);
        }

        match result {
            Ok(extraction) => extraction.into(),
            Err(e) => {
                tracing::warn!(url = %url, attempt, "Content fetch failed: {}", e);
                AttemptOutcome::Failed(FailureKind::classify(&e))
            }
        }
    }

    async fn extract_with(
        &self,
        browser: &dyn Browser,
        url: &str,
        profile: &ExtractionProfile,
    ) -> BrowserResult<ExtractionResult> {
        let session = PageSession::open(browser, url, &self.options).await?;

        // Proceed whether or not the body shows up in time
        session.wait_for("body", self.body_wait).await;

        let text = session.extract(profile).await;
        let navigation_succeeded = session.navigation_succeeded();
        session.close().await.ok();

        Ok(ExtractionResult {
            text: text?,
            navigation_succeeded,
        })
    }
}

#[async_trait]
impl ContentResolver for ResilientFetcher {
    async fn fetch_content(&self, url: &str, profile: &ExtractionProfile) -> crate::Result<String> {
        Ok(self.fetch(url, profile).await)
    }
}
