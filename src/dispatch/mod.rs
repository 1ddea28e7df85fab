//! Source dispatch
//!
//! Maps a [`SourceDescriptor`] to the routine that produces its raw items:
//! - `api`: direct JSON requests, with a throttled per-story detail fetch
//!   for story-index APIs
//! - `rss`: feed XML parsed into `{title, url}` entries
//! - `scrape`: one navigation of the listing page on the shared browser,
//!   then a site-profile or generic selector extraction of the snapshot

mod api;
pub mod feed;
pub mod listing;

use crate::browser::{Browser, NavigationOptions, PageSession};
use crate::config::{BrowserConfig, Config};
use crate::model::{RawItem, ScrapeTarget, SourceConfig, SourceDescriptor};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Produces the raw items of a source
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn resolve_items(
        &self,
        source: &SourceDescriptor,
        browser: &dyn Browser,
    ) -> Result<Vec<RawItem>>;
}

/// Dispatch knobs taken from `[pipeline]` and `[browser]`
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub api_top_n: usize,
    pub item_delay: Duration,
    pub listing_navigation: NavigationOptions,
    pub selector_wait: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_top_n: config.pipeline.api_top_n,
            item_delay: Duration::from_millis(config.pipeline.item_delay_ms),
            listing_navigation: NavigationOptions::for_listings(&config.browser),
            selector_wait: Duration::from_millis(config.browser.selector_wait_timeout_ms),
        }
    }
}

/// Routes each source type to its acquisition routine
pub struct SourceDispatcher {
    client: Client,
    settings: DispatchSettings,
}

impl SourceDispatcher {
    pub fn new(client: Client, settings: DispatchSettings) -> Self {
        Self { client, settings }
    }

    async fn resolve_rss(&self, url: &str) -> Result<Vec<RawItem>> {
        let base = Url::parse(url)?;
        let bytes = get_bytes(&self.client, url).await?;
        let items = feed::parse_feed(&bytes, &base).map_err(|e| HarvestError::Feed {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        tracing::info!("Parsed {} feed items from {}", items.len(), url);
        Ok(items)
    }

    async fn resolve_scrape(
        &self,
        url: &str,
        target: ScrapeTarget,
        browser: &dyn Browser,
    ) -> Result<Vec<RawItem>> {
        let base = Url::parse(url)?;
        let session = PageSession::open(browser, url, &self.settings.listing_navigation).await?;

        let ready = match &target {
            ScrapeTarget::Profile(profile) => profile.ready_selector(),
            ScrapeTarget::Selector(selector) => selector.as_str(),
        };
        if !session.wait_for(ready, self.settings.selector_wait).await {
            tracing::debug!("Listing {} never showed '{}'", url, ready);
        }

        let snapshot = session.snapshot().await;
        let navigated = session.navigation_succeeded();
        session.close().await.ok();
        let html = snapshot?;

        let items = match &target {
            ScrapeTarget::Profile(profile) => listing::parse_listing(*profile, &html, &base),
            ScrapeTarget::Selector(selector) => listing::parse_generic_listing(&html, &base, selector),
        };

        if items.is_empty() && !navigated {
            return Err(HarvestError::Listing {
                url: url.to_string(),
                message: "navigation failed and no items were found".to_string(),
            });
        }
        if items.is_empty() {
            tracing::warn!("Listing {} loaded but produced no items", url);
        } else {
            tracing::info!("Extracted {} listing items from {}", items.len(), url);
        }
        Ok(items)
    }
}

#[async_trait]
impl ItemSource for SourceDispatcher {
    async fn resolve_items(
        &self,
        source: &SourceDescriptor,
        browser: &dyn Browser,
    ) -> Result<Vec<RawItem>> {
        tracing::debug!("Resolving items for '{}' ({})", source.name, source.kind());
        match &source.config {
            SourceConfig::Api(config) => {
                api::resolve_api(&self.client, &source.url, config, &self.settings).await
            }
            SourceConfig::Rss(_) => self.resolve_rss(&source.url).await,
            SourceConfig::Scrape(config) => {
                let target = config.target().ok_or_else(|| HarvestError::Listing {
                    url: source.url.clone(),
                    message: "no listing strategy or selector configured".to_string(),
                })?;
                self.resolve_scrape(&source.url, target, browser).await
            }
        }
    }
}

/// Builds the client used for API and feed requests
///
/// Shares the browser's user agent so sources see one consistent client.
pub fn build_http_client(config: &BrowserConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_millis(config.listing_navigation_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

async fn get_checked(client: &Client, url: &str) -> Result<reqwest::Response> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

pub(crate) async fn get_json(client: &Client, url: &str) -> Result<Value> {
    get_checked(client, url)
        .await?
        .json()
        .await
        .map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })
}

async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let bytes = get_checked(client, url)
        .await?
        .bytes()
        .await
        .map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserLauncher, HttpLauncher};
    use crate::config::BrowserConfig;
    use crate::model::{ApiConfig, ListingProfile, RssConfig, ScrapeConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> DispatchSettings {
        DispatchSettings {
            api_top_n: 2,
            item_delay: Duration::from_millis(1),
            listing_navigation: NavigationOptions::for_listings(&BrowserConfig::default()),
            selector_wait: Duration::from_millis(10),
        }
    }

    fn source(url: String, config: SourceConfig) -> SourceDescriptor {
        SourceDescriptor {
            name: "Test".to_string(),
            url,
            config,
        }
    }

    async fn browser() -> Box<dyn Browser> {
        HttpLauncher::with_client(Client::new()).launch().await.unwrap()
    }

    #[tokio::test]
    async fn test_story_index_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([11, 12, 13])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/11.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 11, "title": "Eleven", "url": "https://example.com/11", "score": 5
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/item/12.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = ApiConfig {
            item_url: Some(format!("{}/item/{{id}}.json", server.uri())),
            discussion_url: Some("https://news.ycombinator.com/item?id={id}".to_string()),
            ..ApiConfig::default()
        };
        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let items = dispatcher
            .resolve_items(
                &source(format!("{}/top.json", server.uri()), SourceConfig::Api(config)),
                browser().await.as_ref(),
            )
            .await
            .unwrap();

        // Top 2 only; story 12 failed and is skipped
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Eleven");
        assert_eq!(
            items[0].discussion_url.as_deref(),
            Some("https://news.ycombinator.com/item?id=11")
        );
    }

    #[tokio::test]
    async fn test_rss_source() {
        let server = MockServer::start().await;
        let feed = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://example.com</link><description>d</description>
            <item><title>A</title><link>https://example.com/a</link></item>
        </channel></rss>"#;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed))
            .mount(&server)
            .await;

        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let items = dispatcher
            .resolve_items(
                &source(
                    format!("{}/feed.xml", server.uri()),
                    SourceConfig::Rss(RssConfig::default()),
                ),
                browser().await.as_ref(),
            )
            .await
            .unwrap();
        assert_eq!(items, vec![RawItem::new("A", "https://example.com/a")]);
    }

    #[tokio::test]
    async fn test_scrape_listing_profile() {
        let server = MockServer::start().await;
        let listing = r#"<html><body><table>
            <tr class="athing" id="1"><td><span class="titleline"><a href="https://example.com/x">X</a></span></td></tr>
            <tr><td class="subtext"><span class="score">7 points</span></td></tr>
        </table></body></html>"#;
        Mock::given(method("GET"))
            .and(path("/news"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;

        let config = ScrapeConfig {
            strategy: Some(ListingProfile::HackerNews.tag().to_string()),
            ..ScrapeConfig::default()
        };
        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let items = dispatcher
            .resolve_items(
                &source(format!("{}/news", server.uri()), SourceConfig::Scrape(config)),
                browser().await.as_ref(),
            )
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].upvotes, Some(7));
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_source_error() {
        let config = ScrapeConfig {
            selector: Some("a.story".to_string()),
            ..ScrapeConfig::default()
        };
        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let result = dispatcher
            .resolve_items(
                &source("http://127.0.0.1:9/news".to_string(), SourceConfig::Scrape(config)),
                browser().await.as_ref(),
            )
            .await;
        assert!(matches!(result, Err(HarvestError::Listing { .. })));
    }

    #[tokio::test]
    async fn test_missing_listing_page_yields_no_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("<html><body>Not found</body></html>"))
            .mount(&server)
            .await;

        let config = ScrapeConfig {
            selector: Some("a.story".to_string()),
            ..ScrapeConfig::default()
        };
        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let items = dispatcher
            .resolve_items(
                &source(format!("{}/gone", server.uri()), SourceConfig::Scrape(config)),
                browser().await.as_ref(),
            )
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_story_index_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ids": [1, 2] })))
            .mount(&server)
            .await;

        let config = ApiConfig {
            item_url: Some(format!("{}/item/{{id}}.json", server.uri())),
            ..ApiConfig::default()
        };
        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let result = dispatcher
            .resolve_items(
                &source(format!("{}/top.json", server.uri()), SourceConfig::Api(config)),
                browser().await.as_ref(),
            )
            .await;
        assert!(matches!(result, Err(HarvestError::Api { .. })));
    }

    #[tokio::test]
    async fn test_api_http_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dispatcher = SourceDispatcher::new(Client::new(), settings());
        let result = dispatcher
            .resolve_items(
                &source(server.uri(), SourceConfig::Api(ApiConfig::default())),
                browser().await.as_ref(),
            )
            .await;
        assert!(matches!(result, Err(HarvestError::HttpStatus { status: 503, .. })));
    }
}
