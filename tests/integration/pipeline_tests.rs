//! Pipeline integration tests
//!
//! These exercise the fetcher, batch processor and orchestrator together,
//! with fake browsers for failure cases and wiremock plus the HTTP browser
//! backend for the end-to-end run.

use crate::support::*;
use news_harvester::browser::{HttpLauncher, NavigationOptions};
use news_harvester::config::{parse_config, BrowserConfig};
use news_harvester::extract::{ExtractionProfile, ProfileRegistry};
use news_harvester::fetcher::{DelayPolicy, ResilientFetcher, RetryPolicy};
use news_harvester::model::{RssConfig, ScrapeConfig, SourceConfig, SourceDescriptor};
use news_harvester::pipeline::{BatchProcessor, Orchestrator};
use news_harvester::storage::{RunLog, RunStatus, SqliteStorage};
use news_harvester::HarvestError;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn scrape_source(name: &str) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url: format!("https://{}.example.com/", name),
        config: SourceConfig::Scrape(ScrapeConfig {
            selector: Some("a.story".to_string()),
            ..ScrapeConfig::default()
        }),
    }
}

#[tokio::test]
async fn test_fetch_always_timing_out_uses_exact_attempt_budget() {
    let launcher = Arc::new(TimeoutLauncher::default());
    let fetcher = ResilientFetcher::new(
        launcher.clone(),
        NavigationOptions::for_items(&BrowserConfig::default()),
        Duration::from_millis(10),
        RetryPolicy::new(3, DelayPolicy::Immediate),
    );

    let content = fetcher
        .fetch("https://slow.example.com/article", &ExtractionProfile::generic())
        .await;

    assert_eq!(content, "");
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 3);
    // Every attempt released its page and its browser
    assert_eq!(launcher.pages_closed.load(Ordering::SeqCst), 3);
    assert_eq!(launcher.browsers_closed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failing_item_does_not_fail_its_batch() {
    let items = raw_items("batch", 5);
    let resolver = Arc::new(EchoResolver {
        failing: vec![items[2].url.clone()],
    });
    let sink = Arc::new(RecordingSink::default());
    let processor = BatchProcessor::new(
        resolver,
        sink.clone(),
        ProfileRegistry::builtin(),
        5,
        Duration::ZERO,
    );

    let report = processor.process_source("batch", items.clone(), "generic").await;

    assert_eq!(sink.sizes(), vec![5]);
    let persisted = sink.items_for("batch");
    for (raw, enriched) in items.iter().zip(&persisted) {
        assert_eq!(raw.url, enriched.url);
        if raw.url == items[2].url {
            assert_eq!(enriched.content, "");
        } else {
            assert_eq!(enriched.content, format!("content of {}", raw.url));
        }
    }
    assert_eq!(report.items_persisted, 5);
}

#[tokio::test]
async fn test_failing_source_does_not_stop_the_run() {
    let mut items = HashMap::new();
    items.insert("first".to_string(), raw_items("first", 2));
    items.insert("third".to_string(), raw_items("third", 3));
    let dispatcher = Arc::new(CannedDispatcher {
        items,
        ..CannedDispatcher::default()
    });

    let registry = Arc::new(StaticRegistry(vec![
        scrape_source("first"),
        scrape_source("second"),
        scrape_source("third"),
    ]));
    let launcher = Arc::new(TimeoutLauncher::default());
    let sink = Arc::new(RecordingSink::default());
    let batches = BatchProcessor::new(
        Arc::new(EchoResolver::default()),
        sink.clone(),
        ProfileRegistry::builtin(),
        5,
        Duration::ZERO,
    );

    let orchestrator = Orchestrator::new(registry, dispatcher.clone(), launcher.clone(), batches, sink.clone());
    let summary = orchestrator.run_all().await.expect("run should complete");

    assert_eq!(summary.sources_processed, 2);
    assert_eq!(summary.sources_failed, 1);
    assert_eq!(summary.items_persisted, 5);
    assert_eq!(sink.items_for("first").len(), 2);
    assert_eq!(sink.items_for("second").len(), 0);
    assert_eq!(sink.items_for("third").len(), 3);
    assert_eq!(
        *dispatcher.calls.lock().unwrap(),
        vec!["first".to_string(), "second".to_string(), "third".to_string()]
    );

    // One shared browser, closed after the last source
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    assert_eq!(launcher.browsers_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rss_without_resolution_is_upserted_directly() {
    let feed = SourceDescriptor {
        name: "feed".to_string(),
        url: "https://feed.example.com/rss.xml".to_string(),
        config: SourceConfig::Rss(RssConfig::default()),
    };
    let mut items = HashMap::new();
    let mut raw = raw_items("feed", 7);
    // Duplicate and url-less entries are dropped before persisting
    raw.push(raw[0].clone());
    raw.push(news_harvester::RawItem::new("No link", ""));
    items.insert("feed".to_string(), raw);

    let sink = Arc::new(RecordingSink::default());
    let batches = BatchProcessor::new(
        Arc::new(EchoResolver::default()),
        sink.clone(),
        ProfileRegistry::builtin(),
        5,
        Duration::ZERO,
    );
    let orchestrator = Orchestrator::new(
        Arc::new(StaticRegistry(vec![feed])),
        Arc::new(CannedDispatcher {
            items,
            ..CannedDispatcher::default()
        }),
        Arc::new(TimeoutLauncher::default()),
        batches,
        sink.clone(),
    );

    let summary = orchestrator.run_all().await.unwrap();

    assert_eq!(sink.sizes(), vec![7]);
    assert!(sink.items_for("feed").iter().all(|item| item.content.is_empty()));
    assert_eq!(summary.items_resolved, 0);
    assert_eq!(summary.items_persisted, 7);
}

#[tokio::test]
async fn test_browser_launch_failure_is_fatal() {
    let sink = Arc::new(RecordingSink::default());
    let batches = BatchProcessor::new(
        Arc::new(EchoResolver::default()),
        sink.clone(),
        ProfileRegistry::builtin(),
        5,
        Duration::ZERO,
    );
    let orchestrator = Orchestrator::new(
        Arc::new(StaticRegistry(vec![scrape_source("first")])),
        Arc::new(CannedDispatcher::default()),
        Arc::new(BrokenLauncher),
        batches,
        sink.clone(),
    );

    let result = orchestrator.run_all().await;
    assert!(matches!(result, Err(HarvestError::Browser(_))));
    assert!(sink.sizes().is_empty());
}

#[tokio::test]
async fn test_registry_failure_is_fatal_and_recorded() {
    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let batches = BatchProcessor::new(
        Arc::new(EchoResolver::default()),
        storage.clone(),
        ProfileRegistry::builtin(),
        5,
        Duration::ZERO,
    );
    let orchestrator = Orchestrator::new(
        Arc::new(FailingRegistry),
        Arc::new(CannedDispatcher::default()),
        Arc::new(TimeoutLauncher::default()),
        batches,
        storage.clone(),
    )
    .with_run_log(storage.clone(), "hash");

    assert!(orchestrator.run_all().await.is_err());
    let run = storage.latest_run().unwrap().expect("run row");
    assert_eq!(run.status, RunStatus::Failed);
}

/// Serves `/articles/<n>` as a page with an `<article>` body
fn article_page(request: &Request) -> ResponseTemplate {
    let id = request.url.path().rsplit('/').next().unwrap_or("0").to_string();
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(format!(
            r#"<html><body><nav>Menu</nav><article><h1>Story {id}</h1><p>Body of story {id}.</p></article></body></html>"#
        ))
}

#[tokio::test]
async fn test_scrape_source_end_to_end() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Listing page with 7 story links and some noise
    let links: String = (1..=7)
        .map(|i| format!(r#"<li><a class="story" href="/articles/{i}">Story {i}</a></li>"#))
        .collect();
    Mock::given(method("GET"))
        .and(path("/listing"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(format!(
                    r#"<html><body><ul>{links}</ul><a href="/about">About</a></body></html>"#
                )),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/articles/\d+$"))
        .respond_with(article_page)
        .mount(&server)
        .await;

    let config = parse_config(&format!(
        r#"
[pipeline]
batch-size = 5
inter-batch-delay-ms = 300

[browser]
backend = "http"
max-attempts = 2

[output]
database-path = ":memory:"

[[source]]
name = "Local News"
type = "scrape"
url = "{base}/listing"

[source.config]
selector = "a.story"
"#
    ))
    .expect("config should parse");

    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    storage.sync_sources(&config.sources).unwrap();
    let sink = Arc::new(RecordingSink::forwarding(storage.clone()));

    let orchestrator = Orchestrator::from_config(&config, storage.clone(), sink.clone())
        .expect("orchestrator")
        .with_run_log(storage.clone(), "e2e");
    let summary = orchestrator.run_all().await.expect("run should complete");

    // Exactly two upserts: 5 then 2, separated by the inter-batch delay
    assert_eq!(sink.sizes(), vec![5, 2]);
    {
        let calls = sink.calls.lock().unwrap();
        let gap = calls[1].1.duration_since(calls[0].1);
        assert!(gap >= Duration::from_millis(300), "gap was {:?}", gap);
    }

    let items = sink.items_for("Local News");
    assert_eq!(items.len(), 7);
    for item in &items {
        let id = item.url.rsplit('/').next().unwrap();
        assert_eq!(item.content, format!("Story {id}\nBody of story {id}."));
    }

    assert_eq!(summary.sources_processed, 1);
    assert_eq!(summary.items_persisted, 7);
    assert_eq!(storage.count_items().unwrap(), 7);

    let run = storage.latest_run().unwrap().expect("run row");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "e2e");
    assert_eq!(run.summary, summary);
}

#[tokio::test]
async fn test_fetcher_extracts_over_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><main><p>Main text</p></main><footer>Footer</footer></body></html>",
        ))
        .mount(&server)
        .await;

    let fetcher = ResilientFetcher::new(
        Arc::new(HttpLauncher::with_client(Client::new())),
        NavigationOptions::for_items(&BrowserConfig::default()),
        Duration::from_millis(50),
        RetryPolicy::default(),
    );

    let text = fetcher
        .fetch(&format!("{}/post", server.uri()), &ExtractionProfile::generic())
        .await;
    assert_eq!(text, "Main text");
}

#[tokio::test]
async fn test_not_found_page_is_loaded_once_and_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/removed"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string("<html><body><article>This post was removed</article></body></html>"),
        )
        .mount(&server)
        .await;

    let fetcher = ResilientFetcher::new(
        Arc::new(HttpLauncher::with_client(Client::new())),
        NavigationOptions::for_items(&BrowserConfig::default()),
        Duration::from_millis(50),
        RetryPolicy::default(),
    );

    let text = fetcher
        .fetch(&format!("{}/removed", server.uri()), &ExtractionProfile::generic())
        .await;

    assert_eq!(text, "This post was removed");
    let requests = server.received_requests().await.expect("request recording enabled");
    assert_eq!(requests.len(), 1);
}
