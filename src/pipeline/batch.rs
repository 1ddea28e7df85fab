//! Batched content resolution
//!
//! Items are split into consecutive batches. Content for every item in a
//! batch is resolved concurrently, the batch is upserted, and the next
//! batch starts only after that. A politeness delay separates batches.

use crate::config::PipelineConfig;
use crate::extract::{ExtractionProfile, ProfileRegistry};
use crate::fetcher::ContentResolver;
use crate::model::{EnrichedItem, RawItem};
use crate::storage::ItemSink;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// Counters for one source's batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub batches: u32,
    pub items_resolved: u64,
    pub items_persisted: u64,
    pub batches_failed: u32,
}

/// Resolves content for a source's items in bounded, ordered batches
pub struct BatchProcessor {
    resolver: Arc<dyn ContentResolver>,
    sink: Arc<dyn ItemSink>,
    profiles: ProfileRegistry,
    batch_size: usize,
    inter_batch_delay: Duration,
}

impl BatchProcessor {
    pub fn new(
        resolver: Arc<dyn ContentResolver>,
        sink: Arc<dyn ItemSink>,
        profiles: ProfileRegistry,
        batch_size: usize,
        inter_batch_delay: Duration,
    ) -> Self {
        Self {
            resolver,
            sink,
            profiles,
            batch_size: batch_size.max(1),
            inter_batch_delay,
        }
    }

    pub fn from_config(
        resolver: Arc<dyn ContentResolver>,
        sink: Arc<dyn ItemSink>,
        profiles: ProfileRegistry,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(
            resolver,
            sink,
            profiles,
            config.batch_size,
            Duration::from_millis(config.inter_batch_delay_ms),
        )
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolves and persists `items` batch by batch
    ///
    /// Never fails. An item whose resolution fails is persisted with empty
    /// content; a batch whose upsert fails is counted and skipped.
    pub async fn process_source(
        &self,
        source_name: &str,
        items: Vec<RawItem>,
        content_profile: &str,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        if items.is_empty() {
            return report;
        }

        let profile = self.profiles.get(content_profile);
        let discussion = self.profiles.discussion();
        let total_batches = items.len().div_ceil(self.batch_size);

        for (index, batch) in items.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.inter_batch_delay).await;
            }

            tracing::debug!(
                source = %source_name,
                "Resolving batch {}/{} ({} items)",
                index + 1,
                total_batches,
                batch.len()
            );

            let enriched: Vec<EnrichedItem> = join_all(
                batch
                    .iter()
                    .map(|item| self.resolve_item(item.clone(), &profile, &discussion)),
            )
            .await;

            report.batches += 1;
            report.items_resolved += enriched.len() as u64;

            match self.sink.upsert(source_name, &enriched).await {
                Ok(written) => report.items_persisted += written as u64,
                Err(e) => {
                    report.batches_failed += 1;
                    tracing::error!(
                        source = %source_name,
                        "Failed to persist batch {}/{}: {}",
                        index + 1,
                        total_batches,
                        e
                    );
                }
            }
        }

        tracing::info!(
            source = %source_name,
            "Resolved {} items in {} batches ({} persisted)",
            report.items_resolved,
            report.batches,
            report.items_persisted
        );
        report
    }

    /// Discussion thread first, then the item's own URL
    async fn resolve_item(
        &self,
        item: RawItem,
        profile: &ExtractionProfile,
        discussion: &ExtractionProfile,
    ) -> EnrichedItem {
        if let Some(thread) = item.discussion_url.as_deref() {
            let content = self.try_resolve(thread, discussion).await;
            if !content.is_empty() {
                return EnrichedItem::new(item, content);
            }
        }

        let content = self.try_resolve(&item.url, profile).await;
        EnrichedItem::new(item, content)
    }

    async fn try_resolve(&self, url: &str, profile: &ExtractionProfile) -> String {
        match self.resolver.fetch_content(url, profile).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(url = %url, "Content resolution failed: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{StorageError, StorageResult};
    use crate::HarvestError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes the URL back as content; listed URLs fail or come back empty
    struct EchoResolver {
        failing: Vec<&'static str>,
        empty: Vec<&'static str>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl EchoResolver {
        fn new(failing: Vec<&'static str>, empty: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                failing,
                empty,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ContentResolver for EchoResolver {
        async fn fetch_content(&self, url: &str, profile: &ExtractionProfile) -> crate::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), profile.name().to_string()));
            if self.failing.contains(&url) {
                return Err(HarvestError::Content {
                    url: url.to_string(),
                    message: "boom".to_string(),
                });
            }
            if self.empty.contains(&url) {
                return Ok(String::new());
            }
            Ok(format!("content of {}", url))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<EnrichedItem>>>,
        fail_first: bool,
    }

    #[async_trait]
    impl ItemSink for RecordingSink {
        async fn upsert(&self, _source: &str, items: &[EnrichedItem]) -> StorageResult<usize> {
            let mut batches = self.batches.lock().unwrap();
            batches.push(items.to_vec());
            if self.fail_first && batches.len() == 1 {
                return Err(StorageError::Poisoned);
            }
            Ok(items.len())
        }
    }

    fn items(n: usize) -> Vec<RawItem> {
        (1..=n)
            .map(|i| RawItem::new(format!("Item {}", i), format!("https://example.com/{}", i)))
            .collect()
    }

    fn processor(resolver: Arc<EchoResolver>, sink: Arc<RecordingSink>) -> BatchProcessor {
        BatchProcessor::new(resolver, sink, ProfileRegistry::builtin(), 5, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_failing_item_gets_empty_content() {
        let resolver = EchoResolver::new(vec!["https://example.com/3"], vec![]);
        let sink = Arc::new(RecordingSink::default());
        let report = processor(resolver, sink.clone())
            .process_source("S", items(5), "generic")
            .await;

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.len(), 5);
        for item in batch {
            if item.url == "https://example.com/3" {
                assert_eq!(item.content, "");
            } else {
                assert_eq!(item.content, format!("content of {}", item.url));
            }
        }
        assert_eq!(report.items_persisted, 5);
    }

    #[tokio::test]
    async fn test_batches_are_chunked_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let report = processor(EchoResolver::new(vec![], vec![]), sink.clone())
            .process_source("S", items(12), "generic")
            .await;

        let sizes: Vec<usize> = sink.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(report.batches, 3);
        assert_eq!(sink.batches.lock().unwrap()[2][0].url, "https://example.com/11");
    }

    #[tokio::test]
    async fn test_failed_persist_does_not_stop_later_batches() {
        let sink = Arc::new(RecordingSink {
            fail_first: true,
            ..RecordingSink::default()
        });
        let report = processor(EchoResolver::new(vec![], vec![]), sink.clone())
            .process_source("S", items(7), "generic")
            .await;

        assert_eq!(sink.batches.lock().unwrap().len(), 2);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.items_persisted, 2);
        assert_eq!(report.items_resolved, 7);
    }

    #[tokio::test]
    async fn test_discussion_thread_tried_first() {
        let resolver = EchoResolver::new(vec![], vec!["https://news.example.com/item?id=2"]);
        let sink = Arc::new(RecordingSink::default());

        let mut with_thread = items(2);
        with_thread[0].discussion_url = Some("https://news.example.com/item?id=1".to_string());
        with_thread[1].discussion_url = Some("https://news.example.com/item?id=2".to_string());

        processor(resolver.clone(), sink.clone())
            .process_source("S", with_thread, "huggingface_blog")
            .await;

        let batch = sink.batches.lock().unwrap()[0].clone();
        assert_eq!(batch[0].content, "content of https://news.example.com/item?id=1");
        // Empty thread falls through to the article
        assert_eq!(batch[1].content, "content of https://example.com/2");

        let calls = resolver.calls.lock().unwrap();
        assert!(calls.contains(&(
            "https://news.example.com/item?id=1".to_string(),
            "discussion".to_string()
        )));
        assert!(calls.contains(&("https://example.com/2".to_string(), "huggingface_blog".to_string())));
        assert!(!calls.iter().any(|(url, _)| url == "https://example.com/1"));
    }

    #[tokio::test]
    async fn test_empty_item_list_is_noop() {
        let sink = Arc::new(RecordingSink::default());
        let report = processor(EchoResolver::new(vec![], vec![]), sink.clone())
            .process_source("S", Vec::new(), "generic")
            .await;
        assert_eq!(report, BatchReport::default());
        assert!(sink.batches.lock().unwrap().is_empty());
    }
}
