use crate::model::EnrichedItem;
use crate::storage::traits::{ItemSink, StorageError, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Upserts into every wrapped sink
///
/// Every sink is attempted even after a failure. The call fails if any
/// sink failed, carrying the first error.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ItemSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ItemSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl ItemSink for FanoutSink {
    async fn upsert(&self, source_name: &str, items: &[EnrichedItem]) -> StorageResult<usize> {
        let mut written = 0;
        let mut failed = 0;
        let mut first = None;

        for sink in &self.sinks {
            match sink.upsert(source_name, items).await {
                Ok(count) => written = written.max(count),
                Err(e) => {
                    failed += 1;
                    first.get_or_insert(e);
                }
            }
        }

        match first {
            None => Ok(written),
            Some(first) => Err(StorageError::Fanout {
                failed,
                total: self.sinks.len(),
                first: Box::new(first),
            }),
        }
    }
}
