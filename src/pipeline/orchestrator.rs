//! Run orchestration
//!
//! One run visits every registered source in order:
//! 1. Read the source list from the registry
//! 2. Launch one shared browser for listing pages
//! 3. Per source: resolve raw items, drop url-less and duplicate items,
//!    then either batch them through content resolution or upsert them
//!    directly when the source does not need content
//! 4. Close the shared browser whatever happened
//!
//! A failing source is logged and counted; only a registry failure or a
//! failure to launch the shared browser fails the run.

use crate::browser::{launcher_from_config, Browser, BrowserLauncher};
use crate::config::Config;
use crate::dispatch::{build_http_client, DispatchSettings, ItemSource, SourceDispatcher};
use crate::extract::ProfileRegistry;
use crate::fetcher::ResilientFetcher;
use crate::model::{EnrichedItem, RawItem, RunSummary, SourceDescriptor};
use crate::pipeline::batch::{BatchProcessor, BatchReport};
use crate::storage::{ItemSink, RunLog, RunStatus, SourceRegistry};
use crate::url::canonical_item_url;
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Entry point for a full pass over all sources
pub struct Orchestrator {
    registry: Arc<dyn SourceRegistry>,
    dispatcher: Arc<dyn ItemSource>,
    launcher: Arc<dyn BrowserLauncher>,
    batches: BatchProcessor,
    sink: Arc<dyn ItemSink>,
    run_log: Option<(Arc<dyn RunLog>, String)>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        dispatcher: Arc<dyn ItemSource>,
        launcher: Arc<dyn BrowserLauncher>,
        batches: BatchProcessor,
        sink: Arc<dyn ItemSink>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            launcher,
            batches,
            sink,
            run_log: None,
        }
    }

    /// Wires the production collaborators from a validated config
    pub fn from_config(
        config: &Config,
        registry: Arc<dyn SourceRegistry>,
        sink: Arc<dyn ItemSink>,
    ) -> Result<Self> {
        let launcher = launcher_from_config(&config.browser)?;
        let profiles = ProfileRegistry::with_custom(&config.profiles)?;
        let client = build_http_client(&config.browser)?;

        let fetcher = ResilientFetcher::from_config(Arc::clone(&launcher), &config.browser);
        let dispatcher = SourceDispatcher::new(client, DispatchSettings::from_config(config));
        let batches =
            BatchProcessor::from_config(Arc::new(fetcher), Arc::clone(&sink), profiles, &config.pipeline);

        Ok(Self::new(
            registry,
            Arc::new(dispatcher),
            launcher,
            batches,
            sink,
        ))
    }

    /// Records each run, tagged with the config hash
    pub fn with_run_log(mut self, run_log: Arc<dyn RunLog>, config_hash: impl Into<String>) -> Self {
        self.run_log = Some((run_log, config_hash.into()));
        self
    }

    /// Processes every registered source once
    pub async fn run_all(&self) -> Result<RunSummary> {
        let run_id = self.start_run();
        let result = self.run_sources().await;

        match &result {
            Ok(summary) => {
                tracing::info!(
                    "Run complete: {} sources processed, {} failed, {} items resolved, {} persisted",
                    summary.sources_processed,
                    summary.sources_failed,
                    summary.items_resolved,
                    summary.items_persisted
                );
                self.finish_run(run_id, RunStatus::Completed, summary);
            }
            Err(e) => {
                tracing::error!("Run aborted: {}", e);
                self.finish_run(run_id, RunStatus::Failed, &RunSummary::default());
            }
        }
        result
    }

    async fn run_sources(&self) -> Result<RunSummary> {
        let sources = self.registry.list_sources().await?;
        tracing::info!("Starting run over {} sources", sources.len());

        let browser = self.launcher.launch().await?;
        let mut summary = RunSummary::default();

        for source in &sources {
            match self.process_source(source, browser.as_ref()).await {
                Ok(report) => {
                    summary.sources_processed += 1;
                    summary.items_resolved += report.items_resolved;
                    summary.items_persisted += report.items_persisted;
                    summary.batches_failed += report.batches_failed;
                }
                Err(e) => {
                    summary.sources_failed += 1;
                    tracing::error!(source = %source.name, "Source failed: {}", e);
                }
            }
        }

        if let Err(e) = browser.close().await {
            tracing::warn!("Failed to close shared browser: {}", e);
        }
        Ok(summary)
    }

    async fn process_source(
        &self,
        source: &SourceDescriptor,
        browser: &dyn Browser,
    ) -> Result<BatchReport> {
        tracing::info!(source = %source.name, "Processing {} source {}", source.kind(), source.url);

        let raw = self.dispatcher.resolve_items(source, browser).await?;
        let found = raw.len();
        let items = prepare_items(raw);
        if items.len() < found {
            tracing::debug!(
                source = %source.name,
                "Dropped {} items without a usable or unique URL",
                found - items.len()
            );
        }

        if source.resolves_content() {
            return Ok(self
                .batches
                .process_source(&source.name, items, source.content_profile())
                .await);
        }

        Ok(self.persist_direct(&source.name, items).await)
    }

    /// Upserts items as-is with empty content, in one call
    async fn persist_direct(&self, source_name: &str, items: Vec<RawItem>) -> BatchReport {
        let mut report = BatchReport::default();
        if items.is_empty() {
            return report;
        }

        let enriched: Vec<EnrichedItem> = items.into_iter().map(EnrichedItem::without_content).collect();
        report.batches = 1;
        match self.sink.upsert(source_name, &enriched).await {
            Ok(written) => {
                report.items_persisted = written as u64;
                tracing::info!(source = %source_name, "Stored {} items without content resolution", written);
            }
            Err(e) => {
                report.batches_failed = 1;
                tracing::error!(source = %source_name, "Failed to persist items: {}", e);
            }
        }
        report
    }

    fn start_run(&self) -> Option<i64> {
        let (log, hash) = self.run_log.as_ref()?;
        match log.start_run(hash) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Failed to record run start: {}", e);
                None
            }
        }
    }

    fn finish_run(&self, run_id: Option<i64>, status: RunStatus, summary: &RunSummary) {
        let (Some(id), Some((log, _))) = (run_id, self.run_log.as_ref()) else {
            return;
        };
        if let Err(e) = log.finish_run(id, status, summary) {
            tracing::warn!("Failed to record run {} result: {}", id, e);
        }
    }
}

/// Canonicalizes item URLs, dropping unusable ones and later duplicates
fn prepare_items(items: Vec<RawItem>) -> Vec<RawItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter_map(|mut item| {
            let url = canonical_item_url(&item.url, None)?;
            if !seen.insert(url.clone()) {
                return None;
            }
            item.url = url;
            Some(item)
        })
        .collect()
}
