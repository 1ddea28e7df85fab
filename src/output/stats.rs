//! Statistics from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! item and run statistics from the storage layer.

use crate::model::{RunSummary, SourceDescriptor};
use crate::storage::{RunLog, RunRecord, SourceStats, SqliteStorage, StorageResult};

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of stored items
    pub total_items: u64,

    /// Items stored with empty content
    pub empty_content: u64,

    /// Per-source counts, busiest first
    pub per_source: Vec<SourceStats>,

    /// Most recent pipeline run
    pub last_run: Option<RunRecord>,
}

impl HarvestStatistics {
    /// Share of items that have content, as a percentage
    pub fn content_rate(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        let with_content = self.total_items - self.empty_content.min(self.total_items);
        (with_content as f64 / self.total_items as f64) * 100.0
    }
}

/// Loads statistics from storage
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<HarvestStatistics> {
    let per_source = storage.source_stats()?;
    let total_items = per_source.iter().map(|s| s.items).sum();
    let empty_content = per_source.iter().map(|s| s.empty_content).sum();
    let last_run = storage.latest_run()?;

    Ok(HarvestStatistics {
        total_items,
        empty_content,
        per_source,
        last_run,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total items: {}", stats.total_items);
    println!("  Items without content: {}", stats.empty_content);
    println!("  Content rate: {:.1}%", stats.content_rate());
    println!();

    if !stats.per_source.is_empty() {
        println!("Items by Source:");
        for source in &stats.per_source {
            println!(
                "  {}: {} items ({} empty), last updated {}",
                source.source,
                source.items,
                source.empty_content,
                source.last_updated.as_deref().unwrap_or("never")
            );
        }
        println!();
    }

    match &stats.last_run {
        Some(run) => {
            println!("Last Run (#{}):", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
            println!("  Config hash: {}", run.config_hash);
            print_run_summary(&run.summary);
        }
        None => println!("No runs recorded yet."),
    }
}

/// Prints the counters of one run
pub fn print_run_summary(summary: &RunSummary) {
    println!(
        "  Sources: {} processed, {} failed (of {})",
        summary.sources_processed,
        summary.sources_failed,
        summary.total_sources()
    );
    println!(
        "  Items: {} resolved, {} persisted",
        summary.items_resolved, summary.items_persisted
    );
    if summary.batches_failed > 0 {
        println!("  Batches failed to persist: {}", summary.batches_failed);
    }
}

/// Prints the source registry
pub fn print_sources(sources: &[SourceDescriptor]) {
    println!("Registered Sources ({}):", sources.len());
    for source in sources {
        println!("  - {} [{}] {}", source.name, source.kind(), source.url);
        if !source.resolves_content() {
            println!("    (content not resolved)");
        }
    }
}
