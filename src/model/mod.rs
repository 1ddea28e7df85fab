//! Data model shared by the pipeline stages
//!
//! - [`SourceDescriptor`]: a configured origin of content and its typed config
//! - [`RawItem`]: a listing entry produced before content resolution
//! - [`EnrichedItem`]: a raw item plus its resolved article text
//! - [`RunSummary`]: counters reported by a full run

mod item;
mod source;

pub use item::{EnrichedItem, RawItem, RunSummary};
pub use source::{
    ApiConfig, ListingProfile, RssConfig, ScrapeConfig, ScrapeTarget, SourceConfig,
    SourceDescriptor, SourceEntry, SourceKind,
};
