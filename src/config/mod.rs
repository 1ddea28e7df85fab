//! Configuration module for News Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use news_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Batch size: {}", config.pipeline.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserBackend, BrowserConfig, Config, IndexConfig, OutputConfig, PipelineConfig,
    ProfileConfig, RetryBackoff, ScheduleConfig, SummarizerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{parse_daily_at, validate_source};
