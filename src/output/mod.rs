//! Output module for reporting on harvested data
//!
//! This module handles:
//! - Loading item and run statistics from the database
//! - Printing statistics, run summaries and the source registry

pub mod stats;

pub use stats::{
    load_statistics, print_run_summary, print_sources, print_statistics, HarvestStatistics,
};
