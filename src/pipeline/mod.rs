//! The content-acquisition pipeline
//!
//! [`Orchestrator`] drives a run over every source, handing each source's
//! items to the [`BatchProcessor`]. [`schedule`] repeats runs daily.

mod batch;
mod orchestrator;
pub mod schedule;

pub use batch::{BatchProcessor, BatchReport};
pub use orchestrator::Orchestrator;
pub use schedule::{next_run_after, run_daily};
