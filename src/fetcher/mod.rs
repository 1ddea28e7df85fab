//! Resilient content fetching
//!
//! [`ResilientFetcher`] wraps a page session and the extraction strategy
//! in a bounded retry loop driven by the state machine in [`retry`].

mod resilient;
pub mod retry;

pub use resilient::{ContentResolver, ResilientFetcher};
pub use retry::{
    AttemptOutcome, AttemptState, DelayPolicy, ExtractionResult, FailureKind, RetryPolicy,
    DEFAULT_MAX_ATTEMPTS,
};
