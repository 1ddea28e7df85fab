//! Bounded retry state machine for content resolution
//!
//! An attempt ends in an [`AttemptOutcome`]. [`RetryPolicy::next_state`]
//! turns that outcome into the next [`AttemptState`] without touching a
//! timer, so the attempt budget and failure classification can be tested
//! on their own. The fetcher performs the sleeps the states ask for.

use crate::browser::BrowserError;
use crate::config::{BrowserConfig, RetryBackoff};
use std::time::Duration;

/// Default total attempts per URL (initial attempt plus two retries)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Classification of an error thrown during an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Navigation or wait exceeded its deadline
    Timeout,
    /// DNS, connection reset, refused connection and similar
    Network,
    /// Anything else; never retried
    Other,
}

const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out", "deadline"];

const NETWORK_PATTERNS: &[&str] = &[
    "net::err",
    "navigation failed",
    "connection",
    "network",
    "dns",
    "reset",
    "refused",
    "unreachable",
];

impl FailureKind {
    /// Classifies by error variant first, then by message pattern
    pub fn classify(error: &BrowserError) -> Self {
        match error {
            BrowserError::Timeout { .. } => Self::Timeout,
            BrowserError::Navigation { message, .. } => match Self::from_message(message) {
                Self::Other => Self::Network,
                kind => kind,
            },
            BrowserError::Launch(message) | BrowserError::Protocol(message) => {
                Self::from_message(message)
            }
            BrowserError::Closed => Self::Other,
        }
    }

    fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p)) {
            Self::Timeout
        } else if NETWORK_PATTERNS.iter().any(|p| lower.contains(p)) {
            Self::Network
        } else {
            Self::Other
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network)
    }
}

/// Pause inserted before a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    Immediate,
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl DelayPolicy {
    /// Policy for `retry-delay-ms`, `retry-backoff` and `retry-max-delay-ms`
    pub fn from_config(config: &BrowserConfig) -> Self {
        let base = Duration::from_millis(config.retry_delay_ms);
        if base.is_zero() {
            return Self::Immediate;
        }
        match config.retry_backoff {
            RetryBackoff::Fixed => Self::Fixed(base),
            RetryBackoff::Exponential => Self::Exponential {
                base,
                max: Duration::from_millis(config.retry_max_delay_ms).max(base),
            },
        }
    }

    /// Delay before running `attempt` (0-indexed, so the first retry is 1)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match *self {
            Self::Immediate => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exponent).min(max)
            }
        }
    }
}

/// What the fetcher observed after one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Extraction produced non-empty text
    Content(String),
    /// Extraction produced nothing
    Empty { navigation_succeeded: bool },
    /// The attempt threw before extraction finished
    Failed(FailureKind),
}

/// Internal to the fetcher: extracted text plus navigation status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub text: String,
    pub navigation_succeeded: bool,
}

impl From<ExtractionResult> for AttemptOutcome {
    fn from(result: ExtractionResult) -> Self {
        if result.text.is_empty() {
            Self::Empty {
                navigation_succeeded: result.navigation_succeeded,
            }
        } else {
            Self::Content(result.text)
        }
    }
}

/// States of a single URL's attempt chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Attempting { attempt: u32 },
    RetryScheduled { attempt: u32, delay: Duration },
    Succeeded(String),
    /// No content; `attempts` is how many were made
    Exhausted { attempts: u32 },
}

/// Attempt budget and delay policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: DelayPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DelayPolicy::Immediate,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: DelayPolicy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn has_budget_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    fn retry_or_exhaust(&self, attempt: u32) -> AttemptState {
        if self.has_budget_after(attempt) {
            let next = attempt + 1;
            AttemptState::RetryScheduled {
                attempt: next,
                delay: self.delay.delay_for(next),
            }
        } else {
            AttemptState::Exhausted {
                attempts: attempt + 1,
            }
        }
    }

    /// Transition after `attempt` (0-indexed) ended with `outcome`
    ///
    /// Empty content is retried only when navigation also failed; a page
    /// that loaded fine but had nothing to extract will not improve.
    pub fn next_state(&self, attempt: u32, outcome: AttemptOutcome) -> AttemptState {
        match outcome {
            AttemptOutcome::Content(text) if !text.is_empty() => AttemptState::Succeeded(text),
            AttemptOutcome::Content(_) | AttemptOutcome::Empty { navigation_succeeded: true } => {
                AttemptState::Exhausted {
                    attempts: attempt + 1,
                }
            }
            AttemptOutcome::Empty {
                navigation_succeeded: false,
            } => self.retry_or_exhaust(attempt),
            AttemptOutcome::Failed(kind) if kind.is_retryable() => self.retry_or_exhaust(attempt),
            AttemptOutcome::Failed(_) => AttemptState::Exhausted {
                attempts: attempt + 1,
            },
        }
    }
}
