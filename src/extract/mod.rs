//! Article text extraction
//!
//! Turns a DOM snapshot into clean article text:
//! - An ordered, profile-specific list of content-container selectors is
//!   tried first; the first selector whose first match yields non-empty
//!   text wins
//! - Otherwise the whole `<body>` is used
//! - Denylisted subtrees (navigation, footers, ads, scripts, ...) are
//!   skipped without touching the parsed document
//! - Whitespace is collapsed to single spaces and single newlines
//!
//! Extraction is a pure function of the HTML snapshot.

mod profile;
mod strategy;
mod text;

pub(crate) use profile::compile_selector;
pub use profile::{ExtractionProfile, ProfileRegistry, DEFAULT_DENYLIST};
pub use strategy::{extract, extract_detailed, Extraction, ExtractionOrigin};
pub use text::normalize_whitespace;
