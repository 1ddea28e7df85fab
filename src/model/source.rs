//! Source descriptors
//!
//! A source is stored and configured as a loosely typed entry
//! (`name`, `type`, `url`, `config`) and converted into a
//! [`SourceDescriptor`] whose config is a variant keyed by the type.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Acquisition routine used for a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON API endpoint (optionally a story-index API)
    Api,
    /// RSS feed
    Rss,
    /// Listing page scraped through the browser
    Scrape,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Rss => "rss",
            Self::Scrape => "scrape",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Some(Self::Api),
            "rss" => Some(Self::Rss),
            "scrape" => Some(Self::Scrape),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Config for `api` sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Item detail endpoint with an `{id}` placeholder. When present the
    /// source URL is treated as a story-index returning item identifiers.
    #[serde(default)]
    pub item_url: Option<String>,

    /// Discussion-thread URL template with an `{id}` placeholder
    #[serde(default)]
    pub discussion_url: Option<String>,

    /// Overrides `pipeline.api-top-n` for this source
    #[serde(default)]
    pub top_n: Option<usize>,

    /// Extraction profile used for item pages
    #[serde(default)]
    pub content_profile: Option<String>,

    #[serde(default = "default_true")]
    pub resolve_content: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            item_url: None,
            discussion_url: None,
            top_n: None,
            content_profile: None,
            resolve_content: true,
        }
    }
}

/// Config for `rss` sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RssConfig {
    /// Resolve article text for feed items through the batch processor
    #[serde(default)]
    pub resolve_content: bool,

    #[serde(default)]
    pub content_profile: Option<String>,
}

/// Config for `scrape` sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScrapeConfig {
    /// Named site profile, e.g. `huggingface_blog` or `hacker_news`
    #[serde(default, alias = "scrape-type")]
    pub strategy: Option<String>,

    /// Selector matching listing anchors for generic scraping
    #[serde(default)]
    pub selector: Option<String>,

    #[serde(default)]
    pub content_profile: Option<String>,

    #[serde(default = "default_true")]
    pub resolve_content: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            strategy: None,
            selector: None,
            content_profile: None,
            resolve_content: true,
        }
    }
}

/// Site profiles with a dedicated listing extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingProfile {
    HuggingFaceBlog,
    HackerNews,
}

impl ListingProfile {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "huggingface_blog" => Some(Self::HuggingFaceBlog),
            "hacker_news" | "hackernews" => Some(Self::HackerNews),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::HuggingFaceBlog => "huggingface_blog",
            Self::HackerNews => "hacker_news",
        }
    }

    /// Selector that signals the listing has rendered
    pub fn ready_selector(&self) -> &'static str {
        match self {
            Self::HuggingFaceBlog => "[data-props]",
            Self::HackerNews => ".titleline > a",
        }
    }
}

/// How a scrape source's listing page is read
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeTarget {
    Profile(ListingProfile),
    Selector(String),
}

impl ScrapeConfig {
    /// Resolves the listing strategy; a known strategy tag wins over a selector
    pub fn target(&self) -> Option<ScrapeTarget> {
        if let Some(profile) = self.strategy.as_deref().and_then(ListingProfile::from_tag) {
            return Some(ScrapeTarget::Profile(profile));
        }
        self.selector
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| ScrapeTarget::Selector(s.clone()))
    }
}

/// Typed per-kind configuration
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Api(ApiConfig),
    Rss(RssConfig),
    Scrape(ScrapeConfig),
}

/// A configured origin of content
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SourceEntry", into = "SourceEntry")]
pub struct SourceDescriptor {
    pub name: String,
    pub url: String,
    pub config: SourceConfig,
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self.config {
            SourceConfig::Api(_) => SourceKind::Api,
            SourceConfig::Rss(_) => SourceKind::Rss,
            SourceConfig::Scrape(_) => SourceKind::Scrape,
        }
    }

    /// Whether items from this source go through content resolution
    pub fn resolves_content(&self) -> bool {
        match &self.config {
            SourceConfig::Api(c) => c.resolve_content,
            SourceConfig::Rss(c) => c.resolve_content,
            SourceConfig::Scrape(c) => c.resolve_content,
        }
    }

    /// Name of the extraction profile for item pages
    pub fn content_profile(&self) -> &str {
        let configured = match &self.config {
            SourceConfig::Api(c) => c.content_profile.as_deref(),
            SourceConfig::Rss(c) => c.content_profile.as_deref(),
            SourceConfig::Scrape(c) => c.content_profile.as_deref(),
        };
        if let Some(name) = configured {
            return name;
        }
        match &self.config {
            SourceConfig::Scrape(c) => match c.target() {
                Some(ScrapeTarget::Profile(ListingProfile::HuggingFaceBlog)) => "huggingface_blog",
                _ => "generic",
            },
            _ => "generic",
        }
    }
}

/// Loosely typed form used by config files and the sources table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

impl TryFrom<SourceEntry> for SourceDescriptor {
    type Error = ConfigError;

    fn try_from(entry: SourceEntry) -> Result<Self, Self::Error> {
        let raw = if entry.config.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            entry.config
        };

        let invalid = |e: serde_json::Error| {
            ConfigError::Validation(format!("Invalid config for source '{}': {}", entry.name, e))
        };

        let config = match entry.kind {
            SourceKind::Api => SourceConfig::Api(serde_json::from_value(raw).map_err(invalid)?),
            SourceKind::Rss => SourceConfig::Rss(serde_json::from_value(raw).map_err(invalid)?),
            SourceKind::Scrape => {
                SourceConfig::Scrape(serde_json::from_value(raw).map_err(invalid)?)
            }
        };

        Ok(Self {
            name: entry.name,
            url: entry.url,
            config,
        })
    }
}

impl From<SourceDescriptor> for SourceEntry {
    fn from(source: SourceDescriptor) -> Self {
        let kind = source.kind();
        let config = match &source.config {
            SourceConfig::Api(c) => serde_json::to_value(c),
            SourceConfig::Rss(c) => serde_json::to_value(c),
            SourceConfig::Scrape(c) => serde_json::to_value(c),
        }
        .unwrap_or_default();

        Self {
            name: source.name,
            kind,
            url: source.url,
            config,
        }
    }
}
