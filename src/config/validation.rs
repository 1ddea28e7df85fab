use crate::config::types::{BrowserConfig, Config, IndexConfig, PipelineConfig, SummarizerConfig};
use crate::extract::ProfileRegistry;
use crate::model::{SourceConfig, SourceDescriptor};
use crate::ConfigError;
use chrono::NaiveTime;
use std::collections::HashSet;
use url::Url;

const MAX_BATCH_SIZE: usize = 50;
const MAX_ATTEMPTS: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;
    validate_browser_config(&config.browser)?;
    validate_output_config(&config.output)?;
    parse_daily_at(&config.schedule.daily_at)?;
    if let Some(index) = &config.index {
        validate_index_config(index)?;
    }
    if let Some(summarizer) = &config.summarizer {
        validate_summarizer_config(summarizer)?;
    }

    // Compiles every custom profile selector
    let profiles = ProfileRegistry::with_custom(&config.profiles)?;
    validate_sources(&config.sources, &profiles)?;
    Ok(())
}

/// Parses a `HH:MM` wall-clock time
pub fn parse_daily_at(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| {
        ConfigError::Validation(format!("daily-at must be HH:MM, got '{}'", value))
    })
}

fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.api_top_n < 1 {
        return Err(ConfigError::Validation(
            "api-top-n must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > MAX_ATTEMPTS {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and {}, got {}",
            MAX_ATTEMPTS, config.max_attempts
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("navigation-timeout-ms", config.navigation_timeout_ms),
        ("listing-navigation-timeout-ms", config.listing_navigation_timeout_ms),
        ("body-wait-timeout-ms", config.body_wait_timeout_ms),
        ("selector-wait-timeout-ms", config.selector_wait_timeout_ms),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    validate_http_url("index endpoint", &config.endpoint)?;
    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "index api-key-env cannot be empty".to_string(),
        ));
    }
    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "index timeout-ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    validate_http_url("summarizer endpoint", &config.endpoint)?;
    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }
    if config.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "summarizer max-tokens must be > 0".to_string(),
        ));
    }
    if config.timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "summarizer timeout-ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates configured sources
fn validate_sources(
    sources: &[SourceDescriptor],
    profiles: &ProfileRegistry,
) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for source in sources {
        validate_source(source, profiles)?;
        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name '{}'",
                source.name
            )));
        }
    }
    Ok(())
}

/// Validates a single source descriptor
///
/// Also used when a source is added to the registry from the CLI.
pub fn validate_source(
    source: &SourceDescriptor,
    profiles: &ProfileRegistry,
) -> Result<(), ConfigError> {
    if source.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "Source name cannot be empty".to_string(),
        ));
    }

    validate_http_url(&format!("source '{}'", source.name), &source.url)?;

    match &source.config {
        SourceConfig::Api(api) => {
            for (label, template) in [
                ("item-url", api.item_url.as_deref()),
                ("discussion-url", api.discussion_url.as_deref()),
            ] {
                if let Some(template) = template {
                    if !template.contains("{id}") {
                        return Err(ConfigError::Validation(format!(
                            "Source '{}': {} must contain an {{id}} placeholder",
                            source.name, label
                        )));
                    }
                }
            }
            if api.top_n == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "Source '{}': top-n must be >= 1",
                    source.name
                )));
            }
        }
        SourceConfig::Rss(_) => {}
        SourceConfig::Scrape(scrape) => {
            if scrape.target().is_none() {
                return Err(ConfigError::Validation(format!(
                    "Scrape source '{}' needs a known strategy or a selector",
                    source.name
                )));
            }
            if let Some(selector) = scrape.selector.as_deref() {
                crate::extract::compile_selector(selector)?;
            }
        }
    }

    let profile = source.content_profile();
    if !profiles.contains(profile) {
        return Err(ConfigError::Validation(format!(
            "Source '{}' references unknown extraction profile '{}'",
            source.name, profile
        )));
    }

    Ok(())
}

fn validate_http_url(label: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL for {} '{}': {}", label, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "URL for {} '{}' must use http or https",
            label, raw
        )));
    }

    Ok(())
}
