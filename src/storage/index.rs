//! Remote search-index sink
//!
//! Documents are posted as `{"documents": [...]}` with a bearer token.
//! The client is built once from `[index]` and carries no state between
//! calls, so it needs no teardown.

use crate::config::IndexConfig;
use crate::model::EnrichedItem;
use crate::storage::traits::{ItemSink, StorageError, StorageResult};
use crate::{ConfigError, ConfigResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Index document shape
#[derive(Debug, Serialize)]
struct IndexDocument<'a> {
    id: String,
    source: &'a str,
    title: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upvotes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    discussion_url: Option<&'a str>,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    documents: Vec<IndexDocument<'a>>,
}

/// [`ItemSink`] backed by an HTTP search index
pub struct HttpIndexSink {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpIndexSink {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds the sink from config, reading the API key from the environment
    pub fn from_config(config: &IndexConfig) -> ConfigResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential(config.api_key_env.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::new(client, &config.endpoint, api_key))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn index_error(&self, message: impl Into<String>) -> StorageError {
        StorageError::Index {
            endpoint: self.endpoint.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ItemSink for HttpIndexSink {
    async fn upsert(&self, source_name: &str, items: &[EnrichedItem]) -> StorageResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let body = UpsertRequest {
            documents: items
                .iter()
                .map(|item| IndexDocument {
                    id: item.record_id(source_name),
                    source: source_name,
                    title: &item.title,
                    url: &item.url,
                    date: item.date.as_deref(),
                    upvotes: item.upvotes,
                    discussion_url: item.discussion_url.as_deref(),
                    content: &item.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.index_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.index_error(format!("HTTP {}", status.as_u16())));
        }

        tracing::debug!(
            "Indexed {} documents for '{}' at {}",
            items.len(),
            source_name,
            self.endpoint
        );
        Ok(items.len())
    }
}
