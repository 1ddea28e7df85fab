use crate::config::SummarizerConfig;
use crate::summary::{Summarizer, SummaryError};
use crate::{ConfigError, ConfigResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters of article text sent to the model
const MAX_INPUT_CHARS: usize = 12_000;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    text: String,
}

/// Summarizer backed by an OpenAI-compatible completions endpoint
pub struct HttpSummarizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl HttpSummarizer {
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            max_tokens,
        }
    }

    /// Builds the summarizer from config; the credential must be set
    pub fn from_config(config: &SummarizerConfig) -> ConfigResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential(config.api_key_env.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::new(
            client,
            &config.endpoint,
            &config.model,
            api_key,
            config.max_tokens,
        ))
    }
}

fn build_prompt(text: &str) -> String {
    let excerpt: String = text.chars().take(MAX_INPUT_CHARS).collect();
    format!(
        "Summarize the following article in two or three sentences.\n\n{}\n\nSummary:",
        excerpt
    )
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        if text.trim().is_empty() {
            return Err(SummaryError::EmptyInput);
        }

        let request = CompletionRequest {
            model: &self.model,
            prompt: build_prompt(text),
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummaryError::Status(status.as_u16()));
        }

        let body: CompletionResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .filter(|summary| !summary.is_empty())
            .ok_or(SummaryError::EmptyResponse)
    }
}
