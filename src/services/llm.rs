//! Generative evaluator backed by the Anthropic Messages API
//!
//! One evaluation call makes exactly one generative request. There is no
//! retry: a failed or empty response surfaces as a generation failure and
//! the caller decides whether to re-run the whole evaluation.

use crate::error::{EvaluationError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub use crate::config::LlmConfig;

/// Generative text service invoked once per evaluation call
#[async_trait]
pub trait GenerativeEvaluator: Send + Sync {
    /// Produce free-form text for a structured evaluation request
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// LLM service calling the Anthropic Messages API
pub struct LlmService {
    config: LlmConfig,
    client: Client,
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    text: String,
}

impl LlmService {
    /// Create a new LLM service with custom config
    pub fn new(config: LlmConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EvaluationError::Generation(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create with default config (reads ANTHROPIC_API_KEY)
    pub fn with_default() -> Result<Self> {
        Self::new(LlmConfig::default())
    }

    /// Make an API call to Claude
    async fn call_api(&self, prompt: &str) -> Result<String> {
        debug!("Calling Anthropic API, prompt length {} chars", prompt.len());

        let request = AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EvaluationError::Generation(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EvaluationError::Generation(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| EvaluationError::Generation(format!("Failed to parse response: {}", e)))?;

        api_response
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| EvaluationError::Generation("Empty response from API".to_string()))
    }
}

#[async_trait]
impl GenerativeEvaluator for LlmService {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let text = self.call_api(prompt).await?;

        if text.trim().is_empty() {
            return Err(EvaluationError::Generation(
                "Model returned empty text".to_string(),
            ));
        }

        Ok(text)
    }
}
