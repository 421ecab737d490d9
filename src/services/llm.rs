use crate::constants::{
    ANTHROPIC_API_VERSION, DEFAULT_ANTHROPIC_BASE_URL, DEFAULT_ANTHROPIC_MODEL,
    LLM_HTTP_TIMEOUT_SECONDS,
};
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// A system/user prompt pair with an output budget.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredPrompt {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// Text-generation dependency used by the classifier.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &StructuredPrompt) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// Anthropic Messages API client
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(
            api_key,
            DEFAULT_ANTHROPIC_MODEL.to_string(),
            DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        )
    }

    pub fn with_config(api_key: String, model: String, base_url: String) -> Self {
        AnthropicClient {
            client: Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, prompt: &StructuredPrompt) -> Result<String, GenerationError> {
        let url = format!("{}/v1/messages", self.base_url);

        tracing::debug!(
            model = %self.model,
            max_tokens = prompt.max_tokens,
            "Anthropic request: {} prompt chars",
            prompt.user.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&serde_json::json!({
                "model": &self.model,
                "max_tokens": prompt.max_tokens,
                "system": &prompt.system,
                "messages": [{"role": "user", "content": &prompt.user}]
            }))
            .timeout(Duration::from_secs(LLM_HTTP_TIMEOUT_SECONDS))
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status = %status, "Anthropic API HTTP error {}: {}", status, body);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("Failed to parse response: {}", e)))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(GenerationError::Malformed("empty response".to_string()));
        }

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
