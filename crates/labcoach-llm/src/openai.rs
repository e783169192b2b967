//! OpenAI-compatible chat completions backend (`OpenAI`, Groq).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::GenerationBackend;
use crate::errors::{GenerationError, Result};
use crate::prompt::GenerationPrompt;

/// Connection settings for [`OpenAiCompatibleBackend`].
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// Backend name used in logs.
    pub name: String,
    /// API base, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer key.
    pub api_key: String,
    /// Model id.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout.
    pub timeout: Duration,
}

/// Chat completions client requesting a JSON object response.
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiCompatibleBackend {
    /// Create a client with the configured timeout.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn body(&self, prompt: &GenerationPrompt) -> Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": prompt.messages(),
            "response_format": { "type": "json_object" },
        })
    }
}

/// Error message from an API error body.
///
/// Understands `{"error": {"message"}}`, `{"detail"}` and `{"message"}`;
/// anything else is reported as the raw body.
pub fn api_error_message(body: &str, status: u16) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(msg) = json["error"]["message"]
            .as_str()
            .or_else(|| json["detail"].as_str())
            .or_else(|| json["message"].as_str())
        {
            return msg.to_string();
        }
    }
    format!("HTTP {status}: {body}")
}

#[async_trait]
impl GenerationBackend for OpenAiCompatibleBackend {
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String> {
        debug!(backend = %self.config.name, model = %self.config.model, phase = %prompt.phase, "generation request");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(&self.config.api_key)
            .json(&self.body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(
                        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
                    )
                } else {
                    GenerationError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: api_error_message(&body, status.as_u16()),
            });
        }

        let payload: Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content.to_string())
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
