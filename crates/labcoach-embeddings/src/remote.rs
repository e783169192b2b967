//! Remote feature-extraction embedding backend.
//!
//! Posts `{"inputs": [...]}` to `{base_url}/{model}` with a bearer token and
//! accepts any of the response shapes feature-extraction endpoints return:
//! a single vector, one vector per input, or per-token vectors per input
//! (mean-pooled here).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::errors::{EmbeddingError, Result};
use crate::normalize::{l2_normalize, mean_pool};
use crate::service::{BackendId, EmbeddingService};

/// Connection settings for [`RemoteEmbeddingService`].
#[derive(Clone, Debug)]
pub struct RemoteEmbeddingConfig {
    /// Endpoint prefix; the model id is appended as a path segment.
    pub base_url: String,
    /// Model id.
    pub model: String,
    /// Bearer token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Expected dimension (0 = unknown).
    pub dimensions: usize,
}

/// Embedding backend calling a hosted feature-extraction endpoint.
pub struct RemoteEmbeddingService {
    client: reqwest::Client,
    config: RemoteEmbeddingConfig,
}

impl RemoteEmbeddingService {
    /// Create a client. The per-request timeout is applied on the client.
    pub fn new(config: RemoteEmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_vector(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    items
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

fn as_pooled(value: &Value) -> Option<Vec<f32>> {
    if let Some(v) = as_vector(value) {
        return Some(v);
    }
    let rows: Option<Vec<Vec<f32>>> = value.as_array()?.iter().map(as_vector).collect();
    mean_pool(&rows?)
}

/// Normalize a feature-extraction response into one vector per input.
pub fn parse_feature_extraction(raw: &Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let invalid = |msg: &str| EmbeddingError::InvalidResponse(msg.to_string());
    let items = raw.as_array().ok_or_else(|| invalid("response is not an array"))?;

    if expected == 1 && items.first().is_some_and(Value::is_number) {
        let v = as_vector(raw).ok_or_else(|| invalid("non-numeric vector component"))?;
        return Ok(vec![v]);
    }

    let vectors: Vec<Vec<f32>> = items
        .iter()
        .map(as_pooled)
        .collect::<Option<_>>()
        .ok_or_else(|| invalid("invalid embedding row"))?;

    if vectors.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {expected} vectors, got {}",
            vectors.len()
        )));
    }
    if vectors.iter().any(Vec::is_empty) {
        return Err(invalid("empty embedding row"));
    }
    Ok(vectors)
}

#[async_trait]
impl EmbeddingService for RemoteEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let token = self
            .config
            .token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(EmbeddingError::NotReady)?;

        debug!(model = %self.config.model, batch = texts.len(), "remote embedding request");

        let response = self
            .client
            .post(self.url())
            .bearer_auth(token)
            .json(&json!({ "inputs": texts, "options": { "wait_for_model": true } }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout(
                        u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
                    )
                } else {
                    EmbeddingError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let raw: Value = response.json().await?;
        let mut vectors = parse_feature_extraction(&raw, texts.len())?;
        for v in &mut vectors {
            l2_normalize(v);
        }
        Ok(vectors)
    }

    fn is_ready(&self) -> bool {
        self.config
            .token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn backend_id(&self) -> BackendId {
        BackendId::Remote {
            model: self.config.model.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
