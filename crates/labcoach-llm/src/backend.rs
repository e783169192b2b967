//! Generation backend trait and construction from settings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use labcoach_settings::{LlmProvider, LlmSettings};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::openai::{OpenAiCompatibleBackend, OpenAiConfig};
use crate::prompt::GenerationPrompt;

/// A text generator: structured prompt in, raw text out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &GenerationPrompt) -> Result<String>;

    /// Short backend name for logs and health tracking.
    fn name(&self) -> &str;
}

/// Build the backend described by `settings`.
///
/// `mock` and providers without an API key yield `None`; the engine then
/// goes straight to its heuristic generator.
pub fn build_backend(settings: &LlmSettings) -> Option<Arc<dyn GenerationBackend>> {
    if settings.provider == LlmProvider::Mock {
        debug!("llm provider is mock, heuristic suggestions only");
        return None;
    }
    let Some(api_key) = settings.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        warn!(provider = %settings.provider, "no api key configured, heuristic suggestions only");
        return None;
    };
    let base_url = settings.resolved_base_url()?;
    let config = OpenAiConfig {
        name: settings.provider.as_str().to_string(),
        base_url,
        api_key,
        model: settings.model.clone(),
        temperature: settings.temperature,
        timeout: Duration::from_millis(settings.timeout_ms.max(1)),
    };
    match OpenAiCompatibleBackend::new(config) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(e) => {
            warn!(error = %e, "failed to build generation client");
            None
        }
    }
}
