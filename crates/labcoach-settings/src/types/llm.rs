//! Generation backend settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

/// Which generation backend to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// No remote backend; suggestions come from the heuristic templates.
    #[default]
    Mock,
    /// `OpenAI` chat completions.
    Openai,
    /// Groq's OpenAI-compatible endpoint.
    Groq,
}

impl LlmProvider {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Openai => "openai",
            Self::Groq => "groq",
        }
    }

    /// Base URL used when none is configured.
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            Self::Mock => None,
            Self::Openai => Some("https://api.openai.com/v1"),
            Self::Groq => Some("https://api.groq.com/openai/v1"),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" | "none" => Ok(Self::Mock),
            "openai" => Ok(Self::Openai),
            "groq" => Ok(Self::Groq),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown llm provider: {other}"
            ))),
        }
    }
}

/// Generation backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Backend kind.
    pub provider: LlmProvider,
    /// Model identifier sent to the backend.
    pub model: String,
    /// Override for the provider's base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// API key for the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Upper bound on one generation call.
    pub timeout_ms: u64,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum number of actions taken from one generation.
    pub max_actions: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Mock,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            api_key: None,
            timeout_ms: 30_000,
            temperature: 0.2,
            max_actions: 4,
        }
    }
}

impl LlmSettings {
    /// Configured base URL, else the provider default.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.provider.default_base_url().map(ToString::to_string))
    }
}
