//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`LabcoachSettings::default()`]
//! 2. If `~/.labcoach/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use labcoach_core::text::split_csv;
use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{LabcoachSettings, LlmProvider};

/// Resolve the path to the settings file (`~/.labcoach/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".labcoach").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LabcoachSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<LabcoachSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Defaults with the settings file merged over them, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<LabcoachSettings> {
    let defaults = serde_json::to_value(LabcoachSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Reject values that would make the pipeline misbehave.
pub fn validate(settings: &LabcoachSettings) -> Result<()> {
    if settings.knowledge.top_k == 0 {
        return Err(SettingsError::InvalidValue(
            "knowledge.topK must be at least 1".into(),
        ));
    }
    if settings.knowledge.chunk_size < 100 {
        return Err(SettingsError::InvalidValue(
            "knowledge.chunkSize must be at least 100".into(),
        ));
    }
    if settings.embedding.dimensions == 0 {
        return Err(SettingsError::InvalidValue(
            "embedding.dimensions must be at least 1".into(),
        ));
    }
    if settings.session.max_events == 0 {
        return Err(SettingsError::InvalidValue(
            "session.maxEvents must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (file/default value kept).
pub fn apply_env_overrides(settings: &mut LabcoachSettings) {
    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LABCOACH_LLM_PROVIDER") {
        match v.parse::<LlmProvider>() {
            Ok(provider) => settings.llm.provider = provider,
            Err(e) => tracing::warn!(key = "LABCOACH_LLM_PROVIDER", error = %e, "ignoring"),
        }
    }
    if let Some(v) = read_env_string("LABCOACH_LLM_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = read_env_string("LABCOACH_LLM_BASE_URL") {
        settings.llm.base_url = Some(v);
    }
    if let Some(v) = read_env_u64("LABCOACH_LLM_TIMEOUT_MS", 100, 600_000) {
        settings.llm.timeout_ms = v;
    }
    let key_var = match settings.llm.provider {
        LlmProvider::Openai => Some("OPENAI_API_KEY"),
        LlmProvider::Groq => Some("GROQ_API_KEY"),
        LlmProvider::Mock => None,
    };
    if let Some(v) = key_var.and_then(read_env_string) {
        settings.llm.api_key = Some(v);
    }

    // ── Embeddings ──────────────────────────────────────────────────
    if let Some(v) = read_env_string("HF_TOKEN") {
        settings.embedding.token = Some(v);
    }
    if let Some(v) = read_env_string("LABCOACH_EMBEDDING_MODEL") {
        settings.embedding.model = v;
    }

    // ── Knowledge ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("LABCOACH_RAG_SOURCE_DIR") {
        settings.knowledge.source_dir = v;
    }
    if let Some(v) = read_env_string("LABCOACH_RAG_INDEX_PATH") {
        settings.knowledge.index_path = v;
    }
    if let Some(v) = read_env_usize("LABCOACH_RAG_TOP_K", 1, 50) {
        settings.knowledge.top_k = v;
    }
    if let Some(v) = read_env_usize("LABCOACH_RAG_CHUNK_SIZE", 100, 20_000) {
        settings.knowledge.chunk_size = v;
    }

    // ── Session ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LABCOACH_SESSION_DIR") {
        settings.session.store_dir = v;
    }
    if let Some(v) = read_env_usize("LABCOACH_MAX_EVENTS", 1, 100_000) {
        settings.session.max_events = v;
    }
    if let Some(v) = read_env_usize("LABCOACH_HISTORY_WINDOW", 1, 120) {
        settings.session.history_window = v;
    }

    // ── Policy ──────────────────────────────────────────────────────
    if let Some(v) = read_env_list("LABCOACH_ALLOWED_TOOLS") {
        settings.policy.allowed_tools = v;
    }
    if let Some(v) = read_env_list("LABCOACH_BLOCKLIST") {
        settings.policy.blocklist_patterns = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LABCOACH_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("LABCOACH_LOG_JSON") {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_list(name: &str) -> Option<Vec<String>> {
    let val = read_env_string(name)?;
    let list = split_csv(&val);
    if list.is_empty() {
        tracing::warn!(key = name, value = %val, "empty list env var, ignoring");
        return None;
    }
    Some(list)
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
