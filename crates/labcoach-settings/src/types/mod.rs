//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. `#[serde(default)]` lets a settings
//! file carry only the fields it wants to change.

mod llm;
mod retrieval;
mod runtime;

pub use llm::*;
pub use retrieval::*;
pub use runtime::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// Loaded from `~/.labcoach/settings.json` with defaults applied for missing
/// fields. Environment variables override specific values. Example:
///
/// ```json
/// {
///   "llm": { "provider": "groq", "model": "llama-3.1-8b-instant" },
///   "knowledge": { "topK": 6 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabcoachSettings {
    /// Generation backend selection.
    pub llm: LlmSettings,
    /// Embedding backend and cache.
    pub embedding: EmbeddingSettings,
    /// Knowledge corpus and index file.
    pub knowledge: KnowledgeSettings,
    /// Default tool policy for new sessions.
    pub policy: PolicySettings,
    /// Session storage and memory window.
    pub session: SessionSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let value = serde_json::to_value(LabcoachSettings::default()).unwrap();
        assert_eq!(value["knowledge"]["topK"], 4);
        assert_eq!(value["knowledge"]["chunkSize"], 1200);
        assert_eq!(value["session"]["maxEvents"], 600);
        let back: LabcoachSettings = serde_json::from_value(value).unwrap();
        assert_eq!(back.llm.provider, LlmProvider::Mock);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let settings: LabcoachSettings =
            serde_json::from_str(r#"{"session": {"historyWindow": 30}}"#).unwrap();
        assert_eq!(settings.session.history_window, 30);
        assert_eq!(settings.session.max_events, 600);
        assert_eq!(settings.embedding.dimensions, 384);
    }
}
