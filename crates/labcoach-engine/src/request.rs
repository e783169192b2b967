//! Suggestion request options and pipeline outcome.

use labcoach_core::{FocusHint, MemoryMode, Phase, PhaseOverride, RetrievedContext, Suggestion};
use serde::{Deserialize, Serialize};

/// Default raw events shown in `window` memory mode.
pub const DEFAULT_HISTORY_WINDOW: usize = 12;

/// Largest accepted history window.
pub const MAX_HISTORY_WINDOW: usize = 120;

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

/// Per-call options for a suggestion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRequest {
    /// Learner message, recorded as a note before the pipeline runs.
    #[serde(default)]
    pub user_message: Option<String>,
    /// How much raw history is folded into context.
    #[serde(default)]
    pub memory_mode: MemoryMode,
    /// Events shown in `window` mode, clamped to 1..=120.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Phase to display instead of the inferred one.
    #[serde(default)]
    pub phase_override: Option<PhaseOverride>,
    /// Retrieval focus.
    #[serde(default, rename = "rag_focus", alias = "focus")]
    pub focus: FocusHint,
}

impl Default for SuggestRequest {
    fn default() -> Self {
        Self {
            user_message: None,
            memory_mode: MemoryMode::default(),
            history_window: DEFAULT_HISTORY_WINDOW,
            phase_override: None,
            focus: FocusHint::Auto,
        }
    }
}

impl SuggestRequest {
    /// Builder: set the learner message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.user_message = Some(message.into());
        self
    }

    /// Builder: set the retrieval focus.
    #[must_use]
    pub fn with_focus(mut self, focus: FocusHint) -> Self {
        self.focus = focus;
        self
    }

    /// Builder: set a phase override.
    #[must_use]
    pub fn with_override(mut self, phase_override: PhaseOverride) -> Self {
        self.phase_override = Some(phase_override);
        self
    }

    /// Builder: set the memory mode.
    #[must_use]
    pub fn with_memory_mode(mut self, memory_mode: MemoryMode) -> Self {
        self.memory_mode = memory_mode;
        self
    }

    /// History window clamped to its accepted range.
    pub fn effective_history_window(&self) -> usize {
        self.history_window.clamp(1, MAX_HISTORY_WINDOW)
    }
}

/// Where the proposed actions came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionSource {
    /// Parsed from generator output.
    Llm,
    /// Phase templates.
    Heuristic,
}

/// Everything one pipeline run produces.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuggestionOutcome {
    /// The sanitized suggestion.
    #[serde(flatten)]
    pub suggestion: Suggestion,
    /// Classifier confidence for the inferred phase.
    pub phase_confidence: f32,
    /// Retrieved knowledge, best first.
    pub retrieved_context: Vec<RetrievedContext>,
    /// Generator or templates.
    pub source: SuggestionSource,
    /// Phase the session should persist after this run.
    #[serde(skip)]
    pub phase_to_persist: Phase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_from_empty_json() {
        let req: SuggestRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, SuggestRequest::default());
        assert_eq!(req.memory_mode, MemoryMode::Window);
        assert_eq!(req.history_window, DEFAULT_HISTORY_WINDOW);
    }

    #[test]
    fn rag_focus_wire_name() {
        let req: SuggestRequest =
            serde_json::from_str(r#"{"rag_focus": "report", "history_window": 500}"#)
                .unwrap();
        assert_eq!(req.focus, FocusHint::Phase(Phase::Report));
        assert_eq!(req.effective_history_window(), MAX_HISTORY_WINDOW);
    }
}
