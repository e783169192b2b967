//! Structured prompt sent to a generation backend.

use labcoach_core::text::truncate_str;
use labcoach_core::{Phase, RetrievedContext};
use serde::Serialize;
use serde_json::{Value, json};

/// System message for every generation call.
pub const SYSTEM_PROMPT: &str = "You are a coaching assistant for an isolated cyber range lab. \
Propose the learner's next checklist-style actions. Return strict JSON only.";

/// Retrieved snippets are cut to this many characters in the prompt.
pub const CONTEXT_SNIPPET_CHARS: usize = 500;

/// Rules restated to the generator on every call.
pub const CONSTRAINTS: &[&str] = &[
    "Lab-only coaching. Never provide real-world destructive instructions.",
    "Use only in-scope targets and allowed lab tools.",
    "Provide checklist-style next actions with completion criteria.",
    "No credential theft or persistence guidance.",
];

/// Everything the generator sees for one suggestion.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GenerationPrompt {
    /// Lab objective of the session.
    pub objective: String,
    /// Displayed phase.
    pub phase: Phase,
    /// Completion criterion of the phase.
    pub done_criteria: String,
    /// Episode digest.
    pub episode_summary: String,
    /// Evidence gaps for the phase.
    pub missing_artifacts: Vec<String>,
    /// Declared scope entries.
    pub target_scope: Vec<String>,
    /// Tools the learner may use.
    pub allowed_tools: Vec<String>,
    /// The learner's message for this turn.
    pub user_message: String,
    /// Recent events or full history, depending on the memory mode.
    pub memory_context: String,
    /// Ranked knowledge snippets.
    pub retrieved_context: Vec<RetrievedContext>,
    /// Upper bound on proposed actions.
    pub max_actions: usize,
}

impl GenerationPrompt {
    /// JSON payload carried in the user message.
    pub fn payload(&self) -> Value {
        let context: Vec<Value> = self
            .retrieved_context
            .iter()
            .map(|c| {
                json!({
                    "source": c.source,
                    "score": (c.score * 10_000.0).round() / 10_000.0,
                    "content": truncate_str(&c.text, CONTEXT_SNIPPET_CHARS),
                })
            })
            .collect();

        json!({
            "objective": self.objective,
            "phase": self.phase,
            "done_criteria": self.done_criteria,
            "episode_summary": self.episode_summary,
            "missing_artifacts": self.missing_artifacts,
            "target_scope": self.target_scope,
            "allowed_tools": self.allowed_tools,
            "user_message": self.user_message,
            "memory_context": self.memory_context,
            "retrieved_context": context,
            "constraints": CONSTRAINTS,
            "output_format": {
                "rationale": "short string",
                "actions": [{
                    "title": "string",
                    "tool": "string",
                    "command": "string or null",
                    "target": "string or null",
                    "description": "string",
                    "completion_criterion": "string",
                    "rationale": "string",
                }],
            },
            "max_actions": self.max_actions,
        })
    }

    /// Chat messages (`system`, `user`) for an OpenAI-style API.
    pub fn messages(&self) -> Vec<Value> {
        vec![
            json!({ "role": "system", "content": SYSTEM_PROMPT }),
            json!({ "role": "user", "content": self.payload().to_string() }),
        ]
    }
}
