//! Tolerant extraction of a suggestion from generator text.
//!
//! The text may be bare JSON or wrap it in a fenced block. Individual fields
//! are forgiving (blank values get defaults, `done_criteria` is accepted as
//! an alias), but the root must be an object with an `actions` array holding
//! at least one usable action.

use labcoach_core::{Phase, ProposedAction};
use serde_json::{Map, Value};

use crate::errors::GenerationFailure;

/// Title given to actions that arrive without one.
pub const DEFAULT_TITLE: &str = "Next step";

/// Rationale given to actions that arrive without one.
pub const DEFAULT_ACTION_RATIONALE: &str = "Follow lab methodology.";

/// Validated generator output, before policy sanitization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedSuggestion {
    /// Overall rationale; empty when the generator gave none.
    pub rationale: String,
    /// Proposed actions, at most `max_actions`.
    pub actions: Vec<ProposedAction>,
}

/// The JSON object inside `content`: the whole text, or the first fenced
/// block that holds an object.
pub fn extract_json(content: &str) -> &str {
    let stripped = content.trim();
    if stripped.starts_with('{') && stripped.ends_with('}') {
        return stripped;
    }
    if !stripped.contains("```") {
        return stripped;
    }
    for segment in stripped.split("```").map(str::trim).filter(|s| !s.is_empty()) {
        let candidate = segment
            .strip_prefix("json")
            .or_else(|| segment.strip_prefix("JSON"))
            .map_or(segment, str::trim);
        if candidate.starts_with('{') && candidate.ends_with('}') {
            return candidate;
        }
    }
    stripped
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn parse_action(obj: &Map<String, Value>, phase: Phase) -> Option<ProposedAction> {
    let command = text_field(obj, &["command"]);
    let title = text_field(obj, &["title"]);
    let description = text_field(obj, &["description"]);
    if command.is_none() && title.is_none() && description.is_none() {
        return None;
    }

    let tool = text_field(obj, &["tool"])
        .or_else(|| {
            command
                .as_deref()
                .and_then(|c| c.split_whitespace().next())
                .map(str::to_string)
        })
        .unwrap_or_default();

    Some(ProposedAction {
        title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        tool: tool.to_lowercase(),
        command,
        description: description.unwrap_or_default(),
        target: text_field(obj, &["target"]),
        completion_criterion: text_field(obj, &["completion_criterion", "done_criteria"])
            .unwrap_or_else(|| phase.done_criteria().to_string()),
        rationale: text_field(obj, &["rationale"])
            .unwrap_or_else(|| DEFAULT_ACTION_RATIONALE.to_string()),
        policy_status: None,
        block_reason: None,
    })
}

/// Parse generator text into a [`GeneratedSuggestion`].
///
/// Any verdict fields the generator supplies are discarded; only the policy
/// guard assigns them.
pub fn parse_generation_output(
    content: &str,
    phase: Phase,
    max_actions: usize,
) -> Result<GeneratedSuggestion, GenerationFailure> {
    let json = extract_json(content);
    let root: Value = serde_json::from_str(json).map_err(|e| GenerationFailure::NotJson(e.to_string()))?;
    let Value::Object(root) = root else {
        return Err(GenerationFailure::NotJson("root is not an object".into()));
    };

    let actions = match root.get("actions") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(GenerationFailure::InvalidShape("`actions` is not an array".into())),
        None => return Err(GenerationFailure::InvalidShape("missing `actions`".into())),
    };

    let actions: Vec<ProposedAction> = actions
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| parse_action(obj, phase))
        .take(max_actions.max(1))
        .collect();
    if actions.is_empty() {
        return Err(GenerationFailure::NoActions);
    }

    Ok(GeneratedSuggestion {
        rationale: text_field(&root, &["rationale", "reasoning"]).unwrap_or_default(),
        actions,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
