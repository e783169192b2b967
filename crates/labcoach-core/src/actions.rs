//! Proposed next actions and their policy verdicts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict attached to an action by the policy guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Safe to surface as-is.
    Allowed,
    /// Tool not allowlisted or a blocklist pattern matched.
    Blocked,
    /// Target outside the declared scope.
    OutOfScope,
}

impl PolicyStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
            Self::OutOfScope => "out_of_scope",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One suggested next step.
///
/// Generators leave `policy_status` empty; the guard fills it. A non-allowed
/// action has `command` and `target` cleared and carries a `block_reason`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposedAction {
    /// Short headline.
    pub title: String,
    /// Tool the action relies on (empty for advisory steps).
    pub tool: String,
    /// Runnable command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Human description of what to do.
    pub description: String,
    /// Host, IP or URL the action touches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// When the step counts as done.
    pub completion_criterion: String,
    /// Why the step is worth doing now.
    pub rationale: String,
    /// Guard verdict.
    pub policy_status: Option<PolicyStatus>,
    /// Reason for a non-allowed verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl ProposedAction {
    /// Action using `tool`, titled `title`.
    pub fn new(tool: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tool: tool.into(),
            ..Self::default()
        }
    }

    /// Builder: set the command line.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Builder: set the target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Builder: set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the completion criterion.
    #[must_use]
    pub fn with_completion_criterion(mut self, criterion: impl Into<String>) -> Self {
        self.completion_criterion = criterion.into();
        self
    }

    /// Builder: set the rationale.
    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Whether the guard allowed the action.
    pub fn is_allowed(&self) -> bool {
        self.policy_status == Some(PolicyStatus::Allowed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_sets_fields() {
        let action = ProposedAction::new("nmap", "Inventory services")
            .with_command("nmap -sV 10.10.10.25")
            .with_target("10.10.10.25")
            .with_completion_criterion("ports listed");
        assert_eq!(action.tool, "nmap");
        assert_eq!(action.target.as_deref(), Some("10.10.10.25"));
        assert!(!action.is_allowed());
    }

    #[test]
    fn serializes_status_snake_case() {
        let mut action = ProposedAction::new("nmap", "x");
        action.policy_status = Some(PolicyStatus::OutOfScope);
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["policy_status"], json!("out_of_scope"));
        assert!(value.get("command").is_none());
    }

    #[test]
    fn deserializes_sparse_objects() {
        let action: ProposedAction = serde_json::from_value(json!({"tool": "ffuf"})).unwrap();
        assert_eq!(action.tool, "ffuf");
        assert!(action.policy_status.is_none());
    }
}
