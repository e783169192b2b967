//! The allowlist/blocklist/scope triple governing surfaced actions.

use serde::{Deserialize, Serialize};

/// Policy attached to a session at creation.
///
/// Immutable for the pipeline. Scope may only grow through an explicit
/// session update ([`Policy::extend_scope`]).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Tool names that may be proposed (matched case-insensitively).
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Substring patterns (or `re:` regexes) that block an action outright.
    #[serde(default)]
    pub blocklist_patterns: Vec<String>,
    /// Host, IP, CIDR or `*.domain` entries that define the lab scope.
    #[serde(default)]
    pub target_scope: Vec<String>,
}

impl Policy {
    /// Create a policy from its three parts.
    pub fn new(
        allowed_tools: Vec<String>,
        blocklist_patterns: Vec<String>,
        target_scope: Vec<String>,
    ) -> Self {
        Self {
            allowed_tools,
            blocklist_patterns,
            target_scope,
        }
    }

    /// Builder: replace the target scope.
    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Add scope entries, skipping blanks and case-insensitive duplicates.
    ///
    /// Returns how many entries were added.
    pub fn extend_scope<I, S>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for entry in entries {
            let entry: String = entry.into();
            let entry = entry.trim();
            if entry.is_empty()
                || self
                    .target_scope
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(entry))
            {
                continue;
            }
            self.target_scope.push(entry.to_string());
            added += 1;
        }
        added
    }

    /// Scope entries that are plain literals (no CIDR, no wildcard).
    pub fn literal_targets(&self) -> impl Iterator<Item = &str> {
        self.target_scope
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && !s.contains('/') && !s.starts_with("*."))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
