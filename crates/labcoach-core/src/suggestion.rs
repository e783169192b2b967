//! The suggestion returned to the operator and the retrieval context behind it.

use serde::{Deserialize, Serialize};

use crate::actions::ProposedAction;
use crate::phase::Phase;

/// One ranked knowledge chunk returned by a query. Never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// Source document identifier.
    pub source: String,
    /// Chunk id within the index.
    pub chunk_id: String,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// Chunk text.
    pub text: String,
}

/// Policy-safe next-action suggestion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Displayed phase.
    pub phase: Phase,
    /// Bounded textual summary of the episode.
    pub episode_summary: String,
    /// Evidence gaps for the displayed phase.
    pub missing_artifacts: Vec<String>,
    /// Sanitized actions, in priority order.
    pub actions: Vec<ProposedAction>,
    /// Why these actions were proposed.
    pub rationale: String,
}

impl Suggestion {
    /// Actions the guard allowed.
    pub fn allowed_actions(&self) -> impl Iterator<Item = &ProposedAction> {
        self.actions.iter().filter(|a| a.is_allowed())
    }
}
