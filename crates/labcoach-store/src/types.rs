//! Session records and requests.

use chrono::{DateTime, Utc};
use labcoach_core::{Episode, Event, Phase, Policy};
use serde::{Deserialize, Serialize};

/// Objective used when a session is started without one.
pub const DEFAULT_OBJECTIVE: &str = "Complete the lab objective safely within allowed scope.";

/// Policy id used when a session is started without one.
pub const DEFAULT_POLICY_ID: &str = "lab-default";

fn default_objective() -> String {
    DEFAULT_OBJECTIVE.to_string()
}

fn default_policy_id() -> String {
    DEFAULT_POLICY_ID.to_string()
}

/// Parameters for a new session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartRequest {
    /// Tenant (class, cohort) the session belongs to.
    pub tenant_id: String,
    /// Operator.
    pub user_id: String,
    /// Workstation agent reporting telemetry; prefixes the session id.
    pub agent_id: String,
    /// Lab objective.
    #[serde(default = "default_objective")]
    pub objective: String,
    /// Declared in-scope targets.
    #[serde(default)]
    pub target_scope: Vec<String>,
    /// Name of the policy profile applied.
    #[serde(default = "default_policy_id")]
    pub policy_id: String,
}

impl SessionStartRequest {
    /// Request with the default objective, no scope and the default policy id.
    pub fn new(
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            objective: default_objective(),
            target_scope: Vec::new(),
            policy_id: default_policy_id(),
        }
    }

    /// Builder: set the objective.
    #[must_use]
    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = objective.into();
        self
    }

    /// Builder: set the declared scope.
    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_scope = scope.into_iter().map(Into::into).collect();
        self
    }
}

/// One persisted lab session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// `{agent_id}-{10 hex}`.
    pub session_id: String,
    /// Tenant id.
    pub tenant_id: String,
    /// Operator id.
    pub user_id: String,
    /// Agent id.
    pub agent_id: String,
    /// Lab objective.
    pub objective: String,
    /// Policy profile name.
    pub policy_id: String,
    /// Tool and scope policy, fixed at creation except for scope extension.
    pub policy: Policy,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
    /// Persisted phase.
    #[serde(default)]
    pub current_phase: Phase,
    /// Event log, oldest first.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Operator notes.
    #[serde(default)]
    pub notes: Vec<String>,
    /// Rationale of the last suggestion.
    #[serde(default)]
    pub last_reasoning: Option<String>,
}

impl SessionRecord {
    /// Episode view over the session's events and notes.
    pub fn episode(&self) -> Episode {
        Episode {
            events: self.events.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Declared scope.
    pub fn target_scope(&self) -> &[String] {
        &self.policy.target_scope
    }

    /// Listing row for this session.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            tenant_id: self.tenant_id.clone(),
            user_id: self.user_id.clone(),
            agent_id: self.agent_id.clone(),
            current_phase: self.current_phase,
            updated_at: self.updated_at,
        }
    }
}

/// Listing row returned by [`SessionStore::list_sessions`](crate::SessionStore::list_sessions).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id.
    pub session_id: String,
    /// Tenant id.
    pub tenant_id: String,
    /// Operator id.
    pub user_id: String,
    /// Agent id.
    pub agent_id: String,
    /// Persisted phase.
    pub current_phase: Phase,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}
