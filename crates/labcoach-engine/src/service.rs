//! Session-level facade: store plus engine.

use std::sync::Arc;

use labcoach_core::{Event, Policy};
use labcoach_embeddings::build_embedder;
use labcoach_knowledge::{BuildReport, IndexConfig, KnowledgeIndex};
use labcoach_llm::{HealthSnapshot, build_backend};
use labcoach_settings::{LabcoachSettings, PolicySettings};
use labcoach_store::{SessionRecord, SessionStartRequest, SessionStore};
use serde::Serialize;
use tracing::info;

use crate::engine::{EngineConfig, PipelineInput, SuggestionEngine};
use crate::errors::Result;
use crate::request::{SuggestRequest, SuggestionOutcome};

/// Suggestion for one session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuggestResponse {
    /// Session the suggestion is for.
    pub session_id: String,
    /// Pipeline result.
    #[serde(flatten)]
    pub outcome: SuggestionOutcome,
    /// Generation backend health after this call; absent without a backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_health: Option<HealthSnapshot>,
}

/// Coaching service over a session store and a suggestion engine.
pub struct CoachService {
    store: SessionStore,
    engine: SuggestionEngine,
    policy: PolicySettings,
}

impl CoachService {
    /// Service from parts.
    pub fn new(store: SessionStore, engine: SuggestionEngine, policy: PolicySettings) -> Self {
        Self {
            store,
            engine,
            policy,
        }
    }

    /// Wire store, embedder, index and generation backend from settings.
    pub fn from_settings(settings: &LabcoachSettings) -> Result<Self> {
        let store = SessionStore::open(&settings.session.store_dir, settings.session.max_events)?;
        let embedder = Arc::new(build_embedder(&settings.embedding));
        let index = Arc::new(KnowledgeIndex::open(
            IndexConfig::from_settings(&settings.knowledge),
            embedder,
        ));
        let backend = build_backend(&settings.llm);
        let engine = SuggestionEngine::new(index, backend, EngineConfig::from_settings(settings));

        info!(
            store = %store.dir().display(),
            chunks = engine.index().len(),
            generator = if engine.has_backend() { settings.llm.provider.as_str() } else { "heuristic" },
            "coach service ready"
        );
        Ok(Self::new(store, engine, settings.policy.clone()))
    }

    /// Session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Suggestion engine.
    pub fn engine(&self) -> &SuggestionEngine {
        &self.engine
    }

    /// Policy applied to new sessions, with an empty scope.
    pub fn default_policy(&self) -> Policy {
        self.policy.to_policy(Vec::new())
    }

    /// Start a session under the default tool policy.
    pub fn start_session(&self, request: SessionStartRequest) -> Result<SessionRecord> {
        Ok(self.store.create_session(request, self.default_policy())?)
    }

    /// Append telemetry to a session.
    pub fn ingest_events(&self, session_id: &str, events: Vec<Event>) -> Result<SessionRecord> {
        Ok(self.store.append_events(session_id, events)?)
    }

    /// Record an operator note.
    pub fn add_note(&self, session_id: &str, message: &str) -> Result<SessionRecord> {
        Ok(self.store.append_note(session_id, message)?)
    }

    /// Extend a session's declared scope.
    pub fn extend_scope(&self, session_id: &str, entries: Vec<String>) -> Result<SessionRecord> {
        let (session, added) = self.store.extend_scope(session_id, entries)?;
        info!(session_id, added, "scope extended");
        Ok(session)
    }

    /// Suggest the next actions for a session.
    ///
    /// The learner message is recorded first. Afterwards the session keeps
    /// the phase to persist and the rationale.
    pub async fn suggest(&self, session_id: &str, request: &SuggestRequest) -> Result<SuggestResponse> {
        if let Some(message) = request
            .user_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
        {
            let _ = self.store.append_note(session_id, message)?;
        }

        let session = self.store.require_session(session_id)?;
        let episode = session.episode();
        let outcome = self
            .engine
            .suggest(
                PipelineInput {
                    objective: &session.objective,
                    episode: &episode,
                    policy: &session.policy,
                    persisted_phase: session.current_phase,
                },
                request,
            )
            .await;

        let phase = outcome.phase_to_persist;
        let reasoning = outcome.suggestion.rationale.clone();
        let _ = self.store.update(session_id, |s| {
            s.current_phase = phase;
            s.last_reasoning = Some(reasoning);
        })?;

        Ok(SuggestResponse {
            session_id: session.session_id,
            outcome,
            generation_health: self.engine.health(),
        })
    }

    /// Re-scan the knowledge source directory and rebuild the index.
    pub async fn rebuild_index(&self) -> Result<BuildReport> {
        Ok(self.engine.index().rebuild().await?)
    }
}

impl std::fmt::Debug for CoachService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachService")
            .field("store", &self.store)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
