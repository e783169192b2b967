//! The suggestion pipeline.
//!
//! classify → summarize → retrieve → generate (backend or templates) →
//! sanitize. Only generation and retrieval suspend, both bounded; nothing
//! here returns an error.

use std::sync::Arc;
use std::time::Duration;

use labcoach_core::text::truncate_str;
use labcoach_core::{Episode, Phase, Policy, ProposedAction, Suggestion};
use labcoach_episode::{classify_with_floor, summarize};
use labcoach_guardrails::PolicyGuard;
use labcoach_knowledge::KnowledgeIndex;
use labcoach_llm::{
    GeneratedSuggestion, GenerationBackend, GenerationHealthTracker, GenerationPrompt,
    HealthSnapshot, parse_generation_output,
};
use labcoach_settings::LabcoachSettings;
use tracing::{debug, info, warn};

use crate::heuristic::{heuristic_actions, heuristic_reasoning};
use crate::request::{SuggestRequest, SuggestionOutcome, SuggestionSource};

/// Longest episode summary folded into the retrieval query.
const MAX_QUERY_SUMMARY_CHARS: usize = 2_000;

/// Notes carried into the generator's memory context.
const MEMORY_NOTES: usize = 5;

/// Pipeline tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Retrieved chunks per suggestion.
    pub top_k: usize,
    /// Upper bound on proposed actions.
    pub max_actions: usize,
    /// Budget for one generation call.
    pub generation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            max_actions: 4,
            generation_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Config from loaded settings.
    pub fn from_settings(settings: &LabcoachSettings) -> Self {
        Self {
            top_k: settings.knowledge.top_k,
            max_actions: settings.llm.max_actions.max(1),
            generation_timeout: Duration::from_millis(settings.llm.timeout_ms.max(1)),
        }
    }
}

/// Session state one pipeline run reads.
#[derive(Clone, Copy, Debug)]
pub struct PipelineInput<'a> {
    /// Lab objective.
    pub objective: &'a str,
    /// Events and notes.
    pub episode: &'a Episode,
    /// Tool and scope policy.
    pub policy: &'a Policy,
    /// Phase currently persisted for the session.
    pub persisted_phase: Phase,
}

/// Retrieval query text: objective, phase, latest note and summary.
pub fn build_retrieval_query(
    objective: &str,
    phase: Phase,
    latest_note: &str,
    episode_summary: &str,
) -> String {
    format!(
        "objective: {objective}\nphase: {phase}\nlatest_note: {latest_note}\nepisode_summary: {}",
        truncate_str(episode_summary, MAX_QUERY_SUMMARY_CHARS)
    )
}

fn memory_context(episode: &Episode) -> String {
    let start = episode.notes.len().saturating_sub(MEMORY_NOTES);
    episode.notes[start..].join("\n")
}

/// Orchestrates classification, retrieval, generation and sanitization.
pub struct SuggestionEngine {
    index: Arc<KnowledgeIndex>,
    backend: Option<Arc<dyn GenerationBackend>>,
    health: GenerationHealthTracker,
    config: EngineConfig,
}

impl SuggestionEngine {
    /// Engine over a shared index and an optional generation backend.
    pub fn new(
        index: Arc<KnowledgeIndex>,
        backend: Option<Arc<dyn GenerationBackend>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            index,
            backend,
            health: GenerationHealthTracker::new(),
            config,
        }
    }

    /// Knowledge index the engine queries.
    pub fn index(&self) -> &Arc<KnowledgeIndex> {
        &self.index
    }

    /// Pipeline tuning.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Health of the generation backend, `None` without one.
    pub fn health(&self) -> Option<HealthSnapshot> {
        self.backend.as_ref().map(|_| self.health.snapshot())
    }

    /// Whether a generation backend is configured.
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Run the pipeline once.
    pub async fn suggest(&self, input: PipelineInput<'_>, request: &SuggestRequest) -> SuggestionOutcome {
        let scope = &input.policy.target_scope;

        let classification = classify_with_floor(
            input.episode,
            scope,
            input.persisted_phase,
            request.phase_override,
        );
        let phase = classification.phase;

        let digest = summarize(
            input.episode,
            scope,
            phase,
            request.memory_mode,
            request.effective_history_window(),
        );

        let latest_note = input.episode.latest_note().unwrap_or_default();
        let query = build_retrieval_query(input.objective, phase, latest_note, &digest.summary);
        let retrieved = self
            .index
            .query(&query, self.config.top_k, request.focus)
            .await;
        debug!(phase = %phase, hits = retrieved.len(), focus = %request.focus, "retrieved context");

        let prompt = GenerationPrompt {
            objective: input.objective.to_string(),
            phase,
            done_criteria: phase.done_criteria().to_string(),
            episode_summary: digest.summary.clone(),
            missing_artifacts: digest.missing_artifacts.clone(),
            target_scope: scope.clone(),
            allowed_tools: input.policy.allowed_tools.clone(),
            user_message: latest_note.to_string(),
            memory_context: memory_context(input.episode),
            retrieved_context: retrieved.clone(),
            max_actions: self.config.max_actions,
        };

        let (source, rationale, actions) = match self.generate(&prompt).await {
            Some(generated) => {
                let rationale = if generated.rationale.is_empty() {
                    heuristic_reasoning(phase, &digest.missing_artifacts)
                } else {
                    generated.rationale
                };
                (SuggestionSource::Llm, rationale, generated.actions)
            }
            None => (
                SuggestionSource::Heuristic,
                heuristic_reasoning(phase, &digest.missing_artifacts),
                heuristic_actions(phase, input.policy, self.config.max_actions),
            ),
        };

        let actions = sanitize(actions, input.policy);
        info!(
            phase = %phase,
            source = ?source,
            actions = actions.len(),
            allowed = actions.iter().filter(|a| a.is_allowed()).count(),
            "suggestion ready"
        );

        SuggestionOutcome {
            suggestion: Suggestion {
                phase,
                episode_summary: digest.summary,
                missing_artifacts: digest.missing_artifacts,
                actions,
                rationale,
            },
            phase_confidence: classification.confidence,
            retrieved_context: retrieved,
            source,
            phase_to_persist: classification.phase_to_persist(request.phase_override),
        }
    }

    /// Validated generator output, or `None` when the templates should be used.
    async fn generate(&self, prompt: &GenerationPrompt) -> Option<GeneratedSuggestion> {
        let backend = self.backend.as_ref()?;
        let name = backend.name();

        let text = match tokio::time::timeout(self.config.generation_timeout, backend.generate(prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                self.health.record_failure(name);
                warn!(backend = name, category = e.category(), error = %e, "generation failed, using heuristic suggestions");
                return None;
            }
            Err(_) => {
                self.health.record_failure(name);
                warn!(
                    backend = name,
                    timeout_ms = u64::try_from(self.config.generation_timeout.as_millis()).unwrap_or(u64::MAX),
                    "generation timed out, using heuristic suggestions"
                );
                return None;
            }
        };

        match parse_generation_output(&text, prompt.phase, self.config.max_actions) {
            Ok(generated) => {
                self.health.record_success();
                Some(generated)
            }
            Err(failure) => {
                self.health.record_failure(name);
                warn!(backend = name, reason = %failure, "generation output rejected, using heuristic suggestions");
                None
            }
        }
    }
}

fn sanitize(actions: Vec<ProposedAction>, policy: &Policy) -> Vec<ProposedAction> {
    PolicyGuard::new(policy).sanitize(actions)
}

impl std::fmt::Debug for SuggestionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuggestionEngine")
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
