//! Phase inference over the evidence predicate table.

use labcoach_core::{Episode, Phase, PhaseOverride, Scope};
use serde::Serialize;
use tracing::debug;

use crate::evidence::{Evidence, PHASE_PREDICATES};

/// Confidence reported for an episode with no events.
pub const EMPTY_EPISODE_CONFIDENCE: f32 = 0.4;

const MAX_CONFIDENCE: f32 = 0.95;

/// Result of one classification call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Classification {
    /// Phase to display (the override when present).
    pub phase: Phase,
    /// Phase supported by evidence, never below the persisted floor.
    pub inferred: Phase,
    /// How strongly the evidence supports `inferred`, in [0, 1].
    pub confidence: f32,
    /// Whether `phase` came from an explicit override.
    pub overridden: bool,
}

impl Classification {
    /// Phase the caller's session should persist afterwards.
    ///
    /// A persistent override wins; otherwise the inferred phase, which never
    /// sits below the floor it was computed with.
    pub fn phase_to_persist(&self, explicit_override: Option<PhaseOverride>) -> Phase {
        match explicit_override {
            Some(o) if o.persist => o.phase,
            _ => self.inferred,
        }
    }
}

// Side notes alone never advance an episode.
fn evidence_phase(episode: &Episode, evidence: &Evidence) -> Phase {
    if episode.is_empty() {
        return Phase::Recon;
    }
    infer_phase(evidence)
}

/// Last phase whose predicate holds, or `recon` when none do.
pub fn infer_phase(evidence: &Evidence) -> Phase {
    PHASE_PREDICATES
        .iter()
        .filter(|(_, predicate)| predicate(evidence))
        .map(|(phase, _)| *phase)
        .last()
        .unwrap_or(Phase::Recon)
}

fn confidence(episode: &Episode, evidence: &Evidence) -> f32 {
    if episode.is_empty() {
        return EMPTY_EPISODE_CONFIDENCE;
    }
    let satisfied = PHASE_PREDICATES
        .iter()
        .filter(|(_, predicate)| predicate(evidence))
        .count();
    #[allow(clippy::cast_precision_loss)]
    let raw = 0.45 + 0.1 * satisfied as f32;
    raw.min(MAX_CONFIDENCE)
}

/// Classify the episode's phase.
///
/// The explicit override, when present, is returned for display only.
pub fn classify(
    episode: &Episode,
    policy_scope: &[String],
    explicit_override: Option<PhaseOverride>,
) -> Phase {
    classify_with_floor(episode, policy_scope, Phase::Recon, explicit_override).phase
}

/// Classify with a persisted phase as floor, so inference never regresses it.
pub fn classify_with_floor(
    episode: &Episode,
    policy_scope: &[String],
    persisted: Phase,
    explicit_override: Option<PhaseOverride>,
) -> Classification {
    let scope = Scope::new(policy_scope);
    let evidence = Evidence::collect(episode, &scope);
    let by_evidence = evidence_phase(episode, &evidence);
    let inferred = by_evidence.max(persisted);
    let confidence = confidence(episode, &evidence);

    let (phase, overridden) = match explicit_override {
        Some(o) => (o.phase, true),
        None => (inferred, false),
    };

    debug!(
        events = episode.events.len(),
        by_evidence = %by_evidence,
        persisted = %persisted,
        displayed = %phase,
        confidence,
        "classified episode phase"
    );

    Classification {
        phase,
        inferred,
        confidence,
        overridden,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use labcoach_core::Event;

    fn scope() -> Vec<String> {
        vec!["10.10.10.25".into(), "web01.lab.local".into()]
    }

    #[test]
    fn empty_episode_is_recon() {
        let episode = Episode::default();
        assert_eq!(classify(&episode, &scope(), None), Phase::Recon);
        let c = classify_with_floor(&episode, &scope(), Phase::Recon, None);
        assert!((c.confidence - EMPTY_EPISODE_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn notes_without_events_stay_recon() {
        let mut episode = Episode::default();
        episode.notes.push("please draft the final report".into());
        episode.notes.push("Hypothesis: admin panel reuses creds".into());
        let c = classify_with_floor(&episode, &scope(), Phase::Recon, None);
        assert_eq!(c.phase, Phase::Recon);
        assert!((c.confidence - EMPTY_EPISODE_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn single_nmap_is_recon() {
        let episode = Episode::from_events(vec![
            Event::command("nmap -sV -Pn 10.10.10.25").with_field("exit_code", 0),
        ]);
        assert_eq!(classify(&episode, &scope(), None), Phase::Recon);
    }

    #[test]
    fn full_progression_reaches_post_check() {
        let episode = Episode::from_events(vec![
            Event::command("nmap -sV 10.10.10.25"),
            Event::command("gobuster dir -u http://web01.lab.local -w common.txt"),
            Event::note("Hypothesis: /admin uses default creds"),
            Event::http("POST", "http://web01.lab.local/admin/login", 302),
            Event::note("Validated: logged in as admin, proof saved"),
        ]);
        let c = classify_with_floor(&episode, &scope(), Phase::Recon, None);
        assert_eq!(c.phase, Phase::PostCheck);
        assert!(c.confidence <= 0.95);
        assert!(c.confidence > 0.5);
    }

    #[test]
    fn report_request_wins() {
        let mut episode = Episode::from_events(vec![Event::command("nmap 10.10.10.25")]);
        episode.notes.push("time to write the report".into());
        assert_eq!(classify(&episode, &scope(), None), Phase::Report);
    }

    #[test]
    fn override_is_display_only() {
        let episode = Episode::from_events(vec![Event::command("nmap 10.10.10.25")]);
        let ovr = PhaseOverride::transient(Phase::Report);
        let c = classify_with_floor(&episode, &scope(), Phase::Recon, Some(ovr));
        assert_eq!(c.phase, Phase::Report);
        assert_eq!(c.inferred, Phase::Recon);
        assert!(c.overridden);
        assert_eq!(c.phase_to_persist(Some(ovr)), Phase::Recon);
        assert_eq!(
            c.phase_to_persist(Some(PhaseOverride::persistent(Phase::Report))),
            Phase::Report
        );
    }

    #[test]
    fn override_may_go_backward() {
        let episode = Episode::from_events(vec![Event::command("nmap 10.10.10.25")]);
        let c = classify_with_floor(
            &episode,
            &scope(),
            Phase::Attempt,
            Some(PhaseOverride::persistent(Phase::Recon)),
        );
        assert_eq!(c.phase, Phase::Recon);
        assert_eq!(c.inferred, Phase::Attempt);
    }

    #[test]
    fn floor_prevents_silent_regression() {
        let episode = Episode::from_events(vec![Event::command("nmap 10.10.10.25")]);
        let c = classify_with_floor(&episode, &scope(), Phase::Hypothesis, None);
        assert_eq!(c.phase, Phase::Hypothesis);
    }

    #[test]
    fn out_of_scope_activity_stays_recon() {
        let episode = Episode::from_events(vec![Event::command("nmap 8.8.8.8")]);
        let c = classify_with_floor(&episode, &scope(), Phase::Recon, None);
        assert_eq!(c.phase, Phase::Recon);
        assert!((c.confidence - 0.45).abs() < 1e-6);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn empty_episode_always_recon(
                scope in proptest::collection::vec("[a-z0-9.]{1,20}", 0..5),
                notes in proptest::collection::vec(
                    prop_oneof![
                        "[a-zA-Z :]{0,40}",
                        Just("please draft the final report".to_string()),
                        Just("Hypothesis: weak creds".to_string()),
                        Just("validated, evidence saved".to_string()),
                    ],
                    0..6,
                ),
            ) {
                let episode = Episode { notes, ..Episode::default() };
                prop_assert_eq!(classify(&episode, &scope, None), Phase::Recon);
            }

            #[test]
            fn inferred_never_below_floor(idx in 0usize..6, cmd in "[a-z ]{0,30}") {
                let floor = Phase::ALL[idx];
                let episode = Episode::from_events(vec![Event::command(cmd)]);
                let c = classify_with_floor(&episode, &[], floor, None);
                prop_assert!(c.inferred >= floor);
            }
        }
    }
}
