//! Evidence ledger and the ordered phase predicate table.
//!
//! The ledger is built in one forward pass over the episode. Each phase
//! predicate is then a pure function of the ledger, so classification and
//! missing-artifact detection share exactly the same evidence rules.

use labcoach_core::scope::{Scope, extract_targets};
use labcoach_core::{Episode, Event, EventType, Phase};
use serde::Serialize;

/// Tools that only enumerate services on an already-known host.
const ENUMERATION_TOOLS: &[&str] = &[
    "gobuster",
    "ffuf",
    "nikto",
    "enum4linux",
    "dirsearch",
    "feroxbuster",
    "whatweb",
    "wpscan",
    "smbclient",
];

const HYPOTHESIS_MARKERS: &[&str] = &[
    "hypothesis",
    "hypotheses",
    "possible weak point",
    "candidate issue",
    "suspect",
];

const VALIDATION_MARKERS: &[&str] = &[
    "validated",
    "verified",
    "verify impact",
    "impact",
    "proof",
    "confirmed",
];

const REPORT_MARKERS: &[&str] = &["report", "final notes", "write-up", "writeup"];

/// A piece of evidence a phase expects the operator to have produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    /// In-scope services inventoried.
    ServiceInventory,
    /// Service-level findings after recon.
    DeepServiceFindings,
    /// Hypotheses written down.
    RankedHypotheses,
    /// Attempts run against a hypothesis.
    AttemptResults,
    /// Impact of an attempt validated.
    ImpactValidation,
    /// Any notes at all.
    TimelineNotes,
    /// Notes pointing at evidence.
    EvidenceReferences,
}

impl Artifact {
    /// Stable key.
    pub fn key(self) -> &'static str {
        match self {
            Self::ServiceInventory => "service_inventory",
            Self::DeepServiceFindings => "deep_service_findings",
            Self::RankedHypotheses => "ranked_hypotheses",
            Self::AttemptResults => "attempt_results",
            Self::ImpactValidation => "impact_validation",
            Self::TimelineNotes => "timeline_notes",
            Self::EvidenceReferences => "evidence_references",
        }
    }

    /// Human-readable description of the artifact being absent.
    pub fn gap(self) -> &'static str {
        match self {
            Self::ServiceInventory => "no service inventory for an in-scope target",
            Self::DeepServiceFindings => "no service-level findings recorded after recon",
            Self::RankedHypotheses => "no ranked hypothesis recorded",
            Self::AttemptResults => "no validated hypothesis recorded",
            Self::ImpactValidation => "no impact validation note recorded",
            Self::TimelineNotes => "no timeline notes recorded",
            Self::EvidenceReferences => "no evidence references recorded",
        }
    }

    /// Artifacts a phase requires, in reporting order.
    pub fn required_for(phase: Phase) -> &'static [Artifact] {
        match phase {
            Phase::Recon => &[Self::ServiceInventory],
            Phase::Enumeration => &[Self::ServiceInventory, Self::DeepServiceFindings],
            Phase::Hypothesis => &[Self::RankedHypotheses],
            Phase::Attempt => &[Self::AttemptResults],
            Phase::PostCheck => &[Self::ImpactValidation],
            Phase::Report => &[Self::TimelineNotes, Self::EvidenceReferences],
        }
    }
}

/// First position at which each kind of phase evidence appeared.
///
/// Positions index into the episode's events; side notes are treated as
/// trailing notes positioned after every event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Evidence {
    /// Event touching an in-scope target.
    pub recon_at: Option<usize>,
    /// Service-level event at or after recon evidence.
    pub enumeration_at: Option<usize>,
    /// Note carrying a hypothesis marker.
    pub hypothesis_at: Option<usize>,
    /// Command or HTTP event after a hypothesis note.
    pub attempt_at: Option<usize>,
    /// Validation note after an attempt.
    pub post_check_at: Option<usize>,
    /// Explicit report request.
    pub report_at: Option<usize>,
    /// Number of notes seen.
    pub note_count: usize,
    /// Whether any note references evidence.
    pub evidence_referenced: bool,
}

/// Whole-word (or whole-phrase) match, so `reported` does not mention `report`.
fn mentions(text: &str, marker: &str) -> bool {
    text.match_indices(marker).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let after = text[i + marker.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| mentions(text, m))
}

fn touches_scope(event: &Event, scope: &Scope) -> bool {
    let declared = ["target", "host", "url"]
        .iter()
        .filter_map(|k| event.str_field(k))
        .map(ToString::to_string);
    let mut targets = declared.chain(extract_targets(&event.search_text()));
    if scope.is_empty() {
        targets.next().is_some()
    } else {
        targets.any(|t| scope.contains(&t))
    }
}

fn is_service_level(event: &Event) -> bool {
    match event.event_type {
        EventType::Http => true,
        EventType::Command => event
            .tool()
            .is_some_and(|tool| ENUMERATION_TOOLS.contains(&tool.as_str())),
        EventType::ScanSummary => event.has_field("services") || event.has_field("findings"),
        EventType::Note => false,
    }
}

impl Evidence {
    /// Build the ledger for an episode in one forward pass.
    pub fn collect(episode: &Episode, scope: &Scope) -> Self {
        let mut ev = Self::default();

        for (idx, event) in episode.events.iter().enumerate() {
            if event.event_type == EventType::Note {
                ev.note_count += 1;
                ev.observe_note_event(idx, event);
                continue;
            }
            if ev.recon_at.is_none() && touches_scope(event, scope) {
                ev.recon_at = Some(idx);
            }
            if ev.enumeration_at.is_none() && ev.recon_at.is_some() && is_service_level(event) {
                ev.enumeration_at = Some(idx);
            }
            if ev.attempt_at.is_none()
                && event.event_type != EventType::ScanSummary
                && ev.hypothesis_at.is_some_and(|h| h < idx)
            {
                ev.attempt_at = Some(idx);
            }
        }

        let base = episode.events.len();
        for (offset, note) in episode.notes.iter().enumerate() {
            ev.note_count += 1;
            ev.observe_note_text(base + offset, &note.to_lowercase());
        }

        ev
    }

    fn observe_note_event(&mut self, idx: usize, event: &Event) {
        if event.has_field("evidence_ref") {
            self.evidence_referenced = true;
        }
        if self.hypothesis_at.is_none() && event.has_field("hypothesis") {
            self.hypothesis_at = Some(idx);
        }
        if self.post_check_at.is_none()
            && event.has_field("validation")
            && self.attempt_at.is_some_and(|a| a < idx)
        {
            self.post_check_at = Some(idx);
        }
        let text = event.note_text().unwrap_or_default().to_lowercase();
        self.observe_note_text(idx, &text);
    }

    fn observe_note_text(&mut self, idx: usize, text: &str) {
        if mentions(text, "evidence") {
            self.evidence_referenced = true;
        }
        if self.hypothesis_at.is_none() && contains_any(text, HYPOTHESIS_MARKERS) {
            self.hypothesis_at = Some(idx);
        }
        if self.post_check_at.is_none()
            && self.attempt_at.is_some_and(|a| a < idx)
            && contains_any(text, VALIDATION_MARKERS)
        {
            self.post_check_at = Some(idx);
        }
        if self.report_at.is_none() && contains_any(text, REPORT_MARKERS) {
            self.report_at = Some(idx);
        }
    }

    /// Whether the ledger holds an artifact.
    pub fn has(&self, artifact: Artifact) -> bool {
        match artifact {
            Artifact::ServiceInventory => self.recon_at.is_some(),
            Artifact::DeepServiceFindings => self.enumeration_at.is_some(),
            Artifact::RankedHypotheses => self.hypothesis_at.is_some(),
            Artifact::AttemptResults => self.attempt_at.is_some(),
            Artifact::ImpactValidation => self.post_check_at.is_some(),
            Artifact::TimelineNotes => self.note_count > 0,
            Artifact::EvidenceReferences => self.evidence_referenced,
        }
    }

    /// Artifacts the phase requires that the ledger lacks, in order.
    pub fn missing_for(&self, phase: Phase) -> Vec<Artifact> {
        Artifact::required_for(phase)
            .iter()
            .copied()
            .filter(|a| !self.has(*a))
            .collect()
    }
}

/// Evidence test for one phase.
pub type Predicate = fn(&Evidence) -> bool;

fn recon_satisfied(ev: &Evidence) -> bool {
    ev.recon_at.is_some()
}

fn enumeration_satisfied(ev: &Evidence) -> bool {
    ev.enumeration_at.is_some()
}

fn hypothesis_satisfied(ev: &Evidence) -> bool {
    ev.hypothesis_at.is_some()
}

fn attempt_satisfied(ev: &Evidence) -> bool {
    ev.attempt_at.is_some()
}

fn post_check_satisfied(ev: &Evidence) -> bool {
    ev.post_check_at.is_some()
}

fn report_satisfied(ev: &Evidence) -> bool {
    ev.report_at.is_some()
}

/// Phase predicates in forward order.
pub const PHASE_PREDICATES: [(Phase, Predicate); 6] = [
    (Phase::Recon, recon_satisfied),
    (Phase::Enumeration, enumeration_satisfied),
    (Phase::Hypothesis, hypothesis_satisfied),
    (Phase::Attempt, attempt_satisfied),
    (Phase::PostCheck, post_check_satisfied),
    (Phase::Report, report_satisfied),
];

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        Scope::new(&["10.10.10.25", "web01.lab.local"])
    }

    #[test]
    fn predicate_table_is_in_phase_order() {
        let phases: Vec<Phase> = PHASE_PREDICATES.iter().map(|(p, _)| *p).collect();
        assert_eq!(phases, Phase::ALL.to_vec());
    }

    #[test]
    fn recon_requires_in_scope_target() {
        let episode = Episode::from_events(vec![Event::command("nmap -sV 8.8.8.8")]);
        assert_eq!(Evidence::collect(&episode, &scope()).recon_at, None);

        let episode = Episode::from_events(vec![Event::command("nmap -sV -Pn 10.10.10.25")]);
        assert_eq!(Evidence::collect(&episode, &scope()).recon_at, Some(0));
    }

    #[test]
    fn empty_scope_accepts_any_named_host() {
        let episode = Episode::from_events(vec![Event::command("nmap 192.168.56.10")]);
        let ev = Evidence::collect(&episode, &Scope::default());
        assert_eq!(ev.recon_at, Some(0));

        let episode = Episode::from_events(vec![Event::command("ls -la")]);
        assert_eq!(Evidence::collect(&episode, &Scope::default()).recon_at, None);
    }

    #[test]
    fn enumeration_needs_prior_recon() {
        let episode = Episode::from_events(vec![
            Event::command("gobuster dir -u http://web01.lab.local -w common.txt"),
        ]);
        let ev = Evidence::collect(&episode, &scope());
        assert_eq!(ev.recon_at, Some(0));
        assert_eq!(ev.enumeration_at, Some(0));

        let episode = Episode::from_events(vec![Event::http("GET", "http://8.8.8.8/", 200)]);
        let ev = Evidence::collect(&episode, &scope());
        assert_eq!(ev.enumeration_at, None);
    }

    #[test]
    fn attempt_requires_hypothesis_first() {
        let episode = Episode::from_events(vec![
            Event::command("sqlmap -u http://web01.lab.local/item?id=1"),
            Event::note("Hypothesis: id parameter is injectable"),
        ]);
        let ev = Evidence::collect(&episode, &scope());
        assert_eq!(ev.hypothesis_at, Some(1));
        assert_eq!(ev.attempt_at, None);

        let mut events = episode.events.clone();
        events.push(Event::command("sqlmap -u http://web01.lab.local/item?id=1 --batch"));
        let ev = Evidence::collect(&Episode::from_events(events), &scope());
        assert_eq!(ev.attempt_at, Some(2));
    }

    #[test]
    fn hypothesis_payload_key_counts() {
        let event = Event::note("weak login form").with_field("hypothesis", true);
        let ev = Evidence::collect(&Episode::from_events(vec![event]), &scope());
        assert_eq!(ev.hypothesis_at, Some(0));
    }

    #[test]
    fn validation_note_must_follow_attempt() {
        let episode = Episode::from_events(vec![
            Event::note("impact looks high"),
            Event::note("hypothesis: weak creds"),
            Event::command("hydra -l admin 10.10.10.25 ssh"),
            Event::note("Confirmed shell as www-data, proof captured"),
        ]);
        let ev = Evidence::collect(&episode, &scope());
        assert_eq!(ev.post_check_at, Some(3));
    }

    #[test]
    fn side_notes_count_as_trailing_notes() {
        let mut episode = Episode::from_events(vec![Event::command("nmap 10.10.10.25")]);
        episode.notes.push("please draft the final report".into());
        let ev = Evidence::collect(&episode, &scope());
        assert_eq!(ev.report_at, Some(1));
        assert_eq!(ev.note_count, 1);
    }

    #[test]
    fn missing_artifacts_follow_required_list() {
        let episode = Episode::from_events(vec![Event::command("nmap -sV 10.10.10.25")]);
        let ev = Evidence::collect(&episode, &scope());
        assert!(ev.missing_for(Phase::Recon).is_empty());
        assert_eq!(
            ev.missing_for(Phase::Enumeration),
            vec![Artifact::DeepServiceFindings]
        );
        assert_eq!(
            ev.missing_for(Phase::Report),
            vec![Artifact::TimelineNotes, Artifact::EvidenceReferences]
        );
    }

    #[test]
    fn markers_match_whole_words() {
        assert!(mentions("draft the report now", "report"));
        assert!(!mentions("nikto reported old apache", "report"));
        assert!(mentions("possible weak point: login", "possible weak point"));
        assert!(!mentions("", "report"));
    }

    #[test]
    fn evidence_ref_field_marks_reference() {
        let note = Event::note("screenshot saved").with_field("evidence_ref", "shots/01.png");
        let ev = Evidence::collect(&Episode::from_events(vec![note]), &scope());
        assert!(ev.has(Artifact::EvidenceReferences));
        assert!(ev.has(Artifact::TimelineNotes));
    }
}
