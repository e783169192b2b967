//! Deterministic phase templates used when no generator output is usable.
//!
//! Every template names an allowlisted tool and only ever targets literal
//! scope entries (or the `<TARGET_IN_SCOPE>` placeholder when the scope has
//! none), so a default policy allows all of them. The recon inventory is
//! repeated for each literal entry; other templates use the first one.

use labcoach_core::{Phase, Policy, ProposedAction};

/// Placeholder used when the scope declares no literal target.
pub const TARGET_PLACEHOLDER: &str = "<TARGET_IN_SCOPE>";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Targeting {
    /// `{target}` is only text, the action carries no target.
    Untargeted,
    /// First literal scope entry.
    First,
    /// One action per literal scope entry.
    Each,
}

struct Template {
    tool: &'static str,
    title: &'static str,
    command: &'static str,
    description: &'static str,
    targeting: Targeting,
    rationale: &'static str,
    criterion: Option<&'static str>,
}

const RECON: &[Template] = &[
    Template {
        tool: "nmap",
        title: "Build in-scope service inventory",
        command: "nmap -sV -Pn {target}",
        description: "Fingerprint open services on each declared target.",
        targeting: Targeting::Each,
        rationale: "Inventory is required before deep enumeration.",
        criterion: None,
    },
    Template {
        tool: "echo",
        title: "Capture baseline notes",
        command: "echo \"{target}: <OPEN_SERVICES>\" >> notes/recon.md",
        description: "Write one baseline note per target with the services seen.",
        targeting: Targeting::Untargeted,
        rationale: "Documenting early findings improves later hypothesis quality.",
        criterion: Some("At least one note per target is added to session timeline."),
    },
];

const ENUMERATION: &[Template] = &[
    Template {
        tool: "gobuster",
        title: "Deepen service-level inspection",
        command: "gobuster dir -u http://{target} -w <WORDLIST_IN_LAB>",
        description: "Enumerate content behind the web service with a lab wordlist.",
        targeting: Targeting::First,
        rationale: "Service-specific enumeration reveals candidate weak points.",
        criterion: None,
    },
    Template {
        tool: "echo",
        title: "Record notable responses",
        command: "echo \"anomaly: <ENDPOINT> <STATUS> <EVIDENCE_REF>\" >> notes/enumeration.md",
        description: "Note unusual status codes, banners and error pages with evidence refs.",
        targeting: Targeting::Untargeted,
        rationale: "Response patterns support stronger hypotheses.",
        criterion: Some("Top anomalies and related evidence refs are written as notes."),
    },
];

const HYPOTHESIS: &[Template] = &[
    Template {
        tool: "echo",
        title: "Rank top attack hypotheses",
        command: "echo \"Hypothesis 1: <WEAKNESS> on <SERVICE>\" >> notes/hypotheses.md",
        description: "Write one to three hypotheses ordered by likelihood.",
        targeting: Targeting::Untargeted,
        rationale: "Prioritization avoids random tool usage.",
        criterion: None,
    },
    Template {
        tool: "echo",
        title: "Define validation plan per hypothesis",
        command: "echo \"Validate hypothesis 1 with: <SAFE_CHECK>\" >> notes/hypotheses.md",
        description: "Pair every hypothesis with one in-scope verification step.",
        targeting: Targeting::Untargeted,
        rationale: "Each hypothesis needs a measurable validation step.",
        criterion: Some("Every hypothesis has one in-scope verification method."),
    },
];

const ATTEMPT: &[Template] = &[
    Template {
        tool: "curl",
        title: "Run lab-approved verification for hypothesis #1",
        command: "curl -i http://{target}/<PATH_UNDER_TEST>",
        description: "Send the smallest request that confirms or refutes hypothesis 1.",
        targeting: Targeting::First,
        rationale: "Execute the smallest safe validation first.",
        criterion: None,
    },
    Template {
        tool: "echo",
        title: "Log result and branch decision",
        command: "echo \"Hypothesis 1: <PASS_OR_FAIL> <EVIDENCE_REF>\" >> notes/attempts.md",
        description: "Mark the result with a timestamp and decide the next branch.",
        targeting: Targeting::Untargeted,
        rationale: "Pass/fail evidence determines the next branch quickly.",
        criterion: Some("Result is marked pass/fail with timestamp and evidence ref."),
    },
];

const POST_CHECK: &[Template] = &[
    Template {
        tool: "whoami",
        title: "Validate impact boundaries in lab",
        command: "whoami",
        description: "Confirm the obtained context stays within the scenario.",
        targeting: Targeting::Untargeted,
        rationale: "Impact must be demonstrated and bounded within scenario scope.",
        criterion: None,
    },
    Template {
        tool: "echo",
        title: "Collect cleanup and reset notes",
        command: "echo \"Cleanup: <ARTIFACTS_LEFT> <RESET_STEPS>\" >> notes/post_check.md",
        description: "List artifacts left behind and how the lab is restored.",
        targeting: Targeting::Untargeted,
        rationale: "Lab reproducibility depends on clean post-check handoff.",
        criterion: Some("Containment/reset notes are captured for instructor review."),
    },
];

const REPORT: &[Template] = &[
    Template {
        tool: "cat",
        title: "Compile finding timeline",
        command: "cat notes/*.md",
        description: "Merge the phase notes into one ordered timeline.",
        targeting: Targeting::Untargeted,
        rationale: "A clear timeline is required for grading and replay.",
        criterion: None,
    },
    Template {
        tool: "echo",
        title: "Attach evidence references",
        command: "echo \"Finding 1 evidence: <EVIDENCE_REF>\" >> notes/report.md",
        description: "Link every finding to the command output or capture behind it.",
        targeting: Targeting::Untargeted,
        rationale: "Each finding must map to concrete evidence.",
        criterion: Some("Every finding includes at least one evidence reference."),
    },
];

fn templates(phase: Phase) -> &'static [Template] {
    match phase {
        Phase::Recon => RECON,
        Phase::Enumeration => ENUMERATION,
        Phase::Hypothesis => HYPOTHESIS,
        Phase::Attempt => ATTEMPT,
        Phase::PostCheck => POST_CHECK,
        Phase::Report => REPORT,
    }
}

/// Targets substituted into templates: the literal scope entries, or the
/// placeholder when there are none.
pub fn template_targets(policy: &Policy) -> Vec<String> {
    let targets: Vec<String> = policy.literal_targets().map(str::to_string).collect();
    if targets.is_empty() {
        vec![TARGET_PLACEHOLDER.to_string()]
    } else {
        targets
    }
}

impl Template {
    fn action(&self, phase: Phase, target: &str) -> ProposedAction {
        let action = ProposedAction::new(self.tool, self.title)
            .with_command(self.command.replace("{target}", target))
            .with_description(self.description)
            .with_rationale(self.rationale)
            .with_completion_criterion(self.criterion.unwrap_or_else(|| phase.done_criteria()));
        match self.targeting {
            Targeting::Untargeted => action,
            Targeting::First | Targeting::Each => action.with_target(target),
        }
    }
}

/// Template actions for `phase`, at most `max_actions`.
pub fn heuristic_actions(phase: Phase, policy: &Policy, max_actions: usize) -> Vec<ProposedAction> {
    let targets = template_targets(policy);
    templates(phase)
        .iter()
        .flat_map(|t| {
            let ts: &[String] = if t.targeting == Targeting::Each {
                &targets
            } else {
                &targets[..1]
            };
            ts.iter().map(move |target| t.action(phase, target))
        })
        .take(max_actions.max(1))
        .collect()
}

/// Rationale attached to heuristic suggestions.
pub fn heuristic_reasoning(phase: Phase, missing_artifacts: &[String]) -> String {
    let missing = if missing_artifacts.is_empty() {
        "none".to_string()
    } else {
        missing_artifacts.join(", ")
    };
    format!(
        "Phase inferred as {phase}. Missing artifacts: {missing}. \
         Actions focus on collecting evidence and moving safely to the next stage."
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
