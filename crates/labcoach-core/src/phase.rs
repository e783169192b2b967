//! Lab phases and the per-request knobs that steer the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// One stage of the fixed recon → report lab progression.
///
/// Variant order is the progression order, so `Ord` compares phases by how
/// far along the lab they are.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Build the in-scope service inventory.
    #[default]
    Recon,
    /// Dig into discovered services.
    Enumeration,
    /// Write down ranked weak-point hypotheses.
    Hypothesis,
    /// Validate a hypothesis with a lab-approved tool.
    Attempt,
    /// Verify and bound the impact of a successful attempt.
    PostCheck,
    /// Compile the timeline and evidence.
    Report,
}

impl Phase {
    /// All phases in progression order.
    pub const ALL: [Phase; 6] = [
        Phase::Recon,
        Phase::Enumeration,
        Phase::Hypothesis,
        Phase::Attempt,
        Phase::PostCheck,
        Phase::Report,
    ];

    /// Wire name of the phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recon => "recon",
            Self::Enumeration => "enumeration",
            Self::Hypothesis => "hypothesis",
            Self::Attempt => "attempt",
            Self::PostCheck => "post_check",
            Self::Report => "report",
        }
    }

    /// Completion criterion a learner should satisfy before leaving the phase.
    pub fn done_criteria(self) -> &'static str {
        match self {
            Self::Recon => "Service inventory exists for each in-scope target with evidence.",
            Self::Enumeration => "At least one deep finding per discovered service is documented.",
            Self::Hypothesis => "1-3 ranked hypotheses are written with validation plans.",
            Self::Attempt => "Each hypothesis has a pass/fail validation result and timestamp.",
            Self::PostCheck => "Impact verification and containment notes are captured.",
            Self::Report => "Timeline, findings, and evidence references are complete.",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "recon" => Ok(Self::Recon),
            "enumeration" => Ok(Self::Enumeration),
            "hypothesis" => Ok(Self::Hypothesis),
            "attempt" => Ok(Self::Attempt),
            "post_check" | "postcheck" => Ok(Self::PostCheck),
            "report" => Ok(Self::Report),
            _ => Err(CoreError::UnknownPhase(s.to_string())),
        }
    }
}

/// Caller-supplied phase that replaces the inferred one for display.
///
/// `persist` asks the caller's session store to also record it; the pipeline
/// itself never writes anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOverride {
    /// Phase to display.
    pub phase: Phase,
    /// Whether the session should adopt the override.
    #[serde(default)]
    pub persist: bool,
}

impl PhaseOverride {
    /// Display-only override.
    pub fn transient(phase: Phase) -> Self {
        Self {
            phase,
            persist: false,
        }
    }

    /// Override that the session should keep.
    pub fn persistent(phase: Phase) -> Self {
        Self {
            phase,
            persist: true,
        }
    }
}

/// How much raw event detail is folded into downstream context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryMode {
    /// Digest only (counts per event type + last note).
    Summary,
    /// Digest plus the last `history_window` events verbatim.
    #[default]
    Window,
    /// Digest plus every event verbatim.
    Full,
}

impl FromStr for MemoryMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "window" => Ok(Self::Window),
            "full" => Ok(Self::Full),
            _ => Err(CoreError::UnknownMemoryMode(s.to_string())),
        }
    }
}

/// Retrieval focus used when building the knowledge query string.
///
/// `Auto` leaves the query as built; a phase appends that phase's keywords
/// regardless of the classification. Travels as `"auto"` or a phase name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FocusHint {
    /// Follow the classified phase.
    #[default]
    Auto,
    /// Bias toward a specific phase's material.
    Phase(Phase),
}

impl FromStr for FocusHint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") || s.trim().is_empty() {
            return Ok(Self::Auto);
        }
        s.parse::<Phase>().map(Self::Phase)
    }
}

impl fmt::Display for FocusHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Phase(phase) => phase.fmt(f),
        }
    }
}

impl TryFrom<String> for FocusHint {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FocusHint> for String {
    fn from(value: FocusHint) -> Self {
        value.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
