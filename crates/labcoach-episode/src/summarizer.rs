//! Bounded textual digests of an episode plus missing-artifact detection.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use labcoach_core::text::truncate_str;
use labcoach_core::{Episode, EventType, MemoryMode, Phase, Scope};
use serde::Serialize;

use crate::evidence::Evidence;

/// Longest rendering of a single raw event inside a summary.
const MAX_EVENT_LINE_CHARS: usize = 240;

/// Longest rendering of the latest note.
const MAX_NOTE_CHARS: usize = 400;

const TOP_TOOLS: usize = 5;

/// Summary text and evidence gaps for one phase.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EpisodeDigest {
    /// Condensed digest, optionally followed by raw event lines.
    pub summary: String,
    /// Human-readable gaps for the requested phase.
    pub missing_artifacts: Vec<String>,
}

fn ranked(counts: BTreeMap<String, usize>, limit: usize) -> String {
    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    // count desc, then name asc (BTreeMap order survives the stable sort)
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    if pairs.is_empty() {
        return "none".to_string();
    }
    pairs
        .into_iter()
        .take(limit)
        .map(|(k, n)| format!("{k}({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn digest(episode: &Episode) -> String {
    let mut per_type: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut tools: BTreeMap<String, usize> = BTreeMap::new();
    let mut statuses: BTreeMap<String, usize> = BTreeMap::new();

    for event in &episode.events {
        *per_type.entry(event.event_type.as_str()).or_default() += 1;
        match event.event_type {
            EventType::Command => {
                if let Some(tool) = event.tool() {
                    *tools.entry(tool).or_default() += 1;
                }
            }
            EventType::Http => {
                if let Some(status) = event.http_status() {
                    *statuses.entry(status.to_string()).or_default() += 1;
                }
            }
            EventType::Note | EventType::ScanSummary => {}
        }
    }

    let type_mix = if per_type.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = per_type.iter().map(|(t, n)| format!("{t} {n}")).collect();
        format!(" ({})", parts.join(", "))
    };
    let latest = episode
        .latest_note()
        .map_or_else(|| "none".to_string(), |n| truncate_str(n.trim(), MAX_NOTE_CHARS));

    let mut out = String::new();
    let _ = writeln!(out, "Events analyzed: {}{type_mix}.", episode.events.len());
    let _ = writeln!(out, "Top command tools: {}.", ranked(tools, TOP_TOOLS));
    let _ = writeln!(out, "HTTP status mix: {}.", ranked(statuses, usize::MAX));
    let _ = write!(out, "Latest note: {latest}");
    out
}

fn append_events(out: &mut String, header: &str, episode: &Episode, skip: usize) {
    let _ = write!(out, "\n{header}");
    for event in episode.events.iter().skip(skip) {
        let _ = write!(
            out,
            "\n- {}",
            truncate_str(&event.render_line(), MAX_EVENT_LINE_CHARS)
        );
    }
}

/// Summarize an episode for downstream context.
///
/// `memory_mode` selects the raw detail: `summary` is the digest only,
/// `window` adds the last `history_window` events, `full` adds every event.
/// Deterministic for identical input.
pub fn summarize(
    episode: &Episode,
    policy_scope: &[String],
    phase: Phase,
    memory_mode: MemoryMode,
    history_window: usize,
) -> EpisodeDigest {
    let mut summary = digest(episode);
    let total = episode.events.len();

    match memory_mode {
        MemoryMode::Summary => {}
        MemoryMode::Window if total > 0 && history_window > 0 => {
            let shown = history_window.min(total);
            append_events(
                &mut summary,
                &format!("Recent events (last {shown} of {total}):"),
                episode,
                total - shown,
            );
        }
        MemoryMode::Window => {}
        MemoryMode::Full if total > 0 => {
            append_events(
                &mut summary,
                &format!("Full history ({total} events):"),
                episode,
                0,
            );
        }
        MemoryMode::Full => {}
    }

    EpisodeDigest {
        summary,
        missing_artifacts: missing_artifacts(episode, policy_scope, phase),
    }
}

/// Gaps between what `phase` requires and what the episode contains.
pub fn missing_artifacts(episode: &Episode, policy_scope: &[String], phase: Phase) -> Vec<String> {
    let evidence = Evidence::collect(episode, &Scope::new(policy_scope));
    evidence
        .missing_for(phase)
        .into_iter()
        .map(|a| a.gap().to_string())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
