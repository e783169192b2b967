//! Query string construction and cosine ranking.

use labcoach_core::{FocusHint, Phase};
use labcoach_embeddings::cosine_similarity;

/// Retrieval keywords associated with each phase.
pub fn focus_terms(phase: Phase) -> &'static str {
    match phase {
        Phase::Recon => "recon checklist inventory scope hosts open ports services",
        Phase::Enumeration => "enumeration service versions directories shares banners",
        Phase::Hypothesis => "hypothesis weakness attack surface ranked validation plan",
        Phase::Attempt => "attempt validation proof safe test result",
        Phase::PostCheck => "post check impact verification containment cleanup",
        Phase::Report => "report reporting template timeline findings evidence references",
    }
}

/// Query text with the focus keywords appended when a focus is explicit.
pub fn compose_query(text: &str, focus: FocusHint) -> String {
    match focus {
        FocusHint::Auto => text.trim().to_string(),
        FocusHint::Phase(phase) => format!("{}\nfocus: {}", text.trim(), focus_terms(phase)),
    }
}

/// Indices and scores of the top `k` candidates, best first.
///
/// The sort is stable, so equal scores keep candidate order.
pub fn rank<'a>(
    query: &[f32],
    candidates: impl Iterator<Item = &'a [f32]>,
    k: usize,
) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .enumerate()
        .map(|(i, v)| (i, cosine_similarity(query, v)))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
}
