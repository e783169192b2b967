//! # labcoach-episode
//!
//! Pure functions over an [`Episode`](labcoach_core::Episode):
//!
//! - [`evidence`]: one-pass evidence ledger and the ordered
//!   `Phase -> Predicate` table
//! - [`classifier`]: phase inference (last satisfied predicate wins, never
//!   below the persisted phase, overrides are display-only)
//! - [`summarizer`]: memory-mode digests and missing-artifact gaps
//!
//! Nothing here performs I/O or fails.

#![deny(unsafe_code)]

pub mod classifier;
pub mod evidence;
pub mod summarizer;

pub use classifier::{Classification, classify, classify_with_floor, infer_phase};
pub use evidence::{Artifact, Evidence, PHASE_PREDICATES};
pub use summarizer::{EpisodeDigest, missing_artifacts, summarize};
