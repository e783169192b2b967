//! # labcoach-engine
//!
//! The suggestion pipeline and the session-level service around it.
//!
//! [`SuggestionEngine`] runs classify → summarize → retrieve → generate →
//! sanitize and always yields a complete [`Suggestion`](labcoach_core::Suggestion):
//! generator failures, timeouts and malformed output fall back to the
//! [`heuristic`] templates. [`CoachService`] binds the engine to a
//! [`SessionStore`](labcoach_store::SessionStore).

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod heuristic;
pub mod request;
pub mod service;

pub use engine::{EngineConfig, PipelineInput, SuggestionEngine, build_retrieval_query};
pub use errors::{EngineError, Result};
pub use heuristic::{TARGET_PLACEHOLDER, heuristic_actions, heuristic_reasoning};
pub use request::{SuggestRequest, SuggestionOutcome, SuggestionSource};
pub use service::{CoachService, SuggestResponse};
