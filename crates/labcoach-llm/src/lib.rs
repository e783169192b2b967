//! # labcoach-llm
//!
//! Generation side of the suggestion pipeline.
//!
//! - [`GenerationBackend`]: structured prompt in, raw text out
//! - [`OpenAiCompatibleBackend`]: chat completions for `OpenAI` and Groq
//! - [`MockGenerationBackend`]: scripted replies for tests and demos
//! - [`parse_generation_output`]: validated [`GeneratedSuggestion`] or a
//!   [`GenerationFailure`] reason
//! - [`GenerationHealthTracker`]: rolling error rate, logged and reported

#![deny(unsafe_code)]

pub mod backend;
pub mod errors;
pub mod health;
pub mod mock;
pub mod openai;
pub mod parse;
pub mod prompt;

pub use backend::{GenerationBackend, build_backend};
pub use errors::{GenerationError, GenerationFailure, Result};
pub use health::{GenerationHealthTracker, HealthSnapshot};
pub use mock::{MockGenerationBackend, MockResponse};
pub use openai::{OpenAiCompatibleBackend, OpenAiConfig};
pub use parse::{GeneratedSuggestion, extract_json, parse_generation_output};
pub use prompt::GenerationPrompt;
