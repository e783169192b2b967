//! # labcoach-core
//!
//! Foundation types shared by every labcoach crate:
//!
//! - [`events`]: telemetry [`Event`]s and the [`Episode`] view over a session log
//! - [`phase`]: the ordered lab [`Phase`] progression plus memory/focus knobs
//! - [`policy`]: the allowlist/blocklist/scope [`Policy`] triple
//! - [`actions`]: [`ProposedAction`] and its [`PolicyStatus`]
//! - [`suggestion`]: the [`Suggestion`] contract and [`RetrievedContext`]
//! - [`scope`]: scope membership and target extraction
//! - [`logging`]: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod actions;
pub mod errors;
pub mod events;
pub mod logging;
pub mod phase;
pub mod policy;
pub mod scope;
pub mod suggestion;
pub mod text;

pub use actions::{PolicyStatus, ProposedAction};
pub use errors::{CoreError, Result};
pub use events::{Episode, Event, EventType};
pub use phase::{FocusHint, MemoryMode, Phase, PhaseOverride};
pub use policy::Policy;
pub use scope::Scope;
pub use suggestion::{RetrievedContext, Suggestion};
