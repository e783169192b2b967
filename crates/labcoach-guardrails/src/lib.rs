//! # labcoach-guardrails
//!
//! Policy enforcement for proposed actions.
//!
//! [`PolicyGuard`] compiles a session [`labcoach_core::Policy`] once and
//! attaches a [`labcoach_core::PolicyStatus`] to every action: blocklist
//! first, then the tool allowlist, then target scope. Sanitizing is pure,
//! total and idempotent.

#![deny(unsafe_code)]

pub mod errors;
pub mod guard;
pub mod pattern;

pub use errors::{GuardrailError, Result};
pub use guard::{
    OUT_OF_SCOPE_REASON, PolicyGuard, Verdict, command_program, command_programs, sanitize,
};
pub use pattern::BlockPattern;
