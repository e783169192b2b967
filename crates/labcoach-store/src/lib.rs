//! # labcoach-store
//!
//! Session persistence for labcoach: one JSON file per session holding the
//! event log, notes, policy and persisted phase.

#![deny(unsafe_code)]

pub mod errors;
pub mod store;
pub mod types;

pub use errors::{Result, StoreError};
pub use store::{DEFAULT_MAX_EVENTS, SessionStore, is_valid_id};
pub use types::{
    DEFAULT_OBJECTIVE, DEFAULT_POLICY_ID, SessionRecord, SessionStartRequest, SessionSummary,
};
