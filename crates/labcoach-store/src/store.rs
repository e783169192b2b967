//! One pretty-printed JSON file per session under a store directory.
//!
//! Every read-modify-write holds the store lock, so concurrent appends to the
//! same session never lose events. Files are replaced atomically.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use labcoach_core::{Event, Phase, Policy};
use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::types::{SessionRecord, SessionStartRequest, SessionSummary};

/// Default cap on events kept per session.
pub const DEFAULT_MAX_EVENTS: usize = 600;

const SESSION_SUFFIX_LEN: usize = 10;

/// Whether `id` can name a session file inside the store directory.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn new_session_id(agent_id: &str) -> String {
    let hex = Uuid::now_v7().simple().to_string();
    // v7 ids lead with the timestamp; take the random tail.
    format!("{agent_id}-{}", &hex[hex.len() - SESSION_SUFFIX_LEN..])
}

/// JSON-file session store.
pub struct SessionStore {
    dir: PathBuf,
    max_events: usize,
    lock: Mutex<()>,
}

impl SessionStore {
    /// Store rooted at `dir`, created if missing.
    pub fn open(dir: impl Into<PathBuf>, max_events: usize) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            max_events: max_events.max(1),
            lock: Mutex::new(()),
        })
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Events kept per session.
    pub fn max_events(&self) -> usize {
        self.max_events
    }

    /// Create and persist a session.
    ///
    /// `policy` supplies the tool lists; its scope is replaced by the
    /// request's declared scope.
    pub fn create_session(
        &self,
        request: SessionStartRequest,
        policy: Policy,
    ) -> Result<SessionRecord> {
        if !is_valid_id(&request.agent_id) {
            return Err(StoreError::InvalidId(request.agent_id));
        }
        let now = Utc::now();
        let session = SessionRecord {
            session_id: new_session_id(&request.agent_id),
            tenant_id: request.tenant_id,
            user_id: request.user_id,
            agent_id: request.agent_id,
            objective: request.objective,
            policy_id: request.policy_id,
            policy: policy.with_scope(request.target_scope),
            created_at: now,
            updated_at: now,
            current_phase: Phase::Recon,
            events: Vec::new(),
            notes: Vec::new(),
            last_reasoning: None,
        };

        let _guard = self.lock.lock();
        self.write(&session)?;
        debug!(session_id = %session.session_id, tenant = %session.tenant_id, "session created");
        Ok(session)
    }

    /// Load a session, or `None` when it does not exist.
    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let path = self.path_for(session_id)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a session that must exist.
    pub fn require_session(&self, session_id: &str) -> Result<SessionRecord> {
        self.get_session(session_id)?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }

    /// Persist `session`, bumping `updated_at`.
    pub fn save_session(&self, session: &mut SessionRecord) -> Result<()> {
        let _guard = self.lock.lock();
        session.updated_at = Utc::now();
        self.write(session)
    }

    /// Apply `f` to a stored session under the store lock and persist it.
    pub fn update<F>(&self, session_id: &str, f: F) -> Result<SessionRecord>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let _guard = self.lock.lock();
        let mut session = self.require_session(session_id)?;
        f(&mut session);
        self.trim(&mut session);
        session.updated_at = Utc::now();
        self.write(&session)?;
        Ok(session)
    }

    /// Append telemetry events, keeping only the newest `max_events`.
    pub fn append_events(&self, session_id: &str, events: Vec<Event>) -> Result<SessionRecord> {
        let count = events.len();
        let session = self.update(session_id, |s| s.events.extend(events))?;
        debug!(session_id, appended = count, total = session.events.len(), "events appended");
        Ok(session)
    }

    /// Record an operator note, both as a note and as a `note` event.
    pub fn append_note(&self, session_id: &str, message: &str) -> Result<SessionRecord> {
        self.update(session_id, |s| {
            s.notes.push(message.to_string());
            s.events.push(Event::note(message).with_field("source", "user"));
        })
    }

    /// Persist a new phase.
    pub fn persist_phase(&self, session_id: &str, phase: Phase) -> Result<SessionRecord> {
        self.update(session_id, |s| s.current_phase = phase)
    }

    /// Add scope entries; returns the updated session and the count added.
    pub fn extend_scope<I, S>(&self, session_id: &str, entries: I) -> Result<(SessionRecord, usize)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        let session = self.update(session_id, |s| added = s.policy.extend_scope(entries))?;
        Ok((session, added))
    }

    /// Sessions, newest write first, optionally for one tenant.
    ///
    /// Unreadable files are skipped with a warning.
    pub fn list_sessions(&self, tenant_id: Option<&str>) -> Result<Vec<SessionSummary>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let session = match std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|raw| Ok(serde_json::from_str::<SessionRecord>(&raw)?))
            {
                Ok(s) => s,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable session file");
                    continue;
                }
            };
            if tenant_id.is_some_and(|t| t != session.tenant_id) {
                continue;
            }
            out.push(session.summary());
        }
        out.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(out)
    }

    /// Delete a session; returns whether it existed.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        let path = self.path_for(session_id)?;
        let _guard = self.lock.lock();
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(session_id, "session deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf> {
        if !is_valid_id(session_id) {
            return Err(StoreError::InvalidId(session_id.to_string()));
        }
        Ok(self.dir.join(format!("{session_id}.json")))
    }

    fn trim(&self, session: &mut SessionRecord) {
        let len = session.events.len();
        if len > self.max_events {
            let _ = session.events.drain(..len - self.max_events);
        }
    }

    fn write(&self, session: &SessionRecord) -> Result<()> {
        let path = self.path_for(&session.session_id)?;
        let mut json = serde_json::to_string_pretty(session)?;
        json.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        let _ = tmp.persist(&path)?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("dir", &self.dir)
            .field("max_events", &self.max_events)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
