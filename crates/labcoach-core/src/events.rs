//! Telemetry events and the episode view over a session's event log.
//!
//! Events are immutable once appended. An [`Episode`] is the ordered event
//! sequence for one session plus its free-text notes; it is a derived view and
//! is never persisted on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of telemetry captured from the operator's workstation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A shell command the operator ran.
    Command,
    /// An HTTP request/response observed by the proxy.
    Http,
    /// A free-text note written by the operator.
    Note,
    /// A condensed scanner report.
    #[serde(alias = "scan")]
    ScanSummary,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Http => "http",
            Self::Note => "note",
            Self::ScanSummary => "scan_summary",
        }
    }
}

/// Payload keys that carry the free text of a note.
const NOTE_KEYS: [&str; 3] = ["message", "text", "note"];

fn new_event_id() -> Uuid {
    Uuid::now_v7()
}

/// One telemetry event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique id (UUID v7, time ordered).
    #[serde(default = "new_event_id")]
    pub event_id: Uuid,
    /// Event kind.
    pub event_type: EventType,
    /// When the event happened.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Scalar fields (command line, url, status, message, ...).
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Create an event stamped with a fresh id and the current time.
    pub fn new(event_type: EventType, payload: Map<String, Value>) -> Self {
        Self {
            event_id: new_event_id(),
            event_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// A `command` event for the given command line.
    pub fn command(command: impl Into<String>) -> Self {
        Self::new(EventType::Command, Map::new()).with_field("command", command.into())
    }

    /// An `http` event.
    pub fn http(method: impl Into<String>, url: impl Into<String>, status: u16) -> Self {
        Self::new(EventType::Http, Map::new())
            .with_field("method", method.into())
            .with_field("url", url.into())
            .with_field("status", status)
    }

    /// A `note` event carrying free text.
    pub fn note(message: impl Into<String>) -> Self {
        Self::new(EventType::Note, Map::new()).with_field("message", message.into())
    }

    /// A `scan_summary` event.
    pub fn scan_summary(target: impl Into<String>, summary: impl Into<String>) -> Self {
        Self::new(EventType::ScanSummary, Map::new())
            .with_field("target", target.into())
            .with_field("summary", summary.into())
    }

    /// Builder: set one payload field.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        let _ = self.payload.insert(key.to_string(), value.into());
        self
    }

    /// String value of a payload field, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Whether the payload contains `key` with a non-null value.
    pub fn has_field(&self, key: &str) -> bool {
        self.payload.get(key).is_some_and(|v| !v.is_null())
    }

    /// Free text of a note event (first of `message`, `text`, `note`).
    pub fn note_text(&self) -> Option<&str> {
        if self.event_type != EventType::Note {
            return None;
        }
        NOTE_KEYS.iter().find_map(|k| self.str_field(k))
    }

    /// Lowercased tool name: the `tool` field, else the first token of `command`.
    pub fn tool(&self) -> Option<String> {
        if let Some(tool) = self.str_field("tool").filter(|t| !t.trim().is_empty()) {
            return Some(tool.trim().to_ascii_lowercase());
        }
        self.str_field("command")
            .and_then(|c| c.split_whitespace().next())
            .map(str::to_ascii_lowercase)
    }

    /// HTTP status code of an `http` event.
    pub fn http_status(&self) -> Option<u64> {
        let value = self.payload.get("status")?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }

    /// All scalar payload values flattened into one lowercase search string.
    pub fn search_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.payload.len());
        for value in self.payload.values() {
            match value {
                Value::String(s) => parts.push(s.clone()),
                Value::Number(n) => parts.push(n.to_string()),
                Value::Bool(b) => parts.push(b.to_string()),
                _ => {}
            }
        }
        parts.join(" ").to_lowercase()
    }

    /// One-line rendering used in episode summaries.
    pub fn render_line(&self) -> String {
        let payload = serde_json::to_string(&self.payload).unwrap_or_default();
        format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            self.event_type.as_str(),
            payload
        )
    }
}

/// Ordered telemetry history for one lab session plus its notes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Events in append order.
    #[serde(default)]
    pub events: Vec<Event>,
    /// Free-text notes attached to the session.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Episode {
    /// Episode over the given events with no side notes.
    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            events,
            notes: Vec::new(),
        }
    }

    /// Whether the episode has no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Most recent note: the last side note, else the last note event's text.
    pub fn latest_note(&self) -> Option<&str> {
        self.notes.last().map(String::as_str).or_else(|| {
            self.events
                .iter()
                .rev()
                .find_map(Event::note_text)
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
