//! Subcommand handlers. Each returns the JSON value printed to stdout.

use std::path::Path;

use anyhow::{Context, Result, bail};
use labcoach_core::Event;
use labcoach_engine::CoachService;
use labcoach_store::SessionStartRequest;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{Command, SessionCommand};

/// Accepted shapes of an events file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventsFile {
    List(Vec<Event>),
    Wrapped { events: Vec<Event> },
    Single(Box<Event>),
}

impl EventsFile {
    fn into_events(self) -> Vec<Event> {
        match self {
            Self::List(events) | Self::Wrapped { events } => events,
            Self::Single(event) => vec![*event],
        }
    }
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read events file: {}", path.display()))?;
    let parsed: EventsFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid events file: {}", path.display()))?;
    Ok(parsed.into_events())
}

/// Execute one subcommand against the service.
pub async fn run(service: &CoachService, history_window: usize, command: Command) -> Result<Value> {
    let value = match command {
        Command::Reindex => serde_json::to_value(service.rebuild_index().await?)?,
        Command::Session(cmd) => run_session(service, cmd)?,
        Command::Events { session_id, file } => {
            let events = read_events(&file)?;
            let count = events.len();
            let session = service.ingest_events(&session_id, events)?;
            info!(session_id = %session.session_id, count, "events ingested");
            json!({
                "session_id": session.session_id,
                "ingested": count,
                "total_events": session.events.len(),
            })
        }
        Command::Note {
            session_id,
            message,
        } => {
            if message.trim().is_empty() {
                bail!("note message is empty");
            }
            let session = service.add_note(&session_id, message.trim())?;
            json!({
                "session_id": session.session_id,
                "notes": session.notes.len(),
            })
        }
        Command::Suggest(args) => {
            let request = args.to_request(history_window);
            serde_json::to_value(service.suggest(&args.session_id, &request).await?)?
        }
    };
    Ok(value)
}

fn run_session(service: &CoachService, command: SessionCommand) -> Result<Value> {
    let value = match command {
        SessionCommand::Start {
            tenant,
            user,
            agent,
            objective,
            scope,
            policy_id,
        } => {
            let mut request = SessionStartRequest::new(tenant, user, agent).with_scope(scope);
            if let Some(objective) = objective {
                request = request.with_objective(objective);
            }
            if let Some(policy_id) = policy_id {
                request.policy_id = policy_id;
            }
            serde_json::to_value(service.start_session(request)?)?
        }
        SessionCommand::List { tenant } => {
            serde_json::to_value(service.store().list_sessions(tenant.as_deref())?)?
        }
        SessionCommand::Show { session_id } => {
            serde_json::to_value(service.store().require_session(&session_id)?)?
        }
        SessionCommand::Delete { session_id } => {
            let deleted = service.store().delete_session(&session_id)?;
            json!({ "session_id": session_id, "deleted": deleted })
        }
        SessionCommand::Scope {
            session_id,
            entries,
        } => {
            let session = service.extend_scope(&session_id, entries)?;
            json!({
                "session_id": session.session_id,
                "target_scope": session.target_scope(),
            })
        }
    };
    Ok(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use labcoach_settings::{EmbeddingProvider, LabcoachSettings};

    use crate::Cli;

    fn service(root: &Path) -> CoachService {
        let mut settings = LabcoachSettings::default();
        settings.embedding.provider = EmbeddingProvider::Hashing;
        settings.session.store_dir = root.join("sessions").display().to_string();
        settings.knowledge.source_dir = root.join("kb").display().to_string();
        settings.knowledge.index_path = root.join("index.jsonl").display().to_string();
        CoachService::from_settings(&settings).unwrap()
    }

    async fn exec(service: &CoachService, argv: &[&str]) -> Result<Value> {
        let mut full = vec!["labcoach"];
        full.extend_from_slice(argv);
        run(service, 12, Cli::parse_from(full).command).await
    }

    #[test]
    fn events_file_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let event = r#"{"event_type": "command", "payload": {"command": "nmap 10.10.10.25"}}"#;
        for (name, body) in [
            ("list.json", format!("[{event}, {event}]")),
            ("wrapped.json", format!(r#"{{"events": [{event}]}}"#)),
            ("single.json", event.to_string()),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            let events = read_events(&path).unwrap();
            assert!(!events.is_empty(), "{name}");
            assert_eq!(events[0].str_field("command"), Some("nmap 10.10.10.25"));
        }

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"nope": 1}"#).unwrap();
        assert!(read_events(&bad).is_err());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let started = exec(
            &service,
            &[
                "session", "start", "--tenant", "class-a", "--user", "student-1", "--agent",
                "kali-01", "--scope", "10.10.10.25",
            ],
        )
        .await
        .unwrap();
        let id = started["session_id"].as_str().unwrap().to_string();
        assert_eq!(started["policy"]["target_scope"], json!(["10.10.10.25"]));

        let events_path = dir.path().join("events.json");
        std::fs::write(
            &events_path,
            r#"[{"event_type": "command", "payload": {"command": "nmap -sV 10.10.10.25"}}]"#,
        )
        .unwrap();
        let ingested = exec(&service, &["events", id.as_str(), events_path.to_str().unwrap()])
            .await
            .unwrap();
        assert_eq!(ingested["ingested"], 1);

        let noted = exec(&service, &["note", id.as_str(), "http on 80"]).await.unwrap();
        assert_eq!(noted["notes"], 1);

        let suggestion = exec(&service, &["suggest", id.as_str()]).await.unwrap();
        assert_eq!(suggestion["session_id"], json!(id));
        assert!(!suggestion["actions"].as_array().unwrap().is_empty());
        assert_eq!(suggestion["source"], "heuristic");

        let scoped = exec(&service, &["session", "scope", id.as_str(), "web01.lab.local"])
            .await
            .unwrap();
        assert_eq!(scoped["target_scope"], json!(["10.10.10.25", "web01.lab.local"]));

        let listed = exec(&service, &["session", "list", "--tenant", "class-a"])
            .await
            .unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let deleted = exec(&service, &["session", "delete", id.as_str()]).await.unwrap();
        assert_eq!(deleted["deleted"], true);
        assert!(exec(&service, &["session", "show", id.as_str()]).await.is_err());
    }

    #[tokio::test]
    async fn blank_note_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        assert!(exec(&service, &["note", "kali-01-abc", "   "]).await.is_err());
    }
}
