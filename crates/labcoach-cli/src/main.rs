//! # labcoach
//!
//! Command-line front end: manages lab sessions, ingests telemetry and prints
//! next-step suggestions as JSON.

#![deny(unsafe_code)]

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use labcoach_core::{FocusHint, MemoryMode, Phase, PhaseOverride};
use labcoach_engine::{CoachService, SuggestRequest};
use labcoach_settings::{get_settings, init_settings, load_settings_from_path};

/// Coaching assistant for isolated security labs.
#[derive(Parser, Debug)]
#[command(name = "labcoach", about = "Coaching assistant for isolated security labs")]
struct Cli {
    /// Settings file (defaults to `~/.labcoach/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log filter, overriding the settings file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the knowledge index from the source directory.
    Reindex,

    /// Create, inspect and remove sessions.
    #[command(subcommand)]
    Session(SessionCommand),

    /// Append telemetry events from a JSON file.
    Events {
        /// Target session.
        session_id: String,
        /// JSON array of events, `{"events": [...]}` or a single event.
        file: PathBuf,
    },

    /// Record an operator note.
    Note {
        /// Target session.
        session_id: String,
        /// Note text.
        message: String,
    },

    /// Suggest the next actions for a session.
    Suggest(SuggestArgs),
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Start a new session.
    Start {
        /// Tenant (class or cohort).
        #[arg(long)]
        tenant: String,
        /// Operator id.
        #[arg(long)]
        user: String,
        /// Reporting agent id; prefixes the session id.
        #[arg(long)]
        agent: String,
        /// Lab objective.
        #[arg(long)]
        objective: Option<String>,
        /// In-scope targets (repeat or comma-separate).
        #[arg(long, value_delimiter = ',')]
        scope: Vec<String>,
        /// Policy profile name.
        #[arg(long)]
        policy_id: Option<String>,
    },

    /// List sessions, newest first.
    List {
        /// Only this tenant's sessions.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Print one session.
    Show {
        /// Session id.
        session_id: String,
    },

    /// Delete a session.
    Delete {
        /// Session id.
        session_id: String,
    },

    /// Add targets to a session's scope.
    Scope {
        /// Session id.
        session_id: String,
        /// Entries to add (literal host, CIDR or `*.domain`).
        #[arg(required = true)]
        entries: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct SuggestArgs {
    /// Session id.
    session_id: String,

    /// Learner message, recorded as a note first.
    #[arg(long)]
    message: Option<String>,

    /// `summary`, `window` or `full`.
    #[arg(long, default_value = "window")]
    memory_mode: MemoryMode,

    /// Events shown in window mode (defaults to the settings value).
    #[arg(long)]
    history_window: Option<usize>,

    /// Display this phase instead of the inferred one.
    #[arg(long)]
    phase: Option<Phase>,

    /// Also store the `--phase` override on the session.
    #[arg(long, requires = "phase")]
    persist_phase: bool,

    /// Retrieval focus: `auto` or a phase name.
    #[arg(long, default_value = "auto")]
    focus: FocusHint,
}

impl SuggestArgs {
    fn to_request(&self, default_window: usize) -> SuggestRequest {
        SuggestRequest {
            user_message: self.message.clone(),
            memory_mode: self.memory_mode,
            history_window: self.history_window.unwrap_or(default_window),
            phase_override: self.phase.map(|phase| PhaseOverride {
                phase,
                persist: self.persist_phase,
            }),
            focus: self.focus,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // An explicit file must load; the default location falls back to defaults.
    if let Some(path) = &cli.settings {
        let loaded = load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings: {}", path.display()))?;
        let _ = init_settings(loaded);
    }
    let settings = get_settings();

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    labcoach_core::logging::init_subscriber(level, settings.logging.json);

    let service = CoachService::from_settings(settings).context("Failed to start coach service")?;
    let output = commands::run(&service, settings.session.history_window, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
