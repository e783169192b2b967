//! Policy, session and logging settings.
//!
//! Grouped here because they are small and consumed together at startup.

use labcoach_core::Policy;
use serde::{Deserialize, Serialize};

/// Default tool policy applied to new sessions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySettings {
    /// Lab-approved tools.
    pub allowed_tools: Vec<String>,
    /// Patterns that block an action outright.
    pub blocklist_patterns: Vec<String>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            allowed_tools: [
                "nmap", "masscan", "naabu", "gobuster", "ffuf", "nikto", "curl", "wget", "sqlmap",
                "hydra", "netcat", "nc", "python", "bash", "sh", "whoami", "id", "cat", "ls",
                "echo",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocklist_patterns: [
                "rm -rf",
                "shutdown",
                "reboot",
                "powershell Remove-Item",
                "format c:",
                "mkfs",
                "dd if=",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl PolicySettings {
    /// Session policy for the given scope.
    pub fn to_policy(&self, target_scope: Vec<String>) -> Policy {
        Policy::new(
            self.allowed_tools.clone(),
            self.blocklist_patterns.clone(),
            target_scope,
        )
    }
}

/// Session storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Directory holding one JSON file per session.
    pub store_dir: String,
    /// Oldest events beyond this count are dropped on append.
    pub max_events: usize,
    /// Raw events folded into context in `window` memory mode.
    pub history_window: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            store_dir: "runtime/sessions".to_string(),
            max_events: 600,
            history_window: 12,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
