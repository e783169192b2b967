//! # labcoach-settings
//!
//! Layered configuration for labcoach.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`LabcoachSettings::default()`])
//! 2. **User file** `~/.labcoach/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** `LABCOACH_*`, `OPENAI_API_KEY`,
//!    `GROQ_API_KEY`, `HF_TOKEN` (highest priority)
//!
//! Settings are read once at startup; the suggestion pipeline itself never
//! touches the environment.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<LabcoachSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads `~/.labcoach/settings.json` with env var overrides,
/// falling back to compiled defaults if loading fails.
pub fn get_settings() -> &'static LabcoachSettings {
    SETTINGS.get_or_init(|| match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            LabcoachSettings::default()
        }
    })
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: LabcoachSettings) -> std::result::Result<(), LabcoachSettings> {
    SETTINGS.set(settings)
}
