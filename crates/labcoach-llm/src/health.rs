//! Generation backend health: rolling-window error rate.
//!
//! Observability only. A degraded backend is still called; the engine's
//! heuristic fallback already covers individual failures. The current state
//! is reported next to each suggestion as a [`HealthSnapshot`].

use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

const DEFAULT_WINDOW_SIZE: usize = 10;
const DEFAULT_DEGRADED_THRESHOLD: f64 = 0.5;

struct Window {
    outcomes: Vec<bool>,
    cursor: usize,
    total: usize,
}

impl Window {
    fn new(size: usize) -> Self {
        Self {
            outcomes: vec![true; size],
            cursor: 0,
            total: 0,
        }
    }

    fn record(&mut self, success: bool) {
        self.outcomes[self.cursor] = success;
        self.cursor = (self.cursor + 1) % self.outcomes.len();
        self.total += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn error_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = self.outcomes.len().min(self.total);
        let failures = self.outcomes[..count].iter().filter(|&&ok| !ok).count();
        failures as f64 / count as f64
    }
}

/// Point-in-time view of a [`GenerationHealthTracker`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HealthSnapshot {
    /// Calls recorded since start.
    pub calls: usize,
    /// Error rate over the window (0.0 to 1.0).
    pub error_rate: f64,
    /// Whether the error rate is above the threshold.
    pub degraded: bool,
}

/// Tracks recent generation outcomes for one backend.
pub struct GenerationHealthTracker {
    window: Mutex<Window>,
    window_size: usize,
    threshold: f64,
}

impl GenerationHealthTracker {
    /// Tracker with a 10-call window and a 50% threshold.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_WINDOW_SIZE, DEFAULT_DEGRADED_THRESHOLD)
    }

    /// Tracker with a custom window size and threshold.
    pub fn with_config(window_size: usize, threshold: f64) -> Self {
        let window_size = window_size.max(1);
        Self {
            window: Mutex::new(Window::new(window_size)),
            window_size,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.record("", true);
    }

    /// Record a failed call of `backend`.
    pub fn record_failure(&self, backend: &str) {
        self.record(backend, false);
    }

    /// Current calls, error rate and degradation in one consistent read.
    pub fn snapshot(&self) -> HealthSnapshot {
        let window = self.window.lock();
        let error_rate = window.error_rate();
        HealthSnapshot {
            calls: window.total,
            error_rate,
            degraded: window.total >= 2 && error_rate > self.threshold,
        }
    }

    fn record(&self, backend: &str, success: bool) {
        let mut window = self.window.lock();
        window.record(success);
        let rate = window.error_rate();
        if !success && window.total >= 2 && rate > self.threshold {
            warn!(
                backend,
                error_rate = format!("{:.0}%", rate * 100.0),
                window = self.window_size,
                "generation backend degraded"
            );
        }
    }
}

impl Default for GenerationHealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GenerationHealthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationHealthTracker")
            .field("window_size", &self.window_size)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
