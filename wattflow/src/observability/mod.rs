//! Tracing subscriber setup and span timing.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "WATTFLOW_LOG";

const DEFAULT_DIRECTIVE: &str = "wattflow=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs a human-readable fmt subscriber filtered by `WATTFLOW_LOG`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Installs a JSON fmt subscriber filtered by `WATTFLOW_LOG`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_json_tracing() -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter())
        .try_init()
        .is_ok()
}

/// Measures the wall-clock duration of a pass or step.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration in milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_timer() {
        let timer = SpanTimer::start("train");
        assert_eq!(timer.name(), "train");
        assert!(timer.finish() >= 0.0);
    }

    #[test]
    fn test_init_is_idempotent() {
        let first = init_tracing();
        assert!(!init_tracing() || !first);
    }
}
