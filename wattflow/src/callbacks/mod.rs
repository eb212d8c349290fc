//! Callbacks notified with step outputs after a pass.
//!
//! Callbacks observe results; they cannot fail the pass and are not persisted.

use crate::core::{ExecutionWindow, TimeSeries};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Observer invoked with every reported value of the step it is attached to.
pub trait Callback: Send + Sync + fmt::Debug {
    /// Receives one step output.
    fn on_output(&self, step_name: &str, window: &ExecutionWindow, series: &TimeSeries);
}

/// A callback that logs basic statistics through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingCallback;

impl Callback for LoggingCallback {
    fn on_output(&self, step_name: &str, window: &ExecutionWindow, series: &TimeSeries) {
        let observed: Vec<f64> = series.values().iter().copied().filter(|v| !v.is_nan()).collect();
        #[allow(clippy::cast_precision_loss)]
        let mean = if observed.is_empty() {
            f64::NAN
        } else {
            observed.iter().sum::<f64>() / observed.len() as f64
        };
        info!(
            step = %step_name,
            window = %window,
            points = series.len(),
            mean = mean,
            "Step output"
        );
    }
}

/// A callback that keeps every output it receives, for inspection.
///
/// Clones share storage, so a clone kept by the caller sees what the
/// pipeline delivered.
#[derive(Debug, Clone, Default)]
pub struct CollectingCallback {
    outputs: Arc<RwLock<BTreeMap<String, Vec<(ExecutionWindow, TimeSeries)>>>>,
}

impl CollectingCallback {
    /// Creates a new collecting callback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the outputs received for `step_name`, in delivery order.
    #[must_use]
    pub fn outputs(&self, step_name: &str) -> Vec<(ExecutionWindow, TimeSeries)> {
        self.outputs.read().get(step_name).cloned().unwrap_or_default()
    }

    /// Returns the number of outputs received across all steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.read().values().map(Vec::len).sum()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears received outputs.
    pub fn clear(&self) {
        self.outputs.write().clear();
    }
}

impl Callback for CollectingCallback {
    fn on_output(&self, step_name: &str, window: &ExecutionWindow, series: &TimeSeries) {
        self.outputs
            .write()
            .entry(step_name.to_string())
            .or_default()
            .push((*window, series.clone()));
    }
}
