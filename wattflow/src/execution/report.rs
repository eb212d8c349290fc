//! Per-pass execution report.

use super::RunKind;
use crate::core::{ComputationMode, ExecutionWindow, StepOutput};
use crate::graph::NodeId;
use std::collections::BTreeMap;
use uuid::Uuid;

/// What one train or test pass did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Unique id of the pass.
    pub run_id: Uuid,
    /// Train or test.
    pub kind: RunKind,
    /// The evaluated window.
    pub window: ExecutionWindow,
    /// Effective mode per step in the pass.
    pub modes: BTreeMap<NodeId, ComputationMode>,
    /// Steps that ran their module, in execution order.
    pub executed: Vec<NodeId>,
    /// Steps that produced the "no value" sentinel.
    pub skipped: Vec<NodeId>,
    /// Steps served from the result store.
    pub cached: Vec<NodeId>,
    /// Steps that fitted their module.
    pub fitted: Vec<NodeId>,
    /// Outputs of the requested steps.
    pub outputs: BTreeMap<NodeId, StepOutput>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl RunReport {
    pub(crate) fn new(kind: RunKind, window: ExecutionWindow) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            kind,
            window,
            modes: BTreeMap::new(),
            executed: Vec::new(),
            skipped: Vec::new(),
            cached: Vec::new(),
            fitted: Vec::new(),
            outputs: BTreeMap::new(),
            duration_ms: 0.0,
        }
    }

    /// Returns true if `id` ran its module in this pass.
    #[must_use]
    pub fn was_executed(&self, id: NodeId) -> bool {
        self.executed.contains(&id)
    }

    /// Returns true if `id` was skipped in this pass.
    #[must_use]
    pub fn was_skipped(&self, id: NodeId) -> bool {
        self.skipped.contains(&id)
    }
}
