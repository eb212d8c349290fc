//! Computation mode resolution.

use crate::core::ComputationMode;
use crate::graph::{Step, TargetGraph};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of pass being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// A training pass fitting modules.
    Train,
    /// A test pass transforming with fitted state.
    Test,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Decides the effective mode of `step` for a pass of `kind`.
///
/// An explicit override wins. Otherwise training fits, and additionally
/// transforms when the step has target inputs; testing transforms.
#[must_use]
pub fn resolve_mode(step: &Step, kind: RunKind, targets: &TargetGraph) -> ComputationMode {
    match (step.mode_override(), kind) {
        (ComputationMode::Default, RunKind::Train) if targets.has_inbound(step.id()) => {
            ComputationMode::FitTransform
        }
        (ComputationMode::Default, RunKind::Train) => ComputationMode::Train,
        (ComputationMode::Default, RunKind::Test) => ComputationMode::Transform,
        (mode, _) => mode,
    }
}
