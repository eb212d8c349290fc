//! Computation mode and step status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a step treats its module during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationMode {
    /// Let the engine decide from the run kind and target edges.
    #[default]
    Default,
    /// Fit only; the value is not reported.
    Train,
    /// Fit, then transform.
    FitTransform,
    /// Transform with the current fitted state.
    Transform,
}

impl ComputationMode {
    /// Returns true if this mode fits the module.
    #[must_use]
    pub const fn fits(self) -> bool {
        matches!(self, Self::Train | Self::FitTransform)
    }

    /// Returns true if the step's value is reported to callbacks and results.
    #[must_use]
    pub const fn reports_value(self) -> bool {
        matches!(self, Self::FitTransform | Self::Transform)
    }
}

impl fmt::Display for ComputationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Train => write!(f, "train"),
            Self::FitTransform => write!(f, "fit_transform"),
            Self::Transform => write!(f, "transform"),
        }
    }
}

/// The outcome status of a step for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step produced a value.
    Ok,
    /// The module was fitted; a value is present only if a consumer needed one.
    Fitted,
    /// The step did not run for this window.
    Skip,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Fitted => write!(f, "fitted"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_serde_snake_case() {
        let json = serde_json::to_string(&ComputationMode::FitTransform).unwrap();
        assert_eq!(json, "\"fit_transform\"");
        let mode: ComputationMode = serde_json::from_str("\"train\"").unwrap();
        assert_eq!(mode, ComputationMode::Train);
    }

    #[test]
    fn test_mode_flags() {
        assert!(ComputationMode::Train.fits());
        assert!(!ComputationMode::Train.reports_value());
        assert!(ComputationMode::FitTransform.fits());
        assert!(ComputationMode::Transform.reports_value());
        assert!(!ComputationMode::Transform.fits());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StepStatus::Skip.to_string(), "skip");
        assert_eq!(ComputationMode::default().to_string(), "default");
    }
}
