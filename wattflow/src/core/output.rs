//! Step output type with factory methods.

use super::{StepStatus, TimeSeries};
use std::sync::Arc;

/// The stored result of one step for one window.
///
/// A skipped output is the "no value" sentinel: consumers treat it as absent
/// and are skipped in turn.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// The outcome status.
    pub status: StepStatus,
    /// The produced series, if any.
    pub value: Option<Arc<TimeSeries>>,
    /// Why the step was skipped.
    pub skip_reason: Option<String>,
}

impl StepOutput {
    /// Creates an output carrying a value.
    #[must_use]
    pub fn value(series: TimeSeries) -> Self {
        Self::shared(Arc::new(series))
    }

    /// Creates an output carrying an already shared value.
    #[must_use]
    pub fn shared(series: Arc<TimeSeries>) -> Self {
        Self {
            status: StepStatus::Ok,
            value: Some(series),
            skip_reason: None,
        }
    }

    /// Creates a fitted output, optionally holding the value consumers asked for.
    #[must_use]
    pub fn fitted(series: Option<TimeSeries>) -> Self {
        Self {
            status: StepStatus::Fitted,
            value: series.map(Arc::new),
            skip_reason: None,
        }
    }

    /// Creates the "no value" sentinel.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skip,
            value: None,
            skip_reason: Some(reason.into()),
        }
    }

    /// Returns true if the step was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == StepStatus::Skip
    }

    /// Returns the value, if one was produced.
    #[must_use]
    pub fn series(&self) -> Option<&Arc<TimeSeries>> {
        self.value.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_has_no_value() {
        let out = StepOutput::skip("condition false");
        assert!(out.is_skipped());
        assert!(out.series().is_none());
        assert_eq!(out.skip_reason.as_deref(), Some("condition false"));
    }

    #[test]
    fn test_fitted_without_value() {
        let out = StepOutput::fitted(None);
        assert_eq!(out.status, StepStatus::Fitted);
        assert!(!out.is_skipped());
        assert!(out.series().is_none());
    }

    #[test]
    fn test_value_output() {
        let out = StepOutput::value(TimeSeries::default());
        assert_eq!(out.status, StepStatus::Ok);
        assert!(out.series().is_some());
    }
}
