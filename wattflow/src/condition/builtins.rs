//! Built-in conditions.

use super::{Condition, ConditionDescriptor};
use crate::core::ExecutionWindow;
use crate::module::ModuleInputs;
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// True when the hour of the first timestamp lies strictly between the bounds.
///
/// The timestamp is taken from the named input when it is present, otherwise
/// from the window start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourOfDay {
    /// Input whose first timestamp is inspected.
    #[serde(default)]
    pub input: Option<String>,
    /// Exclusive lower bound.
    pub start_hour: u32,
    /// Exclusive upper bound.
    pub end_hour: u32,
}

impl HourOfDay {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "condition.hour_of_day";

    /// Creates a condition true for `start_hour < hour < end_hour`.
    #[must_use]
    pub const fn between(start_hour: u32, end_hour: u32) -> Self {
        Self {
            input: None,
            start_hour,
            end_hour,
        }
    }

    /// Reads the timestamp from the named input.
    #[must_use]
    pub fn on_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }
}

impl Condition for HourOfDay {
    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn evaluate(&self, inputs: &ModuleInputs, window: &ExecutionWindow) -> bool {
        let timestamp = self
            .input
            .as_deref()
            .and_then(|name| inputs.try_get(name))
            .and_then(crate::core::TimeSeries::first_timestamp)
            .unwrap_or_else(|| window.start());
        let hour = timestamp.hour();
        self.start_hour < hour && hour < self.end_hour
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// True when the first value of the named input exceeds a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueAbove {
    /// Input whose first value is inspected.
    pub input: String,
    /// Exclusive threshold.
    pub threshold: f64,
}

impl ValueAbove {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "condition.value_above";

    /// Creates the condition.
    #[must_use]
    pub fn new(input: impl Into<String>, threshold: f64) -> Self {
        Self {
            input: input.into(),
            threshold,
        }
    }
}

impl Condition for ValueAbove {
    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn evaluate(&self, inputs: &ModuleInputs, _window: &ExecutionWindow) -> bool {
        inputs
            .try_get(&self.input)
            .and_then(|series| series.values().first().copied())
            .is_some_and(|value| value > self.threshold)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Negates another condition.
#[derive(Debug, Clone)]
pub struct Not {
    inner: Arc<dyn Condition>,
}

impl Not {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "condition.not";

    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn Condition>) -> Self {
        Self { inner }
    }

    /// Returns the negated condition.
    #[must_use]
    pub fn inner(&self) -> &Arc<dyn Condition> {
        &self.inner
    }
}

impl Condition for Not {
    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn evaluate(&self, inputs: &ModuleInputs, window: &ExecutionWindow) -> bool {
        !self.inner.evaluate(inputs, window)
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self.inner.describe()).unwrap_or_default()
    }
}

/// Parses the inner descriptor of a persisted [`Not`].
pub(crate) fn not_inner_descriptor(
    params: &serde_json::Value,
) -> Result<ConditionDescriptor, serde_json::Error> {
    serde_json::from_value(params.clone())
}
