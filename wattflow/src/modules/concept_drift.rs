//! Synthetic concept drift injected into a series.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;

/// The shape of one drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// The full offset applies from the first drift step (sudden drift).
    Jump {
        /// Offset added to the series.
        height: f64,
    },
    /// The offset grows linearly and reaches `height` at the last step
    /// (incremental drift).
    Linear {
        /// Final offset.
        height: f64,
    },
}

impl DriftKind {
    /// Offset at drift step `step` of `length` steps.
    #[allow(clippy::cast_precision_loss)]
    fn offset(self, step: usize, length: usize) -> f64 {
        match self {
            Self::Jump { height } => height,
            Self::Linear { height } => height * (step + 1) as f64 / length as f64,
        }
    }
}

/// One drift: its shape, start timestamp and length in grid steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    /// The drift shape.
    pub kind: DriftKind,
    /// First timestamp affected.
    pub position: DateTime<Utc>,
    /// Number of grid steps the drift takes to complete.
    pub length: usize,
}

impl Drift {
    /// Offset contributed at `timestamp` on a grid of step `frequency`.
    ///
    /// Before `position` there is no offset; after the drift completes the
    /// last offset stays.
    fn offset_at(&self, timestamp: DateTime<Utc>, frequency: Duration) -> f64 {
        if timestamp < self.position || self.length == 0 {
            return 0.0;
        }
        let elapsed = (timestamp - self.position).num_seconds();
        let step = usize::try_from(elapsed / frequency.num_seconds().max(1)).unwrap_or(usize::MAX);
        self.kind.offset(step.min(self.length - 1), self.length)
    }
}

/// Adds synthetic drifts to input `x`.
#[derive(Debug, Clone)]
pub struct SyntheticConceptDrift {
    name: String,
    frequency: Duration,
    drifts: Vec<Drift>,
}

impl SyntheticConceptDrift {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "wattflow.synthetic_concept_drift";

    /// Creates a drift injector for a grid with step `frequency`.
    pub fn new(name: impl Into<String>, frequency: Duration) -> Result<Self, ModuleError> {
        if frequency.num_seconds() <= 0 {
            return Err(ModuleError::invalid_parameter(
                "frequency_secs",
                "must be at least one second",
            ));
        }
        Ok(Self {
            name: name.into(),
            frequency,
            drifts: Vec::new(),
        })
    }

    /// Adds a drift.
    #[must_use]
    pub fn with_drift(mut self, kind: DriftKind, position: DateTime<Utc>, length: usize) -> Self {
        self.drifts.push(Drift {
            kind,
            position,
            length,
        });
        self
    }

    /// Registry loader.
    pub fn load(
        descriptor: &ModuleDescriptor,
        _dir: &Path,
        _registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let mut module = Self::new(&descriptor.name, Duration::hours(1))?;
        module.set_params(&descriptor.params)?;
        Ok(SharedModule::new(module))
    }
}

impl Module for SyntheticConceptDrift {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn input_names(&self) -> Option<Vec<String>> {
        Some(vec!["x".to_string()])
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("frequency_secs".into(), json!(self.frequency.num_seconds()));
        params.insert("drifts".into(), json!(self.drifts));
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError> {
        if let Some(value) = params.get("frequency_secs") {
            let secs = value
                .as_i64()
                .filter(|s| *s > 0)
                .ok_or_else(|| ModuleError::invalid_parameter("frequency_secs", "expected a positive integer"))?;
            self.frequency = Duration::seconds(secs);
        }
        if let Some(value) = params.get("drifts") {
            self.drifts = serde_json::from_value(value.clone())
                .map_err(|err| ModuleError::invalid_parameter("drifts", err.to_string()))?;
        }
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        let x = inputs.get("x")?;
        let values = x
            .iter()
            .map(|(ts, value)| {
                value
                    + self
                        .drifts
                        .iter()
                        .map(|drift| drift.offset_at(ts, self.frequency))
                        .sum::<f64>()
            })
            .collect();
        x.with_values(values)
            .map_err(|err| ModuleError::computation(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_values_close, hour, hourly_series};

    #[test]
    fn test_jump_drift_persists_after_end() {
        let mut drift = SyntheticConceptDrift::new("drift", Duration::hours(1))
            .unwrap()
            .with_drift(DriftKind::Jump { height: 10.0 }, hour(2), 2);
        let out = drift
            .transform(&ModuleInputs::new().with("x", hourly_series(&[0.0; 6])))
            .unwrap();
        assert_values_close(&out, &[0.0, 0.0, 10.0, 10.0, 10.0, 10.0], 0.0);
    }

    #[test]
    fn test_linear_drift_ramps_to_height() {
        let mut drift = SyntheticConceptDrift::new("drift", Duration::hours(1))
            .unwrap()
            .with_drift(DriftKind::Linear { height: 4.0 }, hour(1), 4);
        let out = drift
            .transform(&ModuleInputs::new().with("x", hourly_series(&[1.0; 7])))
            .unwrap();
        assert_values_close(&out, &[1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0], 1e-12);
    }

    #[test]
    fn test_params_round_trip() {
        let drift = SyntheticConceptDrift::new("drift", Duration::minutes(15))
            .unwrap()
            .with_drift(DriftKind::Jump { height: 1.0 }, hour(0), 3);
        let mut restored = SyntheticConceptDrift::new("drift", Duration::hours(1)).unwrap();
        restored.set_params(&drift.get_params()).unwrap();
        assert_eq!(restored.frequency, Duration::minutes(15));
        assert_eq!(restored.drifts, drift.drifts);
    }

    #[test]
    fn test_rejects_non_positive_frequency() {
        assert!(SyntheticConceptDrift::new("drift", Duration::zero()).is_err());
    }
}
