//! Root mean squared error over a rolling or cumulative horizon.

use serde_json::json;
use std::path::Path;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;

/// Computes the RMSE between `y` and `y_hat` at every timestamp of `y`.
///
/// Squared errors are buffered across calls, so an online evaluation keeps
/// accumulating. `window_size == 0` averages over everything seen since the
/// last reset; otherwise over the last `window_size` points. `y_hat` is
/// aligned on `y`'s timestamps and missing predictions are ignored.
#[derive(Debug, Clone)]
pub struct RollingRmse {
    name: String,
    window_size: usize,
    errors: TimeSeries,
}

impl RollingRmse {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "wattflow.rolling_rmse";

    /// Creates a metric averaging over `window_size` points (0 = cumulative).
    #[must_use]
    pub fn new(name: impl Into<String>, window_size: usize) -> Self {
        Self {
            name: name.into(),
            window_size,
            errors: TimeSeries::default(),
        }
    }

    /// Creates a cumulative metric.
    #[must_use]
    pub fn cumulative(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    /// Registry loader.
    pub fn load(
        descriptor: &ModuleDescriptor,
        _dir: &Path,
        _registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let mut module = Self::cumulative(&descriptor.name);
        module.set_params(&descriptor.params)?;
        if let Some(errors) = descriptor.state_as::<TimeSeries>()? {
            module.errors = errors;
        }
        Ok(SharedModule::new(module))
    }

    #[allow(clippy::cast_precision_loss)]
    fn rmse(window: &[f64]) -> f64 {
        let observed: Vec<f64> = window.iter().copied().filter(|v| !v.is_nan()).collect();
        if observed.is_empty() {
            return f64::NAN;
        }
        (observed.iter().sum::<f64>() / observed.len() as f64).sqrt()
    }
}

impl Module for RollingRmse {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn input_names(&self) -> Option<Vec<String>> {
        Some(vec!["y".to_string(), "y_hat".to_string()])
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("window_size".into(), json!(self.window_size));
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError> {
        if let Some(value) = params.get("window_size") {
            self.window_size = value
                .as_u64()
                .and_then(|w| usize::try_from(w).ok())
                .ok_or_else(|| {
                    ModuleError::invalid_parameter("window_size", "expected a non-negative integer")
                })?;
        }
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        let y = inputs.get("y")?;
        let y_hat = inputs.get("y_hat")?;
        let Some(first) = y.first_timestamp() else {
            return Ok(y.clone());
        };

        let squared: Vec<f64> = y
            .iter()
            .map(|(ts, actual)| y_hat.get(ts).map_or(f64::NAN, |predicted| (actual - predicted).powi(2)))
            .collect();
        let current = y
            .with_values(squared)
            .map_err(|err| ModuleError::computation(err.to_string()))?;

        let prior = self.errors.before(first);
        let offset = prior.len();
        let all = prior.append(&current);
        let rmse = (0..current.len())
            .map(|i| {
                let end = offset + i + 1;
                let start = if self.window_size == 0 {
                    0
                } else {
                    end.saturating_sub(self.window_size)
                };
                Self::rmse(&all.values()[start..end])
            })
            .collect();

        self.errors = if self.window_size == 0 {
            all
        } else {
            all.tail(self.window_size + current.len())
        };
        y.with_values(rmse)
            .map_err(|err| ModuleError::computation(err.to_string()))
    }

    fn reset(&mut self) {
        self.errors = TimeSeries::default();
    }

    fn save(&self, _dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        Ok(
            ModuleDescriptor::new(Self::TYPE_TAG, &self.name, self.get_params())
                .with_state(serde_json::to_value(&self.errors)?),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_values_close, hourly_series, hourly_series_from};

    fn inputs(y: TimeSeries, y_hat: TimeSeries) -> ModuleInputs {
        ModuleInputs::new().with("y", y).with("y_hat", y_hat)
    }

    #[test]
    fn test_cumulative_rmse() {
        let mut metric = RollingRmse::cumulative("rmse");
        let out = metric
            .transform(&inputs(hourly_series(&[1.0, 2.0]), hourly_series(&[2.0, 5.0])))
            .unwrap();
        assert_values_close(&out, &[1.0, 5.0_f64.sqrt()], 1e-12);
    }

    #[test]
    fn test_accumulates_across_calls_and_resets() {
        let mut metric = RollingRmse::cumulative("rmse");
        metric
            .transform(&inputs(hourly_series(&[0.0]), hourly_series(&[2.0])))
            .unwrap();
        let second = metric
            .transform(&inputs(hourly_series_from(1, &[0.0]), hourly_series_from(1, &[0.0])))
            .unwrap();
        assert_values_close(&second, &[2.0_f64.sqrt()], 1e-12);

        metric.reset();
        let fresh = metric
            .transform(&inputs(hourly_series_from(2, &[0.0]), hourly_series_from(2, &[0.0])))
            .unwrap();
        assert_values_close(&fresh, &[0.0], 0.0);
    }

    #[test]
    fn test_rolling_window() {
        let mut metric = RollingRmse::new("rmse", 1);
        let out = metric
            .transform(&inputs(hourly_series(&[0.0, 0.0]), hourly_series(&[3.0, 1.0])))
            .unwrap();
        assert_values_close(&out, &[3.0, 1.0], 1e-12);
    }

    #[test]
    fn test_missing_predictions_are_ignored() {
        let mut metric = RollingRmse::cumulative("rmse");
        let out = metric
            .transform(&inputs(hourly_series(&[1.0, 1.0]), hourly_series_from(1, &[3.0])))
            .unwrap();
        assert_values_close(&out, &[f64::NAN, 2.0], 1e-12);
    }
}
