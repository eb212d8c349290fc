//! Standardization to zero mean and unit variance.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Moments {
    mean: f64,
    std: f64,
}

/// Standardizes input `x` with the mean and population standard deviation
/// seen during `fit`. `NaN` values are ignored when fitting and pass through.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    name: String,
    moments: Option<Moments>,
}

impl StandardScaler {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "wattflow.standard_scaler";

    /// Creates an unfitted scaler.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            moments: None,
        }
    }

    /// Returns the fitted mean and standard deviation.
    #[must_use]
    pub fn moments(&self) -> Option<(f64, f64)> {
        self.moments.map(|m| (m.mean, m.std))
    }

    /// Maps standardized values back to the original scale.
    pub fn inverse(&self, series: &TimeSeries) -> Result<TimeSeries, ModuleError> {
        let moments = self.require_fitted()?;
        Ok(series.map(|v| v.mul_add(moments.std, moments.mean)))
    }

    fn require_fitted(&self) -> Result<Moments, ModuleError> {
        self.moments
            .ok_or_else(|| ModuleError::computation(format!("scaler '{}' is not fitted", self.name)))
    }

    /// Registry loader.
    pub fn load(
        descriptor: &ModuleDescriptor,
        _dir: &Path,
        _registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let mut module = Self::new(&descriptor.name);
        module.moments = descriptor.state_as()?;
        Ok(SharedModule::new(module))
    }
}

impl Module for StandardScaler {
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
        Params::new()
    }

    fn set_params(&mut self, _params: &Params) -> Result<(), ModuleError> {
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.moments.is_some()
    }

    #[allow(clippy::cast_precision_loss)]
    fn fit(&mut self, inputs: &ModuleInputs, _targets: &ModuleInputs) -> Result<(), ModuleError> {
        let observed: Vec<f64> = inputs
            .get("x")?
            .values()
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        if observed.is_empty() {
            return Err(ModuleError::computation("cannot fit a scaler on no observations"));
        }
        let n = observed.len() as f64;
        let mean = observed.iter().sum::<f64>() / n;
        let variance = observed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        self.moments = Some(Moments { mean, std });
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        let moments = self.require_fitted()?;
        Ok(inputs.get("x")?.map(|v| (v - moments.mean) / moments.std))
    }

    fn save(&self, _dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        let descriptor = ModuleDescriptor::new(Self::TYPE_TAG, &self.name, self.get_params());
        Ok(match self.moments {
            Some(moments) => descriptor.with_state(serde_json::to_value(moments)?),
            None => descriptor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_values_close, hourly_series};

    #[test]
    fn test_fit_transform_inverse() {
        let mut scaler = StandardScaler::new("scaler");
        assert!(!scaler.is_fitted());
        let inputs = ModuleInputs::new().with("x", hourly_series(&[1.0, 3.0, f64::NAN]));
        scaler.fit(&inputs, &ModuleInputs::new()).unwrap();
        assert_eq!(scaler.moments(), Some((2.0, 1.0)));

        let scaled = scaler.transform(&inputs).unwrap();
        assert_values_close(&scaled, &[-1.0, 1.0, f64::NAN], 1e-12);
        let restored = scaler.inverse(&scaled).unwrap();
        assert_values_close(&restored, &[1.0, 3.0, f64::NAN], 1e-12);
    }

    #[test]
    fn test_constant_input_keeps_unit_std() {
        let mut scaler = StandardScaler::new("scaler");
        let inputs = ModuleInputs::new().with("x", hourly_series(&[5.0, 5.0]));
        scaler.fit(&inputs, &ModuleInputs::new()).unwrap();
        assert_eq!(scaler.moments(), Some((5.0, 1.0)));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let mut scaler = StandardScaler::new("scaler");
        let inputs = ModuleInputs::new().with("x", hourly_series(&[1.0]));
        assert!(scaler.transform(&inputs).is_err());
    }
}
