//! Lag a series by a fixed number of positions.

use serde_json::json;
use std::path::Path;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;

/// Shifts input `x` by `lag` positions.
///
/// Observed points are kept between calls, so incremental (online) passes
/// see the same lagged values as one batch pass over the concatenated data.
/// The buffer covers the last window plus `lag` points, which lets a window
/// be recomputed. Positions without history are `NaN`.
#[derive(Debug, Clone)]
pub struct ClockShift {
    name: String,
    lag: usize,
    history: TimeSeries,
}

impl ClockShift {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "wattflow.clock_shift";

    /// Creates a clock shift named `name`.
    pub fn new(name: impl Into<String>, lag: usize) -> Result<Self, ModuleError> {
        validate_lag(lag)?;
        Ok(Self {
            name: name.into(),
            lag,
            history: TimeSeries::default(),
        })
    }

    /// Returns the lag.
    #[must_use]
    pub const fn lag(&self) -> usize {
        self.lag
    }

    /// Registry loader.
    pub fn load(
        descriptor: &ModuleDescriptor,
        _dir: &Path,
        _registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let mut module = Self::new(&descriptor.name, 1)?;
        module.set_params(&descriptor.params)?;
        if let Some(history) = descriptor.state_as::<TimeSeries>()? {
            module.history = history;
        }
        Ok(SharedModule::new(module))
    }
}

fn validate_lag(lag: usize) -> Result<(), ModuleError> {
    if lag == 0 {
        return Err(ModuleError::invalid_parameter("lag", "must be at least 1"));
    }
    Ok(())
}

impl Module for ClockShift {
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
        params.insert("lag".into(), json!(self.lag));
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError> {
        if let Some(value) = params.get("lag") {
            let lag = value
                .as_u64()
                .and_then(|lag| usize::try_from(lag).ok())
                .ok_or_else(|| ModuleError::invalid_parameter("lag", "expected a positive integer"))?;
            validate_lag(lag)?;
            self.lag = lag;
        }
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        let x = inputs.get("x")?;
        let Some(first) = x.first_timestamp() else {
            return Ok(x.clone());
        };

        // Points at or after `first` are being recomputed and leave the history.
        let prior = self.history.before(first);
        let offset = prior.len();
        let combined: Vec<f64> = prior.values().iter().chain(x.values()).copied().collect();
        let shifted = (0..x.len())
            .map(|i| {
                (i + offset)
                    .checked_sub(self.lag)
                    .map_or(f64::NAN, |source| combined[source])
            })
            .collect();

        self.history = prior.append(x).tail(self.lag + x.len());
        x.with_values(shifted)
            .map_err(|err| ModuleError::computation(err.to_string()))
    }

    fn reset(&mut self) {
        self.history = TimeSeries::default();
    }

    fn save(&self, _dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        Ok(
            ModuleDescriptor::new(Self::TYPE_TAG, &self.name, self.get_params())
                .with_state(serde_json::to_value(&self.history)?),
        )
    }
}
