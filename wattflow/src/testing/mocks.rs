//! Mock modules for testing.

use parking_lot::Mutex;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;

/// Call counters shared between a [`CountingModule`] and the test holding them.
#[derive(Debug, Clone, Default)]
pub struct CallCounters {
    fit: Arc<AtomicUsize>,
    transform: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
    fit_targets: Arc<Mutex<Vec<Vec<String>>>>,
}

impl CallCounters {
    /// Returns the number of `fit` calls.
    #[must_use]
    pub fn fit_count(&self) -> usize {
        self.fit.load(Ordering::SeqCst)
    }

    /// Returns the number of `transform` calls.
    #[must_use]
    pub fn transform_count(&self) -> usize {
        self.transform.load(Ordering::SeqCst)
    }

    /// Returns the number of `reset` calls.
    #[must_use]
    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    /// Returns the target names seen by each `fit` call.
    #[must_use]
    pub fn fit_targets(&self) -> Vec<Vec<String>> {
        self.fit_targets.lock().clone()
    }
}

/// A module that sums its inputs position-wise, adds an offset and counts
/// every call.
#[derive(Debug)]
pub struct CountingModule {
    name: String,
    offset: f64,
    requires_fit: bool,
    fitted: bool,
    inputs: Option<Vec<String>>,
    counters: CallCounters,
}

impl CountingModule {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "testing.counting";

    /// Creates a stateless counting module.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: 0.0,
            requires_fit: false,
            fitted: false,
            inputs: None,
            counters: CallCounters::default(),
        }
    }

    /// Makes `is_fitted` false until the first `fit`.
    #[must_use]
    pub const fn requiring_fit(mut self) -> Self {
        self.requires_fit = true;
        self
    }

    /// Adds a constant to every output value.
    #[must_use]
    pub const fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Declares the exact argument names.
    #[must_use]
    pub fn with_inputs(mut self, names: &[&str]) -> Self {
        self.inputs = Some(names.iter().map(|n| (*n).to_string()).collect());
        self
    }

    /// Returns the shared call counters.
    #[must_use]
    pub fn counters(&self) -> CallCounters {
        self.counters.clone()
    }

    /// Wraps the module and returns it together with its counters.
    #[must_use]
    pub fn shared(self) -> (SharedModule, CallCounters) {
        let counters = self.counters();
        (SharedModule::new(self), counters)
    }

    /// Registry loader.
    pub fn load(
        descriptor: &ModuleDescriptor,
        _dir: &Path,
        _registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let mut module = Self::new(&descriptor.name);
        module.set_params(&descriptor.params)?;
        module.fitted = descriptor.state_as::<bool>()?.unwrap_or(false);
        Ok(SharedModule::new(module))
    }
}

impl Module for CountingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn input_names(&self) -> Option<Vec<String>> {
        self.inputs.clone()
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("offset".into(), json!(self.offset));
        params.insert("requires_fit".into(), json!(self.requires_fit));
        if let Some(inputs) = &self.inputs {
            params.insert("inputs".into(), json!(inputs));
        }
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError> {
        if let Some(value) = params.get("offset") {
            self.offset = value
                .as_f64()
                .ok_or_else(|| ModuleError::invalid_parameter("offset", "expected a number"))?;
        }
        if let Some(value) = params.get("requires_fit") {
            self.requires_fit = value.as_bool().unwrap_or(false);
        }
        if let Some(value) = params.get("inputs") {
            self.inputs = Some(serde_json::from_value(value.clone())?);
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        !self.requires_fit || self.fitted
    }

    fn fit(&mut self, _inputs: &ModuleInputs, targets: &ModuleInputs) -> Result<(), ModuleError> {
        self.counters.fit.fetch_add(1, Ordering::SeqCst);
        self.counters
            .fit_targets
            .lock()
            .push(targets.names().map(str::to_string).collect());
        self.fitted = true;
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        self.counters.transform.fetch_add(1, Ordering::SeqCst);
        let (_, first) = inputs
            .first()
            .ok_or_else(|| ModuleError::computation("no inputs"))?;
        let mut values = vec![self.offset; first.len()];
        for (name, series) in inputs.iter() {
            if series.len() != first.len() {
                return Err(ModuleError::computation(format!(
                    "input '{name}' has {} points, expected {}",
                    series.len(),
                    first.len()
                )));
            }
            for (acc, value) in values.iter_mut().zip(series.values()) {
                *acc += value;
            }
        }
        first
            .with_values(values)
            .map_err(|err| ModuleError::computation(err.to_string()))
    }

    fn reset(&mut self) {
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn save(&self, _dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        Ok(ModuleDescriptor::new(Self::TYPE_TAG, &self.name, self.get_params())
            .with_state(json!(self.fitted)))
    }
}

/// Where a [`FailingModule`] raises its error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// `fit` fails.
    Fit,
    /// `transform` fails.
    Transform,
}

/// A module that always fails in one phase.
#[derive(Debug)]
pub struct FailingModule {
    name: String,
    fail_on: FailOn,
    error: String,
}

impl FailingModule {
    /// Creates a new failing module.
    #[must_use]
    pub fn new(name: impl Into<String>, fail_on: FailOn, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_on,
            error: error.into(),
        }
    }
}

impl Module for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        "testing.failing"
    }

    fn get_params(&self) -> Params {
        Params::new()
    }

    fn set_params(&mut self, _params: &Params) -> Result<(), ModuleError> {
        Ok(())
    }

    fn fit(&mut self, _inputs: &ModuleInputs, _targets: &ModuleInputs) -> Result<(), ModuleError> {
        match self.fail_on {
            FailOn::Fit => Err(ModuleError::computation(self.error.clone())),
            FailOn::Transform => Ok(()),
        }
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        match self.fail_on {
            FailOn::Transform => Err(ModuleError::computation(self.error.clone())),
            FailOn::Fit => inputs
                .first()
                .map(|(_, series)| series.clone())
                .ok_or_else(|| ModuleError::computation("no inputs")),
        }
    }
}
