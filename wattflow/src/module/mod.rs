//! The module interface: user-supplied fit/transform units.
//!
//! A [`Module`] is wrapped by one or more steps. Steps hold a
//! [`SharedModule`] handle; cloning the handle shares the instance, so fitting
//! through one step is visible through every other step that wraps it.

mod inputs;

pub use inputs::ModuleInputs;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Module parameters as a JSON object.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// The persisted form of a module, written to its blob as `module.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Registry tag used to find the loader.
    pub type_tag: String,
    /// The module name.
    pub name: String,
    /// Constructor parameters.
    #[serde(default)]
    pub params: Params,
    /// Fitted and historical state, if the module has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

impl ModuleDescriptor {
    /// Creates a descriptor without state.
    #[must_use]
    pub fn new(type_tag: impl Into<String>, name: impl Into<String>, params: Params) -> Self {
        Self {
            type_tag: type_tag.into(),
            name: name.into(),
            params,
            state: None,
        }
    }

    /// Attaches serialized state.
    #[must_use]
    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Deserializes the attached state, if any.
    pub fn state_as<T: serde::de::DeserializeOwned>(&self) -> Result<Option<T>, ModuleError> {
        self.state
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(ModuleError::from)
    }
}

/// A fit/transform unit operating on named time series.
pub trait Module: Send + fmt::Debug {
    /// Returns the module name used for step display names.
    fn name(&self) -> &str;

    /// Returns the stable registry tag for this module type.
    fn type_tag(&self) -> &str;

    /// Returns the accepted argument names, or `None` to accept any names.
    fn input_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Returns the constructor parameters.
    fn get_params(&self) -> Params;

    /// Updates parameters; unknown keys are ignored.
    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError>;

    /// Returns true once the module can transform.
    fn is_fitted(&self) -> bool {
        true
    }

    /// Fits the module. Stateless modules keep the default no-op.
    fn fit(&mut self, _inputs: &ModuleInputs, _targets: &ModuleInputs) -> Result<(), ModuleError> {
        Ok(())
    }

    /// Transforms the inputs into one output series.
    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError>;

    /// Clears historical buffers kept across incremental calls.
    ///
    /// Fitted state is untouched.
    fn reset(&mut self) {}

    /// Persists the module. `dir` is the module's private blob directory and
    /// may receive extra files.
    fn save(&self, _dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        Ok(ModuleDescriptor::new(
            self.type_tag(),
            self.name(),
            self.get_params(),
        ))
    }
}

/// A shared, lockable handle to a module instance.
///
/// Identity is pointer identity: two handles are the same module only if one
/// was cloned from the other.
#[derive(Clone)]
pub struct SharedModule(Arc<Mutex<dyn Module>>);

impl SharedModule {
    /// Wraps a module in a new shared handle.
    pub fn new<M: Module + 'static>(module: M) -> Self {
        Self(Arc::new(Mutex::new(module)))
    }

    /// Locks the module for a call.
    pub fn lock(&self) -> MutexGuard<'_, dyn Module> {
        self.0.lock()
    }

    /// Returns a value identifying the underlying instance.
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Returns true if both handles refer to the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Returns the module name.
    #[must_use]
    pub fn name(&self) -> String {
        self.lock().name().to_string()
    }

    /// Returns the module type tag.
    #[must_use]
    pub fn type_tag(&self) -> String {
        self.lock().type_tag().to_string()
    }
}

impl fmt::Debug for SharedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_lock() {
            Some(module) => f.debug_tuple("SharedModule").field(&module.name()).finish(),
            None => f.debug_tuple("SharedModule").field(&"<locked>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Identity;

    impl Module for Identity {
        fn name(&self) -> &str {
            "identity"
        }

        fn type_tag(&self) -> &str {
            "test.identity"
        }

        fn get_params(&self) -> Params {
            Params::new()
        }

        fn set_params(&mut self, _params: &Params) -> Result<(), ModuleError> {
            Ok(())
        }

        fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
            inputs.get("x").cloned()
        }
    }

    #[test]
    fn test_identity_is_shared_by_clones() {
        let a = SharedModule::new(Identity);
        let b = a.clone();
        let c = SharedModule::new(Identity);
        assert!(a.same_instance(&b));
        assert!(!a.same_instance(&c));
    }

    #[test]
    fn test_default_save_descriptor() {
        let module = SharedModule::new(Identity);
        let descriptor = module.lock().save(Path::new(".")).unwrap();
        assert_eq!(descriptor.type_tag, "test.identity");
        assert_eq!(descriptor.name, "identity");
        assert!(descriptor.state.is_none());
    }

    #[test]
    fn test_descriptor_state_round_trip() {
        let descriptor = ModuleDescriptor::new("t", "n", Params::new())
            .with_state(serde_json::json!([1.0, 2.0]));
        let state: Option<Vec<f64>> = descriptor.state_as().unwrap();
        assert_eq!(state, Some(vec![1.0, 2.0]));
    }
}
