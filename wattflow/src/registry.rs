//! Registry of module and condition loaders, keyed by type tag.
//!
//! Persisted pipelines name module and condition types by tag. Loading a
//! pipeline looks every tag up here; an unknown tag makes the pipeline
//! corrupt from the caller's point of view.

use crate::condition::{self, Condition, ConditionDescriptor, HourOfDay, Not, ValueAbove};
use crate::errors::{CorruptPipelineError, ModuleError, WattflowError};
use crate::module::{ModuleDescriptor, SharedModule};
use crate::modules::{ClockShift, LinearRegression, RollingRmse, StandardScaler, SyntheticConceptDrift};
use crate::pipeline::SubPipeline;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Rebuilds a module from its descriptor and blob directory.
pub type ModuleLoader =
    Box<dyn Fn(&ModuleDescriptor, &Path, &Registry) -> Result<SharedModule, ModuleError> + Send + Sync>;

/// Rebuilds a condition from its parameters.
pub type ConditionLoader =
    Box<dyn Fn(&serde_json::Value, &Registry) -> Result<Arc<dyn Condition>, ModuleError> + Send + Sync>;

/// Loaders for every module and condition type a pipeline may contain.
#[derive(Default)]
pub struct Registry {
    modules: HashMap<String, ModuleLoader>,
    conditions: HashMap<String, ConditionLoader>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with all built-in modules and conditions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_module(ClockShift::TYPE_TAG, ClockShift::load);
        registry.register_module(StandardScaler::TYPE_TAG, StandardScaler::load);
        registry.register_module(LinearRegression::TYPE_TAG, LinearRegression::load);
        registry.register_module(RollingRmse::TYPE_TAG, RollingRmse::load);
        registry.register_module(SyntheticConceptDrift::TYPE_TAG, SyntheticConceptDrift::load);
        registry.register_module(SubPipeline::TYPE_TAG, SubPipeline::load);

        registry.register_condition(HourOfDay::TYPE_TAG, |params, _| {
            let condition: HourOfDay = serde_json::from_value(params.clone())?;
            Ok(Arc::new(condition) as Arc<dyn Condition>)
        });
        registry.register_condition(ValueAbove::TYPE_TAG, |params, _| {
            let condition: ValueAbove = serde_json::from_value(params.clone())?;
            Ok(Arc::new(condition) as Arc<dyn Condition>)
        });
        registry.register_condition(Not::TYPE_TAG, |params, registry| {
            let inner = condition::not_inner_descriptor(params)?;
            let inner = registry
                .load_condition(&inner)
                .map_err(|err| ModuleError::computation(err.to_string()))?;
            Ok(Arc::new(Not::new(inner)) as Arc<dyn Condition>)
        });
        registry
    }

    /// Registers a module loader, replacing any loader with the same tag.
    pub fn register_module<F>(&mut self, type_tag: impl Into<String>, loader: F)
    where
        F: Fn(&ModuleDescriptor, &Path, &Self) -> Result<SharedModule, ModuleError> + Send + Sync + 'static,
    {
        self.modules.insert(type_tag.into(), Box::new(loader));
    }

    /// Registers a condition loader, replacing any loader with the same tag.
    pub fn register_condition<F>(&mut self, type_tag: impl Into<String>, loader: F)
    where
        F: Fn(&serde_json::Value, &Self) -> Result<Arc<dyn Condition>, ModuleError> + Send + Sync + 'static,
    {
        self.conditions.insert(type_tag.into(), Box::new(loader));
    }

    /// Returns true if a module loader is registered for `type_tag`.
    #[must_use]
    pub fn has_module(&self, type_tag: &str) -> bool {
        self.modules.contains_key(type_tag)
    }

    /// Returns the registered module tags, sorted.
    #[must_use]
    pub fn module_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Rebuilds a module from its descriptor.
    pub fn load_module(&self, descriptor: &ModuleDescriptor, dir: &Path) -> Result<SharedModule, WattflowError> {
        let loader = self.modules.get(&descriptor.type_tag).ok_or_else(|| {
            CorruptPipelineError::new(format!("unknown module type '{}'", descriptor.type_tag))
                .with_path(dir)
        })?;
        loader(descriptor, dir, self).map_err(|err| {
            CorruptPipelineError::new(format!(
                "module '{}' ({}) could not be loaded: {err}",
                descriptor.name, descriptor.type_tag
            ))
            .with_path(dir)
            .into()
        })
    }

    /// Rebuilds a condition from its descriptor.
    pub fn load_condition(&self, descriptor: &ConditionDescriptor) -> Result<Arc<dyn Condition>, WattflowError> {
        let loader = self.conditions.get(&descriptor.type_tag).ok_or_else(|| {
            CorruptPipelineError::new(format!("unknown condition type '{}'", descriptor.type_tag))
        })?;
        loader(&descriptor.params, self).map_err(|err| {
            CorruptPipelineError::new(format!(
                "condition '{}' could not be loaded: {err}",
                descriptor.type_tag
            ))
            .into()
        })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut conditions: Vec<&String> = self.conditions.keys().collect();
        conditions.sort_unstable();
        f.debug_struct("Registry")
            .field("modules", &self.module_tags())
            .field("conditions", &conditions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Params;

    #[test]
    fn test_builtins_are_registered() {
        let registry = Registry::with_builtins();
        assert!(registry.has_module(ClockShift::TYPE_TAG));
        assert!(registry.has_module(SubPipeline::TYPE_TAG));
        assert_eq!(registry.module_tags().len(), 6);
    }

    #[test]
    fn test_unknown_module_tag_is_corrupt() {
        let registry = Registry::new();
        let descriptor = ModuleDescriptor::new("missing.type", "m", Params::new());
        let err = registry.load_module(&descriptor, Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, WattflowError::CorruptPipeline(_)));
    }

    #[test]
    fn test_loader_failure_is_corrupt() {
        let registry = Registry::with_builtins();
        let mut params = Params::new();
        params.insert("lag".into(), serde_json::json!("two"));
        let descriptor = ModuleDescriptor::new(ClockShift::TYPE_TAG, "lag", params);
        let err = registry.load_module(&descriptor, Path::new("/tmp")).unwrap_err();
        assert!(err.to_string().contains("could not be loaded"));
    }

    #[test]
    fn test_nested_condition_loading() {
        let registry = Registry::with_builtins();
        let night = Not::new(Arc::new(HourOfDay::between(8, 20)));
        let loaded = registry.load_condition(&night.describe()).unwrap();
        assert_eq!(loaded.type_tag(), Not::TYPE_TAG);
        assert_eq!(loaded.describe(), night.describe());
    }
}
