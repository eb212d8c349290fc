//! Predicates that gate conditional steps.
//!
//! Conditions are declared types with a registry tag and JSON parameters, so
//! a persisted pipeline can rebuild them through the [`Registry`].
//!
//! [`Registry`]: crate::registry::Registry

mod builtins;

pub use builtins::{HourOfDay, Not, ValueAbove};
pub(crate) use builtins::not_inner_descriptor;

use crate::core::ExecutionWindow;
use crate::module::ModuleInputs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A predicate deciding whether a step runs for a window.
pub trait Condition: Send + Sync + fmt::Debug {
    /// Returns the stable registry tag for this condition type.
    fn type_tag(&self) -> &str;

    /// Evaluates the predicate over the step's computational and
    /// conditional inputs.
    fn evaluate(&self, inputs: &ModuleInputs, window: &ExecutionWindow) -> bool;

    /// Returns the parameters needed to rebuild the condition.
    fn params(&self) -> serde_json::Value;

    /// Returns the persisted form of the condition.
    fn describe(&self) -> ConditionDescriptor {
        ConditionDescriptor {
            type_tag: self.type_tag().to_string(),
            params: self.params(),
        }
    }
}

/// The persisted form of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDescriptor {
    /// Registry tag used to find the loader.
    pub type_tag: String,
    /// Condition parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}
