//! Fluent wiring of one step.

use super::Pipeline;
use crate::callbacks::Callback;
use crate::condition::Condition;
use crate::core::ComputationMode;
use crate::errors::WattflowError;
use crate::graph::{Binding, EdgeKind, NodeId, StepSpec};
use crate::module::SharedModule;
use std::sync::Arc;

/// Collects a step's bindings, condition and options, then adds it.
///
/// ```ignore
/// let prediction = pipeline
///     .step(&regressor)
///     .input("lag", lag)
///     .target("y", load)
///     .add()?;
/// ```
#[derive(Debug)]
pub struct StepBuilder<'p> {
    pipeline: &'p mut Pipeline,
    spec: StepSpec,
}

impl<'p> StepBuilder<'p> {
    pub(crate) fn new(pipeline: &'p mut Pipeline, module: SharedModule) -> Self {
        Self {
            pipeline,
            spec: StepSpec::new(module),
        }
    }

    fn bind(mut self, name: impl Into<String>, kind: EdgeKind, producers: Vec<NodeId>) -> Self {
        self.spec.bindings.push(Binding::new(name, kind, producers));
        self
    }

    /// Binds computational input `name` to `producer`.
    #[must_use]
    pub fn input(self, name: impl Into<String>, producer: NodeId) -> Self {
        self.bind(name, EdgeKind::Computational, vec![producer])
    }

    /// Binds computational input `name` to the first of `producers` that
    /// holds a value.
    #[must_use]
    pub fn input_any(self, name: impl Into<String>, producers: &[NodeId]) -> Self {
        self.bind(name, EdgeKind::Computational, producers.to_vec())
    }

    /// Binds computational input `name` to data column `column`.
    #[must_use]
    pub fn column(self, name: impl Into<String>, column: impl Into<String>) -> Self {
        let producer = self.pipeline.input(column);
        self.input(name, producer)
    }

    /// Binds target `name` to `producer`.
    #[must_use]
    pub fn target(self, name: impl Into<String>, producer: NodeId) -> Self {
        self.bind(name, EdgeKind::Target, vec![producer])
    }

    /// Binds target `name` to the first of `producers` that holds a value.
    #[must_use]
    pub fn target_any(self, name: impl Into<String>, producers: &[NodeId]) -> Self {
        self.bind(name, EdgeKind::Target, producers.to_vec())
    }

    /// Gates the step on `condition`.
    #[must_use]
    pub fn condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.spec.condition = Some(condition);
        self
    }

    /// Binds conditional input `name`, read only by the condition.
    #[must_use]
    pub fn condition_input(self, name: impl Into<String>, producer: NodeId) -> Self {
        self.bind(name, EdgeKind::Conditional, vec![producer])
    }

    /// Overrides the computation mode.
    #[must_use]
    pub fn mode(mut self, mode: ComputationMode) -> Self {
        self.spec.mode = mode;
        self
    }

    /// Adds an observer of the step's reported values.
    #[must_use]
    pub fn callback(mut self, callback: Arc<dyn Callback>) -> Self {
        self.spec.callbacks.push(callback);
        self
    }

    /// Requests a display name instead of the module name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.spec.name = Some(name.into());
        self
    }

    /// Validates the step and adds it to the pipeline.
    pub fn add(self) -> Result<NodeId, WattflowError> {
        self.pipeline.add_step(self.spec)
    }
}
