//! Graph nodes: input placeholders and steps.

use super::{Binding, EdgeKind, NodeId};
use crate::callbacks::Callback;
use crate::condition::Condition;
use crate::core::{ComputationMode, ExecutionWindow, StepOutput};
use crate::errors::{ModuleError, NotFittedError, WattflowError, WrongParameterError};
use crate::module::{ModuleInputs, SharedModule};
use std::sync::Arc;

/// A node of the computational graph.
#[derive(Debug, Clone)]
pub enum Node {
    /// Stands for one raw data column.
    Input(InputNode),
    /// Wraps one module.
    Step(Step),
}

impl Node {
    /// Returns the node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        match self {
            Self::Input(input) => input.id,
            Self::Step(step) => step.id,
        }
    }

    /// Returns the display name (column name for placeholders).
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Input(input) => &input.column,
            Self::Step(step) => &step.name,
        }
    }

    /// Returns the step, if this node is one.
    #[must_use]
    pub const fn as_step(&self) -> Option<&Step> {
        match self {
            Self::Step(step) => Some(step),
            Self::Input(_) => None,
        }
    }
}

/// Placeholder node standing for a raw data column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputNode {
    /// The node id.
    pub id: NodeId,
    /// The dataset column this placeholder reads.
    pub column: String,
}

/// Everything needed to add a step to the graph.
#[derive(Debug, Clone)]
pub struct StepSpec {
    /// Requested display name; defaults to the module name.
    pub name: Option<String>,
    /// The wrapped module.
    pub module: SharedModule,
    /// Input bindings of all kinds.
    pub bindings: Vec<Binding>,
    /// Optional predicate gating execution.
    pub condition: Option<Arc<dyn Condition>>,
    /// Mode override; `Default` lets the engine decide.
    pub mode: ComputationMode,
    /// Observers of the step's reported values.
    pub callbacks: Vec<Arc<dyn Callback>>,
}

impl StepSpec {
    /// Creates a spec with no bindings.
    #[must_use]
    pub fn new(module: SharedModule) -> Self {
        Self {
            name: None,
            module,
            bindings: Vec::new(),
            condition: None,
            mode: ComputationMode::Default,
            callbacks: Vec::new(),
        }
    }

    /// Validates the spec on its own, before it meets the graph.
    pub fn validate(&self) -> Result<(), WrongParameterError> {
        let module_name = self.module.name();

        if !self.bindings.iter().any(|b| b.kind == EdgeKind::Computational) {
            return Err(WrongParameterError::new(format!(
                "step for module '{module_name}' needs at least one computational input"
            ))
            .with_module(&module_name)
            .with_fix_hint("Bind at least one input with .input(name, producer)."));
        }

        for binding in &self.bindings {
            if binding.producers.is_empty() {
                return Err(WrongParameterError::new(format!(
                    "{} input '{}' of module '{module_name}' has no producer",
                    binding.kind, binding.name
                ))
                .with_module(&module_name));
            }
        }

        let mut argument_names: Vec<&str> = self
            .bindings
            .iter()
            .filter(|b| b.kind != EdgeKind::Target)
            .map(|b| b.name.as_str())
            .collect();
        let mut target_names: Vec<&str> = self
            .bindings
            .iter()
            .filter(|b| b.kind == EdgeKind::Target)
            .map(|b| b.name.as_str())
            .collect();
        for names in [&mut argument_names, &mut target_names] {
            names.sort_unstable();
            if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
                return Err(WrongParameterError::new(format!(
                    "input '{}' of module '{module_name}' is bound twice",
                    pair[0]
                ))
                .with_module(&module_name)
                .with_fix_hint("Bind several producers to one name with .input_any(name, producers)."));
            }
        }

        if let Some(expected) = self.module.lock().input_names() {
            let mut expected: Vec<String> = expected;
            expected.sort_unstable();
            let mut given: Vec<String> = self
                .bindings
                .iter()
                .filter(|b| b.kind == EdgeKind::Computational)
                .map(|b| b.name.clone())
                .collect();
            given.sort_unstable();
            if expected != given {
                return Err(WrongParameterError::new(format!(
                    "module '{module_name}' expects inputs {expected:?} but was given {given:?}"
                ))
                .with_module(&module_name));
            }
        }

        Ok(())
    }
}

/// A node wrapping one module, its input bindings and execution options.
#[derive(Debug, Clone)]
pub struct Step {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) module: SharedModule,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) condition: Option<Arc<dyn Condition>>,
    pub(crate) mode: ComputationMode,
    pub(crate) callbacks: Vec<Arc<dyn Callback>>,
}

impl Step {
    /// Returns the step id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the unique display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the wrapped module handle.
    #[must_use]
    pub const fn module(&self) -> &SharedModule {
        &self.module
    }

    /// Returns all bindings.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Returns the bindings of one kind.
    pub fn bindings_of(&self, kind: EdgeKind) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(move |b| b.kind == kind)
    }

    /// Returns the condition, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&Arc<dyn Condition>> {
        self.condition.as_ref()
    }

    /// Returns the mode override.
    #[must_use]
    pub const fn mode_override(&self) -> ComputationMode {
        self.mode
    }

    /// Returns the attached callbacks.
    #[must_use]
    pub fn callbacks(&self) -> &[Arc<dyn Callback>] {
        &self.callbacks
    }

    /// Returns true if the step has at least one target binding.
    #[must_use]
    pub fn has_targets(&self) -> bool {
        self.bindings_of(EdgeKind::Target).next().is_some()
    }

    /// Evaluates the condition. Unconditional steps always run.
    #[must_use]
    pub fn should_run(&self, inputs: &ModuleInputs, window: &ExecutionWindow) -> bool {
        self.condition
            .as_ref()
            .map_or(true, |condition| condition.evaluate(inputs, window))
    }

    /// Runs the module in `mode`.
    ///
    /// `fit` is false when the shared module was already fitted in this
    /// pass. In `Train` mode a value is computed only when `value_needed`.
    pub(crate) fn execute(
        &self,
        mode: ComputationMode,
        inputs: &ModuleInputs,
        targets: &ModuleInputs,
        fit: bool,
        value_needed: bool,
    ) -> Result<StepOutput, WattflowError> {
        let mut module = self.module.lock();
        let module_label = module.name().to_string();
        let wrap = |source: ModuleError| {
            WattflowError::module(self.id, &self.name, module_label.clone(), source)
        };

        if mode.fits() && fit {
            module.fit(inputs, targets).map_err(wrap)?;
        }

        match mode {
            ComputationMode::Train => {
                if value_needed {
                    let value = module.transform(inputs).map_err(wrap)?;
                    Ok(StepOutput::fitted(Some(value)))
                } else {
                    Ok(StepOutput::fitted(None))
                }
            }
            ComputationMode::FitTransform => {
                let value = module.transform(inputs).map_err(wrap)?;
                Ok(StepOutput::value(value))
            }
            ComputationMode::Transform | ComputationMode::Default => {
                if !module.is_fitted() {
                    return Err(NotFittedError::new(self.id, &self.name, module_label).into());
                }
                let value = module.transform(inputs).map_err(wrap)?;
                Ok(StepOutput::value(value))
            }
        }
    }
}
