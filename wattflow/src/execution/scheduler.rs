//! The scheduler: runs the ancestor closure of the requested steps for one
//! window, in dependency order, caching every output.

use super::{resolve_mode, ResultStore, RunKind, RunReport};
use crate::core::{ComputationMode, Dataset, ExecutionWindow, StepOutput, TimeSeries};
use crate::errors::{MissingInputError, WattflowError};
use crate::events::{names, EventSink};
use crate::graph::{Binding, ComputationalGraph, EdgeKind, InputNode, Node, NodeId, Step, TargetGraph};
use crate::module::ModuleInputs;
use crate::observability::SpanTimer;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info_span, warn};

/// One pass to run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PassRequest<'a> {
    pub kind: RunKind,
    pub window: ExecutionWindow,
    pub data: &'a Dataset,
    pub requested: &'a [NodeId],
}

/// Executes passes over a pipeline's graphs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scheduler<'a> {
    graph: &'a ComputationalGraph,
    targets: &'a TargetGraph,
    sink: &'a dyn EventSink,
}

impl<'a> Scheduler<'a> {
    pub(crate) const fn new(
        graph: &'a ComputationalGraph,
        targets: &'a TargetGraph,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            graph,
            targets,
            sink,
        }
    }

    /// Runs one pass, stopping at the first failure.
    pub(crate) fn run(
        &self,
        request: &PassRequest<'_>,
        store: &mut ResultStore,
    ) -> Result<RunReport, WattflowError> {
        let timer = SpanTimer::start(format!("pipeline.{}", request.kind));
        let mut report = RunReport::new(request.kind, request.window);
        let span = info_span!(
            "pipeline_pass",
            run_id = %report.run_id,
            kind = %request.kind,
            window = %request.window
        );
        let _enter = span.enter();

        report.modes = self
            .graph
            .steps()
            .map(|step| (step.id(), resolve_mode(step, request.kind, self.targets)))
            .collect();

        let closure = self.ancestor_closure(request, &report.modes, store);
        let value_needed = self.value_consumers(&closure, &report.modes, store, &request.window);
        let order = self.graph.topological_order(&closure)?;
        debug!(nodes = order.len(), "Resolved execution order");

        let mut fitted_modules: HashSet<usize> = HashSet::new();
        for id in order {
            if store.contains(id, &request.window) {
                if self.graph.step(id).is_some() {
                    report.cached.push(id);
                    self.emit(names::STEP_CACHED, id, &request.window, None);
                }
                continue;
            }
            match self.graph.node(id) {
                Some(Node::Input(input)) => {
                    let output = Self::read_column(input, request)?;
                    store.insert(id, request.window, output);
                }
                Some(Node::Step(step)) => {
                    let mode = report.modes.get(&id).copied().unwrap_or(ComputationMode::Transform);
                    let needed = value_needed.contains(&id);
                    match self.run_step(step, mode, needed, request, store, &mut fitted_modules, &mut report) {
                        Ok(output) => store.insert(id, request.window, output),
                        Err(err) => {
                            error!(step = %step.name(), error = %err, "Step failed");
                            self.emit(
                                names::STEP_FAILED,
                                id,
                                &request.window,
                                Some(json!({ "error": err.to_string() })),
                            );
                            return Err(err);
                        }
                    }
                }
                None => {}
            }
        }

        for &id in request.requested {
            if let Some(output) = store.get(id, &request.window) {
                report.outputs.insert(id, output.clone());
            }
        }
        report.duration_ms = timer.finish();
        Ok(report)
    }

    /// Collects the requested steps and everything they depend on.
    ///
    /// Target producers are followed only for steps that fit. Nodes already
    /// cached for the window are kept but not expanded.
    fn ancestor_closure(
        &self,
        request: &PassRequest<'_>,
        modes: &BTreeMap<NodeId, ComputationMode>,
        store: &ResultStore,
    ) -> BTreeSet<NodeId> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<NodeId> = request.requested.to_vec();
        while let Some(id) = stack.pop() {
            if !closure.insert(id) || store.contains(id, &request.window) {
                continue;
            }
            let Some(step) = self.graph.step(id) else {
                continue;
            };
            let fits = modes.get(&id).is_some_and(|mode| mode.fits());
            for binding in step.bindings() {
                if binding.kind != EdgeKind::Target || fits {
                    stack.extend(binding.producers.iter().copied());
                }
            }
        }
        closure
    }

    /// Returns the nodes whose value some pending consumer in the closure reads.
    fn value_consumers(
        &self,
        closure: &BTreeSet<NodeId>,
        modes: &BTreeMap<NodeId, ComputationMode>,
        store: &ResultStore,
        window: &ExecutionWindow,
    ) -> HashSet<NodeId> {
        let mut needed = HashSet::new();
        for &id in closure {
            if store.contains(id, window) {
                continue;
            }
            let Some(step) = self.graph.step(id) else {
                continue;
            };
            let fits = modes.get(&id).is_some_and(|mode| mode.fits());
            for binding in step.bindings() {
                if binding.kind != EdgeKind::Target || fits {
                    needed.extend(binding.producers.iter().copied());
                }
            }
        }
        needed
    }

    fn read_column(input: &InputNode, request: &PassRequest<'_>) -> Result<StepOutput, WattflowError> {
        let missing = || MissingInputError::new(input.id, &input.column, &input.column, request.window);
        let column = request.data.get(&input.column).ok_or_else(missing)?;
        let slice = column.slice(&request.window);
        if slice.is_empty() {
            return Err(missing().into());
        }
        Ok(StepOutput::value(slice))
    }

    #[allow(clippy::too_many_arguments)]
    fn run_step(
        &self,
        step: &Step,
        mode: ComputationMode,
        value_needed: bool,
        request: &PassRequest<'_>,
        store: &ResultStore,
        fitted_modules: &mut HashSet<usize>,
        report: &mut RunReport,
    ) -> Result<StepOutput, WattflowError> {
        let window = &request.window;
        let _enter = tracing::debug_span!("step", name = %step.name(), mode = %mode).entered();

        let Some(inputs) = Self::gather(step, EdgeKind::Computational, store, window)? else {
            return Ok(self.skip(step, window, "an input has no value", report));
        };
        let Some(conditional) = Self::gather(step, EdgeKind::Conditional, store, window)? else {
            return Ok(self.skip(step, window, "a conditional input has no value", report));
        };
        let targets = if mode.fits() {
            match Self::gather(step, EdgeKind::Target, store, window)? {
                Some(targets) => targets,
                None => return Ok(self.skip(step, window, "a target has no value", report)),
            }
        } else {
            ModuleInputs::new()
        };

        if !step.should_run(&inputs.merged(&conditional), window) {
            return Ok(self.skip(step, window, "condition evaluated to false", report));
        }

        let fit = mode.fits() && fitted_modules.insert(step.module().identity());
        if mode.fits() && !fit {
            debug!(step = %step.name(), "Module already fitted in this pass");
        }

        self.emit(names::STEP_STARTED, step.id(), window, Some(json!({ "mode": mode.to_string() })));
        let output = step.execute(mode, &inputs, &targets, fit, value_needed)?;
        report.executed.push(step.id());

        if fit {
            report.fitted.push(step.id());
            self.emit(names::STEP_FITTED, step.id(), window, None);
        }
        if let (true, Some(value)) = (mode.reports_value(), output.series()) {
            self.emit(
                names::STEP_COMPLETED,
                step.id(),
                window,
                Some(json!({ "points": value.len() })),
            );
            for callback in step.callbacks() {
                callback.on_output(step.name(), window, value);
            }
        }
        Ok(output)
    }

    /// Resolves every binding of `kind`. Returns `None` when some binding
    /// has only skipped producers.
    fn gather(
        step: &Step,
        kind: EdgeKind,
        store: &ResultStore,
        window: &ExecutionWindow,
    ) -> Result<Option<ModuleInputs>, WattflowError> {
        let mut inputs = ModuleInputs::new();
        for binding in step.bindings_of(kind) {
            match Self::resolve_binding(step, binding, store, window)? {
                Some(series) => inputs.insert(binding.name.clone(), series),
                None => return Ok(None),
            }
        }
        Ok(Some(inputs))
    }

    /// Picks the first producer holding a value for the window.
    fn resolve_binding(
        step: &Step,
        binding: &Binding,
        store: &ResultStore,
        window: &ExecutionWindow,
    ) -> Result<Option<Arc<TimeSeries>>, WattflowError> {
        for &producer in &binding.producers {
            match store.get(producer, window) {
                Some(output) if output.is_skipped() => {}
                Some(output) => {
                    if let Some(value) = output.series() {
                        return Ok(Some(Arc::clone(value)));
                    }
                    warn!(step = %step.name(), input = %binding.name, "Producer holds no value");
                    return Err(MissingInputError::new(step.id(), step.name(), &binding.name, window).into());
                }
                None => {
                    return Err(MissingInputError::new(step.id(), step.name(), &binding.name, window).into());
                }
            }
        }
        Ok(None)
    }

    fn skip(&self, step: &Step, window: &ExecutionWindow, reason: &str, report: &mut RunReport) -> StepOutput {
        debug!(step = %step.name(), reason = %reason, "Step skipped");
        report.skipped.push(step.id());
        self.emit(names::STEP_SKIPPED, step.id(), window, Some(json!({ "reason": reason })));
        StepOutput::skip(reason)
    }

    fn emit(&self, event_type: &str, id: NodeId, window: &ExecutionWindow, extra: Option<serde_json::Value>) {
        let name = self.graph.node(id).map_or("", Node::name);
        let mut data = json!({
            "node_id": id.raw(),
            "step": name,
            "window": window.to_string(),
        });
        if let (Some(serde_json::Value::Object(extra)), Some(map)) = (extra, data.as_object_mut()) {
            map.extend(extra);
        }
        self.sink.emit(event_type, Some(data));
    }
}
