//! The pipeline: graph construction, training, testing and persistence.

use super::{StepBuilder, Summary};
use crate::callbacks::Callback;
use crate::config::PipelineConfig;
use crate::core::{Dataset, ExecutionWindow, TimeSeries};
use crate::errors::WattflowError;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::execution::{PassRequest, ResultStore, RunKind, RunReport, Scheduler};
use crate::graph::{ComputationalGraph, NodeId, StepSpec, TargetGraph};
use crate::module::SharedModule;
use crate::persistence::{self, LoadedParts, SaveRequest};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// What a test pass returns.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    /// Values of the requested steps by display name. Skipped steps are absent.
    pub outputs: BTreeMap<String, Arc<TimeSeries>>,
    /// Summary of the accumulated history, when requested.
    pub summary: Option<Summary>,
    /// Details of the pass.
    pub report: RunReport,
}

impl TestOutcome {
    /// Returns the output of one step.
    #[must_use]
    pub fn get(&self, step: &str) -> Option<&TimeSeries> {
        self.outputs.get(step).map(AsRef::as_ref)
    }
}

/// A graph of steps over time-indexed data, with the state of its test passes.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    config: PipelineConfig,
    graph: ComputationalGraph,
    targets: TargetGraph,
    store: ResultStore,
    sink: Arc<dyn EventSink>,
    callbacks: Vec<Arc<dyn Callback>>,
    history: BTreeMap<String, TimeSeries>,
    cursor: Option<DateTime<Utc>>,
    last_report: Option<RunReport>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PipelineConfig::default(),
            graph: ComputationalGraph::new(),
            targets: TargetGraph::new(),
            store: ResultStore::new(),
            sink: Arc::new(NoOpEventSink),
            callbacks: Vec::new(),
            history: BTreeMap::new(),
            cursor: None,
            last_report: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the computational graph.
    #[must_use]
    pub const fn graph(&self) -> &ComputationalGraph {
        &self.graph
    }

    /// Returns the target graph.
    #[must_use]
    pub const fn target_graph(&self) -> &TargetGraph {
        &self.targets
    }

    /// Returns the result store.
    #[must_use]
    pub const fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Returns the end of the last tested window.
    #[must_use]
    pub const fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Returns the report of the last pass.
    #[must_use]
    pub const fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Returns the id of the step with display name `name`.
    #[must_use]
    pub fn step_id(&self, name: &str) -> Option<NodeId> {
        self.graph.step_by_name(name).map(|step| step.id())
    }

    /// Returns the placeholder for data column `column`.
    pub fn input(&mut self, column: impl Into<String>) -> NodeId {
        let id = self.graph.add_input(column);
        self.targets.sync_nodes(self.graph.node_count());
        id
    }

    /// Starts wiring a step around `module`.
    pub fn step(&mut self, module: &SharedModule) -> StepBuilder<'_> {
        StepBuilder::new(self, module.clone())
    }

    /// Adds a fully described step.
    pub fn add_step(&mut self, spec: StepSpec) -> Result<NodeId, WattflowError> {
        let id = self.graph.add_step(spec)?;
        self.targets.sync_nodes(self.graph.node_count());
        if let Some(step) = self.graph.step(id) {
            self.targets.add_step(step);
            debug!(pipeline = %self.name, step = %step.name(), id = %id, "Step added");
        }
        Ok(id)
    }

    /// Adds a callback observing the output of every sink during test passes.
    pub fn add_callback(&mut self, callback: Arc<dyn Callback>) {
        self.callbacks.push(callback);
    }

    /// Returns every distinct module instance, in first-use order.
    #[must_use]
    pub fn modules(&self) -> Vec<SharedModule> {
        let mut seen = HashSet::new();
        self.graph
            .steps()
            .filter(|step| seen.insert(step.module().identity()))
            .map(|step| step.module().clone())
            .collect()
    }

    /// Returns true if every module reports itself fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.modules().iter().all(|module| module.lock().is_fitted())
    }

    /// Trains on the full extent of `data`.
    pub fn train(&mut self, data: &Dataset) -> Result<RunReport, WattflowError> {
        let window = full_window(data)?;
        self.train_window(data, window)
    }

    /// Trains on `window`, fitting every module reachable from the sinks.
    ///
    /// Module buffers are reset first and the result store is empty
    /// afterwards, so a following test pass starts clean.
    pub fn train_window(
        &mut self,
        data: &Dataset,
        window: ExecutionWindow,
    ) -> Result<RunReport, WattflowError> {
        info!(pipeline = %self.name, window = %window, "Training pipeline");
        self.sink.emit(
            names::TRAIN_STARTED,
            Some(json!({ "pipeline": self.name, "window": window.to_string() })),
        );
        for module in self.modules() {
            module.lock().reset();
        }
        self.store.clear();

        let requested = self.graph.sinks();
        let request = PassRequest {
            kind: RunKind::Train,
            window,
            data,
            requested: &requested,
        };
        let result = Scheduler::new(&self.graph, &self.targets, self.sink.as_ref())
            .run(&request, &mut self.store);
        self.store.clear();
        let report = result?;

        self.sink.emit(
            names::TRAIN_COMPLETED,
            Some(json!({
                "pipeline": self.name,
                "fitted": report.fitted.len(),
                "duration_ms": report.duration_ms,
            })),
        );
        info!(
            pipeline = %self.name,
            fitted = report.fitted.len(),
            duration_ms = report.duration_ms,
            "Training complete"
        );
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Tests on the full extent of `data`.
    ///
    /// With `reset`, module buffers, cached results, history and the cursor
    /// are cleared first. Without it, state carries over from earlier passes.
    pub fn test(
        &mut self,
        data: &Dataset,
        reset: bool,
        summary: bool,
    ) -> Result<TestOutcome, WattflowError> {
        let window = full_window(data)?;
        self.test_window(data, window, reset, summary)
    }

    /// Tests on `window`.
    ///
    /// Cached results are keyed by node and window only. Without `reset`,
    /// testing the same window again returns the cached outputs even when
    /// `data` holds different values for it; pass `reset` after swapping
    /// datasets.
    pub fn test_window(
        &mut self,
        data: &Dataset,
        window: ExecutionWindow,
        reset: bool,
        summary: bool,
    ) -> Result<TestOutcome, WattflowError> {
        if reset {
            self.reset();
        } else if !self.config.retain_results {
            self.store.retain_window(&window);
        }
        info!(pipeline = %self.name, window = %window, reset, "Testing pipeline");
        self.sink.emit(
            names::TEST_STARTED,
            Some(json!({ "pipeline": self.name, "window": window.to_string(), "reset": reset })),
        );

        let requested = self.graph.sinks();
        let request = PassRequest {
            kind: RunKind::Test,
            window,
            data,
            requested: &requested,
        };
        let report = Scheduler::new(&self.graph, &self.targets, self.sink.as_ref())
            .run(&request, &mut self.store)?;

        let mut outputs = BTreeMap::new();
        for (&id, output) in &report.outputs {
            let (Some(step), Some(value)) = (self.graph.step(id), output.series()) else {
                continue;
            };
            if !report.modes.get(&id).is_some_and(|mode| mode.reports_value()) {
                continue;
            }
            for callback in &self.callbacks {
                callback.on_output(step.name(), &window, value);
            }
            outputs.insert(step.name().to_string(), Arc::clone(value));
        }
        if self.config.accumulate_history {
            self.accumulate(&report);
        }
        self.cursor = Some(self.cursor.map_or(window.end(), |c| c.max(window.end())));

        self.sink.emit(
            names::TEST_COMPLETED,
            Some(json!({
                "pipeline": self.name,
                "outputs": outputs.len(),
                "skipped": report.skipped.len(),
                "duration_ms": report.duration_ms,
            })),
        );
        self.last_report = Some(report.clone());
        Ok(TestOutcome {
            outputs,
            summary: summary.then(|| self.create_summary()),
            report,
        })
    }

    /// Tests the points of `data` after the cursor, `batch_size` timestamps
    /// at a time, carrying state between batches.
    ///
    /// The concatenated outputs match one batched test over the same points.
    pub fn test_online(
        &mut self,
        data: &Dataset,
        batch_size: usize,
    ) -> Result<Vec<TestOutcome>, WattflowError> {
        let pending: Vec<DateTime<Utc>> = data
            .timestamps()
            .into_iter()
            .filter(|ts| self.cursor.map_or(true, |cursor| *ts > cursor))
            .collect();
        debug!(pipeline = %self.name, points = pending.len(), batch_size, "Online test");

        let mut outcomes = Vec::new();
        for batch in pending.chunks(batch_size.max(1)) {
            let (Some(&first), Some(&last)) = (batch.first(), batch.last()) else {
                continue;
            };
            let window = ExecutionWindow::new(first, last)?;
            outcomes.push(self.test_window(data, window, false, false)?);
        }
        Ok(outcomes)
    }

    /// Summarizes every value reported since the last reset.
    #[must_use]
    pub fn create_summary(&self) -> Summary {
        Summary::from_history(&self.name, self.cursor, &self.history)
    }

    /// Clears module buffers, cached results, history and the cursor.
    pub fn reset(&mut self) {
        for module in self.modules() {
            module.lock().reset();
        }
        self.store.clear();
        self.history.clear();
        self.cursor = None;
    }

    /// Saves the pipeline to `dir`.
    pub fn to_folder(&self, dir: impl AsRef<Path>) -> Result<(), WattflowError> {
        let dir = dir.as_ref();
        let written = persistence::save(
            &SaveRequest {
                name: &self.name,
                config: &self.config,
                cursor: self.cursor,
                graph: &self.graph,
            },
            dir,
        )?;
        self.sink.emit(
            names::PIPELINE_SAVED,
            Some(json!({ "pipeline": self.name, "path": dir.display().to_string(), "modules": written })),
        );
        Ok(())
    }

    /// Loads a pipeline saved with [`Pipeline::to_folder`].
    pub fn from_folder(dir: impl AsRef<Path>, registry: &Registry) -> Result<Self, WattflowError> {
        let file = PipelineConfig::default().descriptor_file;
        Self::from_folder_with(dir, &file, registry, Arc::new(NoOpEventSink))
    }

    /// Loads a pipeline whose descriptor has a non-default file name,
    /// attaching `sink` to it.
    pub fn from_folder_with(
        dir: impl AsRef<Path>,
        descriptor_file: &str,
        registry: &Registry,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, WattflowError> {
        let dir = dir.as_ref();
        let LoadedParts {
            name,
            config,
            cursor,
            graph,
        } = persistence::load(dir, descriptor_file, registry)?;

        let mut targets = TargetGraph::new();
        targets.sync_nodes(graph.node_count());
        for step in graph.steps() {
            targets.add_step(step);
        }
        let mut pipeline = Self::new(name).with_config(config).with_event_sink(sink);
        pipeline.graph = graph;
        pipeline.targets = targets;
        pipeline.cursor = cursor;
        pipeline.sink.emit(
            names::PIPELINE_LOADED,
            Some(json!({
                "pipeline": pipeline.name,
                "path": dir.display().to_string(),
                "nodes": pipeline.graph.node_count(),
            })),
        );
        Ok(pipeline)
    }

    fn accumulate(&mut self, report: &RunReport) {
        for step in self.graph.steps() {
            if !report.modes.get(&step.id()).is_some_and(|mode| mode.reports_value()) {
                continue;
            }
            let Some(value) = self.store.get(step.id(), &report.window).and_then(|o| o.series()) else {
                continue;
            };
            let merged = match self.history.get(step.name()) {
                Some(existing) => existing.append(value),
                None => value.as_ref().clone(),
            };
            self.history.insert(step.name().to_string(), merged);
        }
    }
}

fn full_window(data: &Dataset) -> Result<ExecutionWindow, WattflowError> {
    data.full_window()
        .ok_or_else(|| WattflowError::InvalidWindow("dataset has no timestamps".into()))
}
