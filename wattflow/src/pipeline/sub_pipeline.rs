//! A whole pipeline used as one module of another.

use super::Pipeline;
use crate::core::{Dataset, TimeSeries};
use crate::errors::{ModuleError, WattflowError};
use crate::events::NoOpEventSink;
use crate::graph::{EdgeKind, Node};
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Folder holding the inner pipeline, inside the module's blob directory.
const INNER_DIR: &str = "pipeline";

/// Where the inner pipeline's descriptor lives.
#[derive(Debug, Serialize, Deserialize)]
struct NestedFolder {
    descriptor_file: String,
}

/// Wraps a pipeline so it can be a step elsewhere.
///
/// Bound inputs and targets become data columns of the inner pipeline. The
/// computational argument names are the inner placeholder columns read as
/// inputs; placeholders read only as targets are bound as targets. Fitting
/// trains the inner pipeline; transforming runs an incremental test pass on it.
#[derive(Debug)]
pub struct SubPipeline {
    name: String,
    pipeline: Pipeline,
    output: Option<String>,
}

impl SubPipeline {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "wattflow.sub_pipeline";

    /// Wraps `pipeline`. The module takes the pipeline's name.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            name: pipeline.name().to_string(),
            pipeline,
            output: None,
        }
    }

    /// Picks which inner step's output is returned when there are several sinks.
    #[must_use]
    pub fn with_output(mut self, step: impl Into<String>) -> Self {
        self.output = Some(step.into());
        self
    }

    /// Returns the inner pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Registry loader; the inner pipeline lives in the blob directory.
    pub fn load(
        descriptor: &ModuleDescriptor,
        dir: &Path,
        registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let pipeline = match descriptor.state_as::<NestedFolder>()? {
            Some(nested) => Pipeline::from_folder_with(
                dir.join(INNER_DIR),
                &nested.descriptor_file,
                registry,
                Arc::new(NoOpEventSink),
            ),
            None => Pipeline::from_folder(dir.join(INNER_DIR), registry),
        }
        .map_err(inner_error)?;
        let mut module = Self::new(pipeline);
        module.name.clone_from(&descriptor.name);
        module.set_params(&descriptor.params)?;
        Ok(SharedModule::new(module))
    }
}

fn inner_error(err: WattflowError) -> ModuleError {
    ModuleError::Other(anyhow::Error::new(err))
}

fn dataset(parts: &[&ModuleInputs]) -> Dataset {
    parts
        .iter()
        .flat_map(|inputs| inputs.iter())
        .map(|(name, series)| (name.to_string(), series.clone()))
        .collect()
}

impl Module for SubPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn input_names(&self) -> Option<Vec<String>> {
        let graph = self.pipeline.graph();
        let read: BTreeSet<String> = graph
            .steps()
            .flat_map(|step| step.bindings())
            .filter(|binding| binding.kind != EdgeKind::Target)
            .flat_map(|binding| binding.producers.iter())
            .filter_map(|&id| match graph.node(id) {
                Some(Node::Input(input)) => Some(input.column.clone()),
                _ => None,
            })
            .collect();
        Some(read.into_iter().collect())
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(output) = &self.output {
            params.insert("output".into(), json!(output));
        }
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError> {
        if let Some(value) = params.get("output") {
            let output = value
                .as_str()
                .ok_or_else(|| ModuleError::invalid_parameter("output", "expected a step name"))?;
            self.output = Some(output.to_string());
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.pipeline.is_fitted()
    }

    fn fit(&mut self, inputs: &ModuleInputs, targets: &ModuleInputs) -> Result<(), ModuleError> {
        self.pipeline
            .train(&dataset(&[inputs, targets]))
            .map_err(inner_error)?;
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        let outcome = self
            .pipeline
            .test(&dataset(&[inputs]), false, false)
            .map_err(inner_error)?;
        let selected = match &self.output {
            Some(step) => outcome.get(step),
            None if outcome.outputs.len() == 1 => outcome.outputs.values().next().map(AsRef::as_ref),
            None => {
                return Err(ModuleError::computation(format!(
                    "sub-pipeline '{}' produced {} outputs; choose one with with_output",
                    self.name,
                    outcome.outputs.len()
                )))
            }
        };
        selected.cloned().ok_or_else(|| {
            ModuleError::computation(format!("sub-pipeline '{}' produced no output", self.name))
        })
    }

    fn reset(&mut self) {
        self.pipeline.reset();
    }

    fn save(&self, dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        self.pipeline
            .to_folder(dir.join(INNER_DIR))
            .map_err(inner_error)?;
        let nested = NestedFolder {
            descriptor_file: self.pipeline.config().descriptor_file.clone(),
        };
        Ok(ModuleDescriptor::new(Self::TYPE_TAG, &self.name, self.get_params())
            .with_state(serde_json::to_value(nested)?))
    }
}
