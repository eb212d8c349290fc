//! Writing pipelines to folders and reading them back.
//!
//! Layout:
//!
//! ```text
//! <dir>/pipeline.json            topology descriptor
//! <dir>/modules/<n>/module.json  one blob per distinct module instance
//! ```
//!
//! Steps sharing one module instance share one blob, so the instance is
//! shared again after loading.

use super::descriptor::{
    ModuleRecord, NodeRecord, PipelineDescriptor, FORMAT_VERSION, MODULES_DIR, MODULE_FILE,
};
use crate::config::PipelineConfig;
use crate::errors::{CorruptPipelineError, WattflowError};
use crate::graph::{ComputationalGraph, InputNode, Node, NodeId, Step, StepSpec};
use crate::module::{ModuleDescriptor, SharedModule};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A pipeline's persisted parts, before it is reassembled.
#[derive(Debug)]
pub(crate) struct LoadedParts {
    pub name: String,
    pub config: PipelineConfig,
    pub cursor: Option<DateTime<Utc>>,
    pub graph: ComputationalGraph,
}

/// What the folder writer needs from a pipeline.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SaveRequest<'a> {
    pub name: &'a str,
    pub config: &'a PipelineConfig,
    pub cursor: Option<DateTime<Utc>>,
    pub graph: &'a ComputationalGraph,
}

/// Hex SHA-256 of a blob.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Writes the pipeline to `dir`, creating it if needed. Returns the number
/// of module blobs written.
pub(crate) fn save(request: &SaveRequest<'_>, dir: &Path) -> Result<usize, WattflowError> {
    fs::create_dir_all(dir.join(MODULES_DIR))?;

    let mut modules: Vec<ModuleRecord> = Vec::new();
    let mut by_identity: HashMap<usize, usize> = HashMap::new();
    let mut nodes = Vec::with_capacity(request.graph.node_count());

    for node in request.graph.nodes() {
        match node {
            Node::Input(input) => nodes.push(NodeRecord::Input {
                id: input.id.raw(),
                column: input.column.clone(),
            }),
            Node::Step(step) => {
                let identity = step.module().identity();
                let index = match by_identity.get(&identity) {
                    Some(&index) => index,
                    None => {
                        let index = modules.len();
                        modules.push(write_module(step, index, dir)?);
                        by_identity.insert(identity, index);
                        index
                    }
                };
                nodes.push(NodeRecord::Step {
                    id: step.id().raw(),
                    name: step.name().to_string(),
                    module: index,
                    bindings: step.bindings().to_vec(),
                    condition: step.condition().map(|c| c.describe()),
                    mode: step.mode_override(),
                });
            }
        }
    }

    let descriptor = PipelineDescriptor {
        format_version: FORMAT_VERSION,
        name: request.name.to_string(),
        config: request.config.clone(),
        cursor: request.cursor,
        modules,
        nodes,
    };
    let written = descriptor.modules.len();
    fs::write(
        dir.join(&request.config.descriptor_file),
        serde_json::to_vec_pretty(&descriptor)?,
    )?;
    info!(pipeline = %request.name, path = %dir.display(), modules = written, "Pipeline saved");
    Ok(written)
}

fn write_module(step: &Step, index: usize, dir: &Path) -> Result<ModuleRecord, WattflowError> {
    let relative = format!("{MODULES_DIR}/{index}");
    let blob_dir = dir.join(&relative);
    fs::create_dir_all(&blob_dir)?;

    let descriptor = {
        let module = step.module().lock();
        let label = module.name().to_string();
        module
            .save(&blob_dir)
            .map_err(|source| WattflowError::module(step.id(), step.name(), label, source))?
    };
    let bytes = serde_json::to_vec_pretty(&descriptor)?;
    fs::write(blob_dir.join(MODULE_FILE), &bytes)?;
    debug!(module = %descriptor.name, path = %relative, "Module blob written");

    Ok(ModuleRecord {
        id: index,
        type_tag: descriptor.type_tag,
        name: descriptor.name,
        params: descriptor.params,
        path: relative,
        checksum: checksum(&bytes),
    })
}

fn corrupt(dir: &Path, message: impl Into<String>) -> WattflowError {
    CorruptPipelineError::new(message).with_path(dir).into()
}

/// Reads a pipeline folder, validating it before anything is rebuilt.
pub(crate) fn load(
    dir: &Path,
    descriptor_file: &str,
    registry: &Registry,
) -> Result<LoadedParts, WattflowError> {
    let path = dir.join(descriptor_file);
    let bytes = fs::read(&path)
        .map_err(|err| corrupt(dir, format!("cannot read {descriptor_file}: {err}")))?;
    let descriptor: PipelineDescriptor = serde_json::from_slice(&bytes)
        .map_err(|err| corrupt(dir, format!("invalid {descriptor_file}: {err}")))?;
    if descriptor.format_version != FORMAT_VERSION {
        return Err(corrupt(
            dir,
            format!("unsupported format version {}", descriptor.format_version),
        ));
    }

    let verify = descriptor.config.verify_checksums;
    let modules = descriptor
        .modules
        .iter()
        .enumerate()
        .map(|(position, record)| load_module(dir, position, record, verify, registry))
        .collect::<Result<Vec<_>, _>>()?;

    let mut nodes: Vec<Node> = Vec::with_capacity(descriptor.nodes.len());
    let mut names: HashSet<String> = HashSet::new();
    for (position, record) in descriptor.nodes.iter().enumerate() {
        if NodeId::new(record.id()).index() != position {
            return Err(corrupt(
                dir,
                format!("node at position {position} has id {}", record.id()),
            ));
        }
        let id = NodeId::new(record.id());
        let node = match record {
            NodeRecord::Input { column, .. } => Node::Input(InputNode {
                id,
                column: column.clone(),
            }),
            NodeRecord::Step {
                name,
                module,
                bindings,
                condition,
                mode,
                ..
            } => {
                let shared = modules.get(*module).ok_or_else(|| {
                    corrupt(dir, format!("step '{name}' refers to unknown module {module}"))
                })?;
                for binding in bindings {
                    if let Some(bad) = binding.producers.iter().find(|p| p.index() >= position) {
                        return Err(corrupt(
                            dir,
                            format!("input '{}' of step '{name}' refers to unknown node {bad}", binding.name),
                        ));
                    }
                }
                if !names.insert(name.clone()) {
                    return Err(corrupt(dir, format!("step name '{name}' is used twice")));
                }
                let condition = condition
                    .as_ref()
                    .map(|c| registry.load_condition(c))
                    .transpose()?;

                let mut spec = StepSpec::new(shared.clone());
                spec.bindings.clone_from(bindings);
                spec.validate()
                    .map_err(|err| corrupt(dir, format!("step '{name}': {err}")))?;

                Node::Step(Step {
                    id,
                    name: name.clone(),
                    module: shared.clone(),
                    bindings: bindings.clone(),
                    condition,
                    mode: *mode,
                    callbacks: Vec::new(),
                })
            }
        };
        nodes.push(node);
    }

    let graph = ComputationalGraph::from_nodes(nodes);
    graph
        .validate()
        .map_err(|err| corrupt(dir, err.to_string()))?;
    info!(
        pipeline = %descriptor.name,
        path = %dir.display(),
        nodes = graph.node_count(),
        modules = modules.len(),
        "Pipeline loaded"
    );

    Ok(LoadedParts {
        name: descriptor.name,
        config: descriptor.config,
        cursor: descriptor.cursor,
        graph,
    })
}

fn load_module(
    dir: &Path,
    position: usize,
    record: &ModuleRecord,
    verify: bool,
    registry: &Registry,
) -> Result<SharedModule, WattflowError> {
    if record.id != position {
        return Err(corrupt(
            dir,
            format!("module at position {position} has id {}", record.id),
        ));
    }
    let blob_dir = dir.join(&record.path);
    let bytes = fs::read(blob_dir.join(MODULE_FILE)).map_err(|err| {
        corrupt(dir, format!("module blob '{}' is missing: {err}", record.path))
    })?;
    if verify && checksum(&bytes) != record.checksum {
        return Err(corrupt(
            dir,
            format!("checksum mismatch for module blob '{}'", record.path),
        ));
    }
    let descriptor: ModuleDescriptor = serde_json::from_slice(&bytes)
        .map_err(|err| corrupt(dir, format!("invalid module blob '{}': {err}", record.path)))?;
    if descriptor.type_tag != record.type_tag {
        return Err(corrupt(
            dir,
            format!(
                "module blob '{}' has type '{}', expected '{}'",
                record.path, descriptor.type_tag, record.type_tag
            ),
        ));
    }
    if descriptor.params != record.params {
        return Err(corrupt(
            dir,
            format!("module blob '{}' disagrees with its recorded parameters", record.path),
        ));
    }
    registry.load_module(&descriptor, &blob_dir)
}
