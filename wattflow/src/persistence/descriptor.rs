//! The topology descriptor written as `pipeline.json`.

use crate::condition::ConditionDescriptor;
use crate::config::PipelineConfig;
use crate::core::ComputationMode;
use crate::graph::Binding;
use crate::module::Params;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current descriptor format.
pub const FORMAT_VERSION: u32 = 1;

/// Name of the blob file inside each module directory.
pub const MODULE_FILE: &str = "module.json";

/// Directory holding module blobs.
pub const MODULES_DIR: &str = "modules";

/// Everything needed to rebuild a pipeline except module state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    /// Descriptor format version.
    pub format_version: u32,
    /// Pipeline name.
    pub name: String,
    /// Pipeline configuration.
    #[serde(default)]
    pub config: PipelineConfig,
    /// End of the last tested window.
    #[serde(default)]
    pub cursor: Option<DateTime<Utc>>,
    /// One record per distinct module instance.
    pub modules: Vec<ModuleRecord>,
    /// One record per node, in id order.
    pub nodes: Vec<NodeRecord>,
}

/// Where a module blob lives and how to check it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Position in the module list; steps refer to modules by it.
    pub id: usize,
    /// Registry tag of the module type.
    pub type_tag: String,
    /// Module name.
    pub name: String,
    /// Constructor parameters, as also written to the blob.
    #[serde(default)]
    pub params: Params,
    /// Blob directory, relative to the pipeline folder.
    pub path: String,
    /// Hex SHA-256 of the blob's `module.json`.
    pub checksum: String,
}

/// A persisted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRecord {
    /// An input placeholder.
    Input {
        /// Node id.
        id: u32,
        /// Dataset column.
        column: String,
    },
    /// A step.
    Step {
        /// Node id.
        id: u32,
        /// Display name.
        name: String,
        /// Index into the module list.
        module: usize,
        /// Input bindings.
        bindings: Vec<Binding>,
        /// Condition, if the step is conditional.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        condition: Option<ConditionDescriptor>,
        /// Mode override.
        #[serde(default)]
        mode: ComputationMode,
    },
}

impl NodeRecord {
    /// Returns the node id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::Input { id, .. } | Self::Step { id, .. } => *id,
        }
    }
}
