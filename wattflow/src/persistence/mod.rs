//! Pipeline persistence: a topology descriptor plus one blob per module.

mod descriptor;
mod folder;

pub use descriptor::{
    ModuleRecord, NodeRecord, PipelineDescriptor, FORMAT_VERSION, MODULES_DIR, MODULE_FILE,
};
pub use folder::checksum;
pub(crate) use folder::{load, save, LoadedParts, SaveRequest};
