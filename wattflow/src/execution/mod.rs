//! Pass execution: mode resolution, the result store and the scheduler.

mod report;
mod resolver;
mod scheduler;
mod store;

pub use report::RunReport;
pub use resolver::{resolve_mode, RunKind};
pub(crate) use scheduler::{PassRequest, Scheduler};
pub use store::ResultStore;
