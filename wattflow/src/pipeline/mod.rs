//! The pipeline surface: building, training, testing and persisting.

mod builder;
mod runtime;
mod sub_pipeline;
mod summary;

#[cfg(test)]
mod integration_tests;

pub use builder::StepBuilder;
pub use runtime::{Pipeline, TestOutcome};
pub use sub_pipeline::SubPipeline;
pub use summary::{StepSummary, Summary};
