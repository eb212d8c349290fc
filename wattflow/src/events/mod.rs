//! Event sink system for observability.
//!
//! The scheduler and persistence layer report progress through an
//! [`EventSink`]. Event names are collected in [`names`].

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event type names emitted by the engine.
pub mod names {
    /// A training pass started.
    pub const TRAIN_STARTED: &str = "pipeline.train.started";
    /// A training pass completed.
    pub const TRAIN_COMPLETED: &str = "pipeline.train.completed";
    /// A test pass started.
    pub const TEST_STARTED: &str = "pipeline.test.started";
    /// A test pass completed.
    pub const TEST_COMPLETED: &str = "pipeline.test.completed";
    /// A step started executing.
    pub const STEP_STARTED: &str = "step.started";
    /// A step produced a value.
    pub const STEP_COMPLETED: &str = "step.completed";
    /// A step fitted its module.
    pub const STEP_FITTED: &str = "step.fitted";
    /// A step was skipped.
    pub const STEP_SKIPPED: &str = "step.skipped";
    /// A step result was served from the result store.
    pub const STEP_CACHED: &str = "step.cached";
    /// A step failed.
    pub const STEP_FAILED: &str = "step.failed";
    /// A pipeline was saved.
    pub const PIPELINE_SAVED: &str = "pipeline.saved";
    /// A pipeline was loaded.
    pub const PIPELINE_LOADED: &str = "pipeline.loaded";
}
