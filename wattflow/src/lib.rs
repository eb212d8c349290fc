//! # Wattflow
//!
//! An orchestration engine for pipelines of time-indexed fit/transform
//! modules.
//!
//! Wattflow runs a directed acyclic graph of steps over time series data:
//!
//! - **Steps and modules**: each step wraps a module that may be fitted on
//!   targets and then transforms its inputs
//! - **Three edge kinds**: computational inputs, targets read only while
//!   fitting, and conditional inputs read only by a step's condition
//! - **Lazy scheduling**: only the ancestors of the requested steps run, each
//!   at most once per window, with results cached per window
//! - **Online testing**: incremental passes that keep module buffers and
//!   match one batched pass over the same data
//! - **Persistence**: pipelines saved to a folder and rebuilt through a
//!   registry of module loaders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wattflow::prelude::*;
//!
//! let mut pipeline = Pipeline::new("forecast");
//! let load = pipeline.input("load");
//! let lag = pipeline
//!     .step(&SharedModule::new(ClockShift::new("lag", 24)?))
//!     .input("x", load)
//!     .add()?;
//! pipeline
//!     .step(&SharedModule::new(LinearRegression::new("regression")))
//!     .input("lag", lag)
//!     .target("y", load)
//!     .add()?;
//!
//! pipeline.train(&train_data)?;
//! let outcome = pipeline.test(&test_data, true, true)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod callbacks;
pub mod condition;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod execution;
pub mod graph;
pub mod module;
pub mod modules;
pub mod observability;
pub mod persistence;
pub mod pipeline;
pub mod registry;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::callbacks::{Callback, CollectingCallback, LoggingCallback};
    pub use crate::condition::{Condition, HourOfDay, Not, ValueAbove};
    pub use crate::config::PipelineConfig;
    pub use crate::core::{
        ComputationMode, Dataset, ExecutionWindow, StepOutput, StepStatus, TimeSeries,
    };
    pub use crate::errors::{
        CorruptPipelineError, MissingInputError, ModuleError, NotFittedError, WattflowError,
        WrongParameterError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::execution::{RunKind, RunReport};
    pub use crate::graph::{EdgeKind, NodeId};
    pub use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
    pub use crate::modules::{
        ClockShift, LinearRegression, RollingRmse, StandardScaler, SyntheticConceptDrift,
    };
    pub use crate::pipeline::{Pipeline, StepBuilder, SubPipeline, Summary, TestOutcome};
    pub use crate::registry::Registry;
}
