//! Core domain model types for wattflow.
//!
//! This module contains the value types the engine moves around:
//! - Time series, datasets and execution windows
//! - Computation mode and step status enums
//! - Step output type with factory methods

mod dataset;
mod output;
mod series;
mod status;
mod window;

pub use dataset::Dataset;
pub use output::StepOutput;
pub use series::TimeSeries;
pub use status::{ComputationMode, StepStatus};
pub use window::ExecutionWindow;
