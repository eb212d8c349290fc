//! Testing utilities for wattflow pipelines.
//!
//! This module provides:
//! - Mock modules that count calls or fail on demand
//! - Fixtures for hourly series and datasets
//! - Assertions for series and step outputs

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_series_identical, assert_skipped, assert_values_close};
pub use fixtures::{
    fixture_start, hour, hourly_dataset, hourly_series, hourly_series_from, hours_window, ramp,
};
pub use mocks::{CallCounters, CountingModule, FailOn, FailingModule};
