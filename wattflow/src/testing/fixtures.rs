//! Test fixtures: timestamps, hourly series and datasets.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::{Dataset, ExecutionWindow, TimeSeries};

/// Returns the fixture epoch, 2024-01-01T00:00:00Z.
#[must_use]
pub fn fixture_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Returns the timestamp `hours` after the fixture epoch.
#[must_use]
pub fn hour(hours: i64) -> DateTime<Utc> {
    fixture_start() + Duration::hours(hours)
}

/// Builds an hourly series starting at the fixture epoch.
#[must_use]
pub fn hourly_series(values: &[f64]) -> TimeSeries {
    hourly_series_from(0, values)
}

/// Builds an hourly series starting `offset_hours` after the fixture epoch.
#[must_use]
pub fn hourly_series_from(offset_hours: i64, values: &[f64]) -> TimeSeries {
    TimeSeries::from_start(hour(offset_hours), Duration::hours(1), values.to_vec())
        .unwrap_or_default()
}

/// Builds a single-column hourly dataset.
#[must_use]
pub fn hourly_dataset(column: &str, values: &[f64]) -> Dataset {
    Dataset::new().with_column(column, hourly_series(values))
}

/// Returns `0.0, 1.0, ..., (n - 1)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ramp(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Returns the window covering hours `from..=to` after the fixture epoch.
#[must_use]
pub fn hours_window(from: i64, to: i64) -> ExecutionWindow {
    ExecutionWindow::new(hour(from), hour(to)).unwrap_or_else(|_| ExecutionWindow::at(hour(from)))
}
