//! Test assertions for series and step outputs.

use crate::core::{StepOutput, StepStatus, TimeSeries};

/// Asserts two series are bit-identical, `NaN` included.
pub fn assert_series_identical(actual: &TimeSeries, expected: &TimeSeries) {
    assert!(
        actual.identical(expected),
        "Series differ:\n  actual:   {:?}\n  expected: {:?}",
        actual.values(),
        expected.values()
    );
}

/// Asserts every value is within `tolerance` of the expectation.
///
/// `NaN` matches only `NaN`.
pub fn assert_values_close(actual: &TimeSeries, expected: &[f64], tolerance: f64) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Expected {} values, got {}",
        expected.len(),
        actual.len()
    );
    for (i, (a, e)) in actual.values().iter().zip(expected).enumerate() {
        let ok = (a.is_nan() && e.is_nan()) || (a - e).abs() <= tolerance;
        assert!(ok, "Value {i} differs: got {a}, expected {e} (tolerance {tolerance})");
    }
}

/// Asserts the output is the "no value" sentinel.
pub fn assert_skipped(output: &StepOutput) {
    assert_eq!(
        output.status,
        StepStatus::Skip,
        "Expected a skipped output, got status: {:?}",
        output.status
    );
}
