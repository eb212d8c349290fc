//! Statistics over the values a pipeline has reported across test passes.

use crate::core::TimeSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Statistics for one step's accumulated output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    points: usize,
    nan_count: usize,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    series: TimeSeries,
}

impl StepSummary {
    /// Computes the statistics of `series`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_series(series: &TimeSeries) -> Self {
        let finite: Vec<f64> = series.values().iter().copied().filter(|v| !v.is_nan()).collect();
        let mean = (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / finite.len() as f64);
        Self {
            points: series.len(),
            nan_count: series.nan_count(),
            start: series.first_timestamp(),
            end: series.last_timestamp(),
            mean,
            min: finite.iter().copied().reduce(f64::min),
            max: finite.iter().copied().reduce(f64::max),
            series: series.clone(),
        }
    }

    /// Returns the number of points.
    #[must_use]
    pub const fn points(&self) -> usize {
        self.points
    }

    /// Returns the number of `NaN` points.
    #[must_use]
    pub const fn nan_count(&self) -> usize {
        self.nan_count
    }

    /// Returns the first timestamp.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Returns the last timestamp.
    #[must_use]
    pub const fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Returns the mean of the non-`NaN` values.
    #[must_use]
    pub const fn mean(&self) -> Option<f64> {
        self.mean
    }

    /// Returns the minimum of the non-`NaN` values.
    #[must_use]
    pub const fn min(&self) -> Option<f64> {
        self.min
    }

    /// Returns the maximum of the non-`NaN` values.
    #[must_use]
    pub const fn max(&self) -> Option<f64> {
        self.max
    }

    /// Returns the accumulated series.
    #[must_use]
    pub const fn series(&self) -> &TimeSeries {
        &self.series
    }
}

/// Per-step statistics of everything a pipeline reported since its last reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pipeline: String,
    cursor: Option<DateTime<Utc>>,
    steps: BTreeMap<String, StepSummary>,
}

impl Summary {
    /// Builds a summary from accumulated history.
    #[must_use]
    pub fn from_history(
        pipeline: impl Into<String>,
        cursor: Option<DateTime<Utc>>,
        history: &BTreeMap<String, TimeSeries>,
    ) -> Self {
        Self {
            pipeline: pipeline.into(),
            cursor,
            steps: history
                .iter()
                .map(|(name, series)| (name.clone(), StepSummary::from_series(series)))
                .collect(),
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Returns the end of the last tested window.
    #[must_use]
    pub const fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Returns the statistics keyed by step display name.
    #[must_use]
    pub const fn steps(&self) -> &BTreeMap<String, StepSummary> {
        &self.steps
    }

    /// Returns the statistics of one step.
    #[must_use]
    pub fn get(&self, step: &str) -> Option<&StepSummary> {
        self.steps.get(step)
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Serializes the summary to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline '{}'", self.pipeline)?;
        let fmt_opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        for (name, step) in &self.steps {
            writeln!(
                f,
                "  {name}: points={} nan={} mean={} min={} max={}",
                step.points,
                step.nan_count,
                fmt_opt(step.mean),
                fmt_opt(step.min),
                fmt_opt(step.max)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::hourly_series;

    #[test]
    fn test_statistics_ignore_nan() {
        let summary = StepSummary::from_series(&hourly_series(&[1.0, f64::NAN, 3.0, 8.0]));
        assert_eq!(summary.points(), 4);
        assert_eq!(summary.nan_count(), 1);
        assert_eq!(summary.mean(), Some(4.0));
        assert_eq!(summary.min(), Some(1.0));
        assert_eq!(summary.max(), Some(8.0));
    }

    #[test]
    fn test_all_nan_has_no_statistics() {
        let summary = StepSummary::from_series(&hourly_series(&[f64::NAN, f64::NAN]));
        assert_eq!(summary.mean(), None);
        assert_eq!(summary.min(), None);
    }

    #[test]
    fn test_display_lists_steps() {
        let history = BTreeMap::from([("rmse".to_string(), hourly_series(&[0.5, 1.5]))]);
        let text = Summary::from_history("p", None, &history).to_string();
        assert!(text.contains("rmse: points=2 nan=0 mean=1.0000"));
    }

    #[test]
    fn test_accessors_expose_history() {
        let series = hourly_series(&[2.0, 4.0]);
        let history = BTreeMap::from([("lag".to_string(), series.clone())]);
        let summary = Summary::from_history("p", series.last_timestamp(), &history);
        assert_eq!(summary.pipeline(), "p");
        assert_eq!(summary.cursor(), series.last_timestamp());
        assert_eq!(summary.steps().len(), 1);
        let lag = summary.get("lag").unwrap();
        assert_eq!(lag.start(), series.first_timestamp());
        assert_eq!(lag.end(), series.last_timestamp());
        assert!(lag.series().identical(&series));
    }
}
