//! Time-indexed value columns.

use super::ExecutionWindow;
use crate::errors::WattflowError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A strictly increasing UTC index paired with one `f64` value per timestamp.
///
/// `NaN` marks timestamps for which a module had no observation (lag warm-up,
/// rows that could not be computed).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct TimeSeries {
    index: Vec<DateTime<Utc>>,
    #[serde(serialize_with = "nan_as_null::serialize")]
    values: Vec<f64>,
}

/// Wire form of a series; checked by [`TimeSeries::new`] before use.
#[derive(Deserialize)]
struct RawSeries {
    index: Vec<DateTime<Utc>>,
    #[serde(deserialize_with = "nan_as_null::deserialize")]
    values: Vec<f64>,
}

impl TryFrom<RawSeries> for TimeSeries {
    type Error = WattflowError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        Self::new(raw.index, raw.values)
    }
}

impl TimeSeries {
    /// Creates a series, validating length and index ordering.
    pub fn new(index: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self, WattflowError> {
        if index.len() != values.len() {
            return Err(WattflowError::InvalidSeries(format!(
                "index has {} timestamps but {} values were given",
                index.len(),
                values.len()
            )));
        }
        if let Some(pos) = index.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(WattflowError::InvalidSeries(format!(
                "index is not strictly increasing at position {}",
                pos + 1
            )));
        }
        Ok(Self { index, values })
    }

    /// Creates a series on a regular grid starting at `start`.
    pub fn from_start(
        start: DateTime<Utc>,
        step: Duration,
        values: Vec<f64>,
    ) -> Result<Self, WattflowError> {
        if step <= Duration::zero() {
            return Err(WattflowError::InvalidSeries(
                "grid step must be positive".to_string(),
            ));
        }
        let index = (0..values.len())
            .scan(start, |ts, _| {
                let current = *ts;
                *ts += step;
                Some(current)
            })
            .collect();
        Ok(Self { index, values })
    }

    /// Creates a series sharing `self`'s index with new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, WattflowError> {
        Self::new(self.index.clone(), values)
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the series holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the timestamps.
    #[must_use]
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    /// Returns the values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the first timestamp, if any.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.index.first().copied()
    }

    /// Returns the last timestamp, if any.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.index.last().copied()
    }

    /// Returns the window spanned by the series, if it is not empty.
    #[must_use]
    pub fn window(&self) -> Option<ExecutionWindow> {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(start), Some(end)) => ExecutionWindow::new(start, end).ok(),
            _ => None,
        }
    }

    /// Returns the value at `timestamp`, if present.
    #[must_use]
    pub fn get(&self, timestamp: DateTime<Utc>) -> Option<f64> {
        self.index
            .binary_search(&timestamp)
            .ok()
            .map(|pos| self.values[pos])
    }

    /// Iterates over `(timestamp, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Returns the points that fall inside `window`.
    #[must_use]
    pub fn slice(&self, window: &ExecutionWindow) -> Self {
        let lo = self.index.partition_point(|ts| *ts < window.start());
        let hi = self.index.partition_point(|ts| *ts <= window.end());
        let hi = hi.max(lo);
        Self {
            index: self.index[lo..hi].to_vec(),
            values: self.values[lo..hi].to_vec(),
        }
    }

    /// Returns the points strictly before `timestamp`.
    #[must_use]
    pub fn before(&self, timestamp: DateTime<Utc>) -> Self {
        let end = self.index.partition_point(|ts| *ts < timestamp);
        Self {
            index: self.index[..end].to_vec(),
            values: self.values[..end].to_vec(),
        }
    }

    /// Returns the last `n` points.
    #[must_use]
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            index: self.index[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Returns `self` followed by `later`.
    ///
    /// Points of `self` at or after the first timestamp of `later` are
    /// replaced by `later`'s points.
    #[must_use]
    pub fn append(&self, later: &Self) -> Self {
        let Some(first) = later.first_timestamp() else {
            return self.clone();
        };
        let keep = self.index.partition_point(|ts| *ts < first);
        let mut index = self.index[..keep].to_vec();
        let mut values = self.values[..keep].to_vec();
        index.extend_from_slice(&later.index);
        values.extend_from_slice(&later.values);
        Self { index, values }
    }

    /// Applies `f` to every value.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            values: self.values.iter().copied().map(f).collect(),
        }
    }

    /// Returns true if both series have the same index and bit-identical values.
    ///
    /// Unlike `==`, two `NaN` values compare equal here.
    #[must_use]
    pub fn identical(&self, other: &Self) -> bool {
        self.index == other.index
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// Returns the number of `NaN` values.
    #[must_use]
    pub fn nan_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }
}

/// JSON has no `NaN`; missing observations are written as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| if v.is_nan() { None } else { Some(*v) }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
