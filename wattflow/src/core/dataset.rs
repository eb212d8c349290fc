//! Raw input data handed to `train` and `test`.

use super::{ExecutionWindow, TimeSeries};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A set of named time series, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: BTreeMap<String, TimeSeries>,
}

impl Dataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, builder style.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, series: TimeSeries) -> Self {
        self.insert(name, series);
        self
    }

    /// Inserts or replaces a column.
    pub fn insert(&mut self, name: impl Into<String>, series: TimeSeries) {
        self.columns.insert(name.into(), series);
    }

    /// Returns a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TimeSeries> {
        self.columns.get(name)
    }

    /// Returns true if the column exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Iterates over `(name, series)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TimeSeries)> {
        self.columns.iter().map(|(name, series)| (name.as_str(), series))
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if there are no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the window from the earliest to the latest timestamp of any column.
    #[must_use]
    pub fn full_window(&self) -> Option<ExecutionWindow> {
        let start = self.columns.values().filter_map(TimeSeries::first_timestamp).min()?;
        let end = self.columns.values().filter_map(TimeSeries::last_timestamp).max()?;
        ExecutionWindow::new(start, end).ok()
    }

    /// Returns the sorted union of all column timestamps.
    #[must_use]
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        let mut all: Vec<DateTime<Utc>> = self
            .columns
            .values()
            .flat_map(|series| series.index().iter().copied())
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Returns a dataset with every column sliced to `window`.
    #[must_use]
    pub fn slice(&self, window: &ExecutionWindow) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(name, series)| (name.clone(), series.slice(window)))
                .collect(),
        }
    }
}

impl FromIterator<(String, TimeSeries)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (String, TimeSeries)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
