//! Execution windows: the time range one evaluation pass covers.

use crate::errors::WattflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed time range `[start, end]`, both ends inclusive.
///
/// Windows key the result store, so two passes over the same range share
/// cached step outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExecutionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ExecutionWindow {
    /// Creates a window, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WattflowError> {
        if start > end {
            return Err(WattflowError::InvalidWindow(format!(
                "start {} is after end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(Self { start, end })
    }

    /// Creates a window covering a single timestamp.
    #[must_use]
    pub const fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            start: timestamp,
            end: timestamp,
        }
    }

    /// Returns the first timestamp of the window.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the last timestamp of the window.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `timestamp` lies inside the window.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Returns true if the window covers exactly one instant.
    #[must_use]
    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if the two windows share at least one instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for ExecutionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_inclusive_bounds() {
        let window = ExecutionWindow::new(ts(2), ts(5)).unwrap();
        assert!(window.contains(ts(2)));
        assert!(window.contains(ts(5)));
        assert!(!window.contains(ts(5) + Duration::seconds(1)));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let err = ExecutionWindow::new(ts(5), ts(2)).unwrap_err();
        assert!(matches!(err, WattflowError::InvalidWindow(_)));
    }

    #[test]
    fn test_instant_window() {
        let window = ExecutionWindow::at(ts(7));
        assert!(window.is_instant());
        assert!(window.overlaps(&ExecutionWindow::new(ts(6), ts(7)).unwrap()));
        assert!(!window.overlaps(&ExecutionWindow::at(ts(8))));
    }
}
