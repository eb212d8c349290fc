//! Named input series handed to modules.

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named input series for one `fit` or `transform` call, ordered by name.
#[derive(Debug, Clone, Default)]
pub struct ModuleInputs {
    values: BTreeMap<String, Arc<TimeSeries>>,
}

impl ModuleInputs {
    /// Creates an empty input set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an input, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, series: TimeSeries) -> Self {
        self.insert(name, Arc::new(series));
        self
    }

    /// Inserts or replaces an input.
    pub fn insert(&mut self, name: impl Into<String>, series: Arc<TimeSeries>) {
        self.values.insert(name.into(), series);
    }

    /// Returns the named input or a [`ModuleError::MissingArgument`].
    pub fn get(&self, name: &str) -> Result<&TimeSeries, ModuleError> {
        self.values
            .get(name)
            .map(AsRef::as_ref)
            .ok_or_else(|| ModuleError::missing_argument(name))
    }

    /// Returns the named input, if present.
    #[must_use]
    pub fn try_get(&self, name: &str) -> Option<&TimeSeries> {
        self.values.get(name).map(AsRef::as_ref)
    }

    /// Returns the first input by name order.
    #[must_use]
    pub fn first(&self) -> Option<(&str, &TimeSeries)> {
        self.values
            .iter()
            .next()
            .map(|(name, series)| (name.as_str(), series.as_ref()))
    }

    /// Iterates over `(name, series)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TimeSeries)> {
        self.values
            .iter()
            .map(|(name, series)| (name.as_str(), series.as_ref()))
    }

    /// Returns the input names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of inputs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the union of both input sets; `other` wins on name clashes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(k, v)| (k.clone(), Arc::clone(v))));
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_argument() {
        let inputs = ModuleInputs::new().with("x", TimeSeries::default());
        assert!(inputs.get("x").is_ok());
        assert!(matches!(
            inputs.get("y"),
            Err(ModuleError::MissingArgument { name }) if name == "y"
        ));
    }

    #[test]
    fn test_merged_prefers_other() {
        let a = ModuleInputs::new().with("x", TimeSeries::default());
        let b = ModuleInputs::new().with("c", TimeSeries::default());
        let merged = a.merged(&b);
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["c", "x"]);
        assert_eq!(merged.first().map(|(name, _)| name), Some("c"));
    }
}
