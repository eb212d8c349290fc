//! Pipeline configuration.

use crate::errors::WattflowError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling result retention and persistence.
///
/// The configuration is stored in the pipeline descriptor, so a reloaded
/// pipeline behaves like the one that was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Accumulate reported outputs across test passes for summaries.
    #[serde(default = "default_accumulate_history")]
    pub accumulate_history: bool,
    /// Keep result store entries of earlier windows during incremental tests.
    #[serde(default)]
    pub retain_results: bool,
    /// Check blob checksums when loading.
    #[serde(default = "default_verify_checksums")]
    pub verify_checksums: bool,
    /// File name of the topology descriptor inside a pipeline folder.
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,
}

const fn default_accumulate_history() -> bool {
    true
}

const fn default_verify_checksums() -> bool {
    true
}

fn default_descriptor_file() -> String {
    "pipeline.json".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accumulate_history: default_accumulate_history(),
            retain_results: false,
            verify_checksums: default_verify_checksums(),
            descriptor_file: default_descriptor_file(),
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets history accumulation.
    #[must_use]
    pub const fn with_accumulate_history(mut self, enabled: bool) -> Self {
        self.accumulate_history = enabled;
        self
    }

    /// Sets result retention across windows.
    #[must_use]
    pub const fn with_retain_results(mut self, enabled: bool) -> Self {
        self.retain_results = enabled;
        self
    }

    /// Sets checksum verification on load.
    #[must_use]
    pub const fn with_verify_checksums(mut self, enabled: bool) -> Self {
        self.verify_checksums = enabled;
        self
    }

    /// Sets the descriptor file name.
    #[must_use]
    pub fn with_descriptor_file(mut self, name: impl Into<String>) -> Self {
        self.descriptor_file = name.into();
        self
    }

    /// Reads a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, WattflowError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: PipelineConfig = serde_json::from_str(r#"{"retain_results": true}"#).unwrap();
        assert_eq!(
            config,
            PipelineConfig::default().with_retain_results(true)
        );
        assert_eq!(config.descriptor_file, "pipeline.json");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"accumulate_history": false}"#).unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert!(!config.accumulate_history);
        assert!(config.verify_checksums);
    }
}
