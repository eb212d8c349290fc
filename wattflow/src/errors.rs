//! Error types for the wattflow engine.
//!
//! Engine failures are reported through [`WattflowError`]. Failures raised by
//! module code are [`ModuleError`]s and reach the caller unchanged as the
//! source of [`WattflowError::Module`], wrapped with step and module context.

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for wattflow operations.
#[derive(Debug, Error)]
pub enum WattflowError {
    /// Invalid wiring or an invalid parameter value.
    #[error("{0}")]
    WrongParameter(#[from] WrongParameterError),

    /// A module was asked to transform before it was fitted.
    #[error("{0}")]
    NotFitted(#[from] NotFittedError),

    /// A required input could not be resolved for the requested window.
    #[error("{0}")]
    MissingInput(#[from] MissingInputError),

    /// A persisted pipeline could not be loaded.
    #[error("{0}")]
    CorruptPipeline(#[from] CorruptPipelineError),

    /// The computational graph contains a cycle.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A module raised an error while fitting or transforming.
    #[error("step '{step_name}' (module '{module}') failed: {source}")]
    Module {
        /// The failing step.
        step: NodeId,
        /// Display name of the failing step.
        step_name: String,
        /// Name of the module the step wraps.
        module: String,
        /// The error raised by the module.
        #[source]
        source: ModuleError,
    },

    /// An execution window was malformed.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// A time series violated its index invariants.
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WattflowError {
    /// Wraps a module error with the context of the step that ran it.
    #[must_use]
    pub fn module(
        step: NodeId,
        step_name: impl Into<String>,
        module: impl Into<String>,
        source: ModuleError,
    ) -> Self {
        Self::Module {
            step,
            step_name: step_name.into(),
            module: module.into(),
            source,
        }
    }

    /// Returns diagnostic info for errors that carry it.
    #[must_use]
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::WrongParameter(err) => Some(&err.error_info),
            Self::CorruptPipeline(err) => Some(&err.error_info),
            Self::CycleDetected(err) => Some(&err.error_info),
            _ => None,
        }
    }

    /// Returns the module error when this is a wrapped module failure.
    #[must_use]
    pub fn module_source(&self) -> Option<&ModuleError> {
        match self {
            Self::Module { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised by module implementations.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A named argument the module requires was not provided.
    #[error("missing argument '{name}'")]
    MissingArgument {
        /// The argument name.
        name: String,
    },

    /// A parameter value was rejected.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The computation itself failed.
    #[error("{0}")]
    Computation(String),

    /// IO error while saving or loading module state.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while saving or loading module state.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other error forwarded by a user module.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ModuleError {
    /// Creates a missing argument error.
    #[must_use]
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a computation error.
    #[must_use]
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }
}

/// Diagnostic metadata attached to validation-type errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "WATTFLOW-001-WIRING").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ErrorInfo {
    /// Creates new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised for invalid wiring or parameter values.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct WrongParameterError {
    /// The error message.
    pub message: String,
    /// The module involved, when known.
    pub module: Option<String>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl WrongParameterError {
    /// Creates a new wrong parameter error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let error_info = ErrorInfo::new("WATTFLOW-001-WIRING", message.clone());
        Self {
            message,
            module: None,
            error_info,
        }
    }

    /// Sets the module involved.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        let module = module.into();
        self.error_info = self.error_info.with_context_entry("module", module.clone());
        self.module = Some(module);
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.error_info = self.error_info.with_fix_hint(hint);
        self
    }
}

impl From<ModuleError> for WrongParameterError {
    fn from(err: ModuleError) -> Self {
        Self::new(err.to_string())
    }
}

/// Error raised when transforming with a module that has not been fitted.
#[derive(Debug, Clone, Error)]
#[error("step '{step_name}' requires module '{module}' to be fitted before transform")]
pub struct NotFittedError {
    /// The step that attempted the transform.
    pub step: NodeId,
    /// Display name of the step.
    pub step_name: String,
    /// The unfitted module.
    pub module: String,
}

impl NotFittedError {
    /// Creates a new not fitted error.
    #[must_use]
    pub fn new(step: NodeId, step_name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            step,
            step_name: step_name.into(),
            module: module.into(),
        }
    }
}

/// Error raised when a required input is unavailable for a window.
#[derive(Debug, Clone, Error)]
#[error("step '{step_name}' is missing input '{input}' for window {window}")]
pub struct MissingInputError {
    /// The node whose input is missing.
    pub step: NodeId,
    /// Display name of the node.
    pub step_name: String,
    /// The unresolved input (argument or column name).
    pub input: String,
    /// The window being evaluated.
    pub window: String,
}

impl MissingInputError {
    /// Creates a new missing input error.
    #[must_use]
    pub fn new(
        step: NodeId,
        step_name: impl Into<String>,
        input: impl Into<String>,
        window: impl ToString,
    ) -> Self {
        Self {
            step,
            step_name: step_name.into(),
            input: input.into(),
            window: window.to_string(),
        }
    }
}

/// Error raised when a persisted pipeline is inconsistent.
#[derive(Debug, Clone, Error)]
#[error("Corrupt pipeline: {message}")]
pub struct CorruptPipelineError {
    /// The error message.
    pub message: String,
    /// The offending path, when the problem is tied to a file.
    pub path: Option<PathBuf>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl CorruptPipelineError {
    /// Creates a new corrupt pipeline error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let error_info = ErrorInfo::new("WATTFLOW-004-CORRUPT", message.clone())
            .with_fix_hint("Re-save the pipeline with to_folder or restore the missing files.");
        Self {
            message,
            path: None,
            error_info,
        }
    }

    /// Sets the offending path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.error_info = self
            .error_info
            .with_context_entry("path", path.display().to_string());
        self.path = Some(path);
        self
    }
}

/// Error raised when a cycle is detected in the computational graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of steps forming the cycle.
    pub cycle_path: Vec<String>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ErrorInfo::new(
            "WATTFLOW-002-CYCLE",
            format!("Pipeline contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the edges in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}
