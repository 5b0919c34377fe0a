//! Error types for provisioning operations.
//!
//! This module defines [`ProvisorError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Registration errors (`DuplicateStep`, `UnknownDependency`,
//!   `CyclicDependency`) abort before anything touches the host
//! - Command errors (`LaunchFailure`, `CommandFailure`, `Timeout`) are
//!   recovered by the orchestrator and recorded in the run report
//! - Use `anyhow::Error` (via `ProvisorError::Other`) for unexpected errors

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for provisioning operations.
#[derive(Debug, Error)]
pub enum ProvisorError {
    /// A step with the same name was already registered.
    #[error("Step '{name}' is already registered")]
    DuplicateStep { name: String },

    /// A step requires a step that was never registered.
    #[error("Step '{step}' requires unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    /// Step prerequisites form a cycle.
    #[error("Circular dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// The command could not be started at all.
    #[error("Could not launch '{command}': {message}")]
    LaunchFailure { command: String, message: String },

    /// The command ran and exited unsuccessfully.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailure {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The command (or its output) did not finish within its allotted time.
    #[error("Command timed out after {}s: {command}", .after.as_secs())]
    Timeout { command: String, after: Duration },

    /// Configuration file not found at the given location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// The run was cancelled between steps.
    #[error("Run cancelled")]
    Cancelled,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Interpreted error kind, shown to users and stored in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LaunchFailure,
    CommandFailure,
    Timeout,
    Registration,
    Configuration,
    Cancelled,
    Io,
    Other,
}

impl ErrorKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::LaunchFailure => "launch failure",
            ErrorKind::CommandFailure => "command failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Registration => "registration error",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Io => "io error",
            ErrorKind::Other => "error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl ProvisorError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProvisorError::LaunchFailure { .. } => ErrorKind::LaunchFailure,
            ProvisorError::CommandFailure { .. } => ErrorKind::CommandFailure,
            ProvisorError::Timeout { .. } => ErrorKind::Timeout,
            ProvisorError::DuplicateStep { .. }
            | ProvisorError::UnknownDependency { .. }
            | ProvisorError::CyclicDependency { .. } => ErrorKind::Registration,
            ProvisorError::ConfigNotFound { .. }
            | ProvisorError::ConfigParseError { .. }
            | ProvisorError::ConfigValidationError { .. } => ErrorKind::Configuration,
            ProvisorError::Cancelled => ErrorKind::Cancelled,
            ProvisorError::Io(_) => ErrorKind::Io,
            ProvisorError::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether this failure halts the run regardless of the step's criticality.
    pub fn is_always_critical(&self) -> bool {
        matches!(self, ProvisorError::LaunchFailure { .. })
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisorError>;
