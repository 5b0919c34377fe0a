//! Step registration, ordering and execution.
//!
//! - [`StepRegistry`] / [`ValidatedRegistry`] - named steps and their fixed order
//! - [`Orchestrator`] - runs a validated registry once
//! - [`RunReport`] - what happened to every step

pub mod orchestrator;
pub mod registry;
pub mod report;

pub use orchestrator::{CancelToken, Orchestrator, RunOptions, RunProgress};
pub use registry::{StepRegistry, ValidatedRegistry};
pub use report::{OverallStatus, RunReport};
