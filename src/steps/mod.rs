//! Step definitions and outcomes.
//!
//! - [`Step`] - a named unit of work with prerequisites, `apply` and `verify`
//! - [`StepContext`] - what an action may touch (commands, files)
//! - [`StepOutcome`] - the recorded result of one step in a run
//! - [`check`] - reusable helpers for `verify` actions

pub mod check;
pub mod context;
pub mod outcome;
pub mod step;

pub use context::StepContext;
pub use outcome::{ExitDetail, SkipReason, StepFailure, StepOutcome, StepStatus};
pub use step::{ApplyFn, Step, VerifyFn};
