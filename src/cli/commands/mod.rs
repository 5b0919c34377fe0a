//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait and is routed by
//! [`CommandDispatcher`], which also owns the global flags every command
//! shares.

pub mod completions;
pub mod dispatcher;
pub mod plan;
pub mod run;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, GlobalOptions};
