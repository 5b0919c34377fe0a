//! Provisor - idempotent host provisioning for a Learn Lab server.
//!
//! Provisor turns a Raspberry Pi into a self-contained classroom server: a
//! PostgreSQL database, an optional WiFi hotspot, a firewall, the Go
//! toolchain and the backend's systemd services. Each piece is a named
//! [`steps::Step`] that knows how to check whether it is already in place
//! and how to put it there; the [`runner`] walks them in a fixed order and
//! records what happened.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Settings resolution, validation, templates and env files
//! - [`error`] - Error types and result aliases
//! - [`provision`] - The concrete provisioning steps
//! - [`runner`] - Step registration, ordering and execution
//! - [`secrets`] - Output masking
//! - [`shell`] - Command execution and platform probes
//! - [`steps`] - Step definitions and outcomes
//! - [`ui`] - Prompts, spinners, and terminal output
//!
//! # Example
//!
//! ```
//! use provisor::runner::{Orchestrator, OverallStatus, RunOptions, StepRegistry};
//! use provisor::shell::MockRunner;
//! use provisor::steps::Step;
//!
//! let mut registry = StepRegistry::new();
//! registry.register(Step::new("packages")).unwrap();
//! registry
//!     .register(Step::new("database").requires(["packages"]))
//!     .unwrap();
//! let registry = registry.finalize().unwrap();
//!
//! let runner = MockRunner::new();
//! let report = Orchestrator::new(&registry, &runner).run(&RunOptions::default());
//! assert_eq!(report.overall_status(), OverallStatus::Success);
//! assert_eq!(report.succeeded_steps(), vec!["packages", "database"]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod provision;
pub mod runner;
pub mod secrets;
pub mod shell;
pub mod steps;
pub mod ui;

pub use error::{ProvisorError, Result};
