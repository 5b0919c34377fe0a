//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Default per-command timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Provisor - provision a Raspberry Pi as a Learn Lab server.
#[derive(Debug, Parser)]
#[command(name = "provisor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a YAML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Write host files under this directory instead of /
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision the host (default if no command specified)
    Run(RunArgs),

    /// Show the steps a run would take, in order
    Plan(PlanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Never prompt; answer from PROVISOR_PROMPT_* variables and defaults
    #[arg(long)]
    pub non_interactive: bool,

    /// Check every step without changing the host
    #[arg(long)]
    pub dry_run: bool,

    /// Apply these steps even if they look done (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub force: Vec<String>,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Per-command timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Backend checkout (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub backend_dir: Option<PathBuf>,

    /// Frontend checkout (defaults to a sibling of the backend)
    #[arg(long, value_name = "DIR")]
    pub frontend_dir: Option<PathBuf>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            non_interactive: false,
            dry_run: false,
            force: Vec::new(),
            report: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            backend_dir: None,
            frontend_dir: None,
        }
    }
}

/// Arguments for the `plan` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PlanArgs {
    /// Backend checkout (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub backend_dir: Option<PathBuf>,

    /// Frontend checkout (defaults to a sibling of the backend)
    #[arg(long, value_name = "DIR")]
    pub frontend_dir: Option<PathBuf>,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
