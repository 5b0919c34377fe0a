//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`GlobalOptions`] for the flags every command shares
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::config::ConfigFile;
use crate::error::Result;
use crate::provision::HostPaths;
use crate::shell::{CommandRunner, SystemRunner};
use crate::ui::UserInterface;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command, reporting through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Global flags shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Explicit settings file, if any.
    pub config: Option<PathBuf>,
    /// Where host files are written.
    pub paths: HostPaths,
}

impl GlobalOptions {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            paths: cli
                .root
                .as_ref()
                .map(HostPaths::new)
                .unwrap_or_default(),
        }
    }

    /// Load the settings file, or start empty when none was given.
    pub fn load_config_file(&self) -> Result<ConfigFile> {
        match &self.config {
            Some(path) => ConfigFile::load(path),
            None => Ok(ConfigFile::default()),
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    options: GlobalOptions,
    runner: Box<dyn CommandRunner>,
}

impl CommandDispatcher {
    /// Create a dispatcher that runs commands on the local host.
    pub fn new(options: GlobalOptions) -> Self {
        Self {
            options,
            runner: Box::new(SystemRunner::new()),
        }
    }

    /// Replace the command runner used by `run`.
    pub fn with_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Some(Commands::Run(args)) => self.run(args.clone(), ui),
            Some(Commands::Plan(args)) => {
                let cmd = super::plan::PlanCommand::new(self.options.clone(), args.clone());
                cmd.execute(ui)
            }
            Some(Commands::Completions(args)) => {
                let cmd = super::completions::CompletionsCommand::new(args.clone());
                cmd.execute(ui)
            }
            // Default to run command with default args
            None => self.run(RunArgs::default(), ui),
        }
    }

    fn run(&self, args: RunArgs, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let cmd = super::run::RunCommand::new(self.options.clone(), args, self.runner.as_ref());
        cmd.execute(ui)
    }
}
