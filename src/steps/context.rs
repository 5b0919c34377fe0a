//! Execution context handed to step actions.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::shell::{format_command, CommandOptions, CommandResult, CommandRunner};

use super::outcome::ExitDetail;

/// What a step's `verify` and `apply` actions may touch.
///
/// Commands go through the run's [`CommandRunner`] with the run's default
/// options (timeout, environment overlay) underneath any per-call options.
/// Every command is recorded; the last one becomes the step's exit detail.
pub struct StepContext<'a> {
    step: &'a str,
    runner: &'a dyn CommandRunner,
    defaults: CommandOptions,
    transcript: Vec<ExitDetail>,
}

impl<'a> StepContext<'a> {
    /// Create a context for `step`.
    pub fn new(step: &'a str, runner: &'a dyn CommandRunner, defaults: CommandOptions) -> Self {
        Self {
            step,
            runner,
            defaults,
            transcript: Vec::new(),
        }
    }

    /// Name of the step being executed.
    pub fn step_name(&self) -> &str {
        self.step
    }

    /// Run a command; a non-zero exit is a `CommandFailure`.
    pub fn run<S: AsRef<str>>(&mut self, program: &str, args: &[S]) -> Result<CommandResult> {
        self.run_with(program, args, &CommandOptions::default())
    }

    /// Run a command with extra options; a non-zero exit is a `CommandFailure`.
    pub fn run_with<S: AsRef<str>>(
        &mut self,
        program: &str,
        args: &[S],
        options: &CommandOptions,
    ) -> Result<CommandResult> {
        self.probe_with(program, args, options)?.into_checked()
    }

    /// Run a command and return its result whatever the exit code.
    pub fn probe<S: AsRef<str>>(&mut self, program: &str, args: &[S]) -> Result<CommandResult> {
        self.probe_with(program, args, &CommandOptions::default())
    }

    /// Run a command with extra options, whatever the exit code.
    pub fn probe_with<S: AsRef<str>>(
        &mut self,
        program: &str,
        args: &[S],
        options: &CommandOptions,
    ) -> Result<CommandResult> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        let options = self.defaults.merged(options);

        match self.runner.run(program, &args, &options) {
            Ok(result) => {
                self.transcript.push(ExitDetail::from(&result));
                Ok(result)
            }
            Err(e) => {
                self.transcript
                    .push(ExitDetail::unfinished(format_command(program, &args)));
                Err(e)
            }
        }
    }

    /// Write `contents` to `path`, creating parent directories.
    pub fn write_file(&mut self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Append `contents` to `path`, creating it if needed.
    pub fn append_file(&mut self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Read `path`, returning `None` if it does not exist.
    pub fn read_file(&self, path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Commands run so far.
    pub fn transcript(&self) -> &[ExitDetail] {
        &self.transcript
    }

    pub(crate) fn last_detail(&self) -> Option<ExitDetail> {
        self.transcript.last().cloned()
    }
}
