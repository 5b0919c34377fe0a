//! External command execution.

use crate::error::{ProvisorError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Display form of the command line.
    pub command: String,

    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(command: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
            duration: Duration::ZERO,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            duration: Duration::ZERO,
            success: false,
        }
    }

    /// Convert a non-zero exit into a `CommandFailure`.
    pub fn into_checked(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ProvisorError::CommandFailure {
                command: self.command,
                code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment overlay, merged onto the inherited environment.
    pub env: HashMap<String, String>,

    /// Maximum run time (None = no timeout).
    pub timeout: Option<Duration>,
}

impl CommandOptions {
    /// Set the working directory.
    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable to the overlay.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Layer `overrides` on top of these options.
    ///
    /// The overlay's env entries win, and its cwd/timeout replace ours when set.
    pub fn merged(&self, overrides: &CommandOptions) -> CommandOptions {
        let mut env = self.env.clone();
        env.extend(overrides.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        CommandOptions {
            cwd: overrides.cwd.clone().or_else(|| self.cwd.clone()),
            env,
            timeout: overrides.timeout.or(self.timeout),
        }
    }
}

/// Launches external commands.
///
/// Implementations never fail for a non-zero exit; callers inspect
/// [`CommandResult::success`]. The only errors are
/// [`ProvisorError::LaunchFailure`] and [`ProvisorError::Timeout`].
pub trait CommandRunner {
    /// Run `program` with `args` and wait for it to exit.
    fn run(&self, program: &str, args: &[String], options: &CommandOptions)
        -> Result<CommandResult>;
}

/// Runs commands on the local host via `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Create a new system runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        options: &CommandOptions,
    ) -> Result<CommandResult> {
        let command_line = format_command(program, args);
        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(command = %command_line, "Launching command");

        let mut child = cmd.spawn().map_err(|e| ProvisorError::LaunchFailure {
            command: command_line.clone(),
            message: e.to_string(),
        })?;

        let stdout_rx = spawn_reader(child.stdout.take());
        let stderr_rx = spawn_reader(child.stderr.take());
        let deadline = options.timeout.map(|limit| start + limit);

        let status = match deadline {
            Some(deadline) => match wait_until(&mut child, deadline)? {
                Some(status) => status,
                None => {
                    warn!(command = %command_line, "Command timed out, terminating");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(timed_out(command_line, options));
                }
            },
            None => child.wait()?,
        };

        // A background grandchild can keep the pipes open after the child
        // exits; the readers are abandoned once the deadline passes.
        let (Some(stdout), Some(stderr)) = (
            collect_output(&stdout_rx, deadline),
            collect_output(&stderr_rx, deadline),
        ) else {
            warn!(
                command = %command_line,
                "Command output still open at the deadline"
            );
            return Err(timed_out(command_line, options));
        };
        let duration = start.elapsed();

        debug!(
            command = %command_line,
            exit_code = ?status.code(),
            "Command finished"
        );

        Ok(CommandResult {
            command: command_line,
            exit_code: status.code(),
            stdout,
            stderr,
            duration,
            success: status.success(),
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut bytes);
        }
        let _ = tx.send(String::from_utf8_lossy(&bytes).into_owned());
    });
    rx
}

/// Wait for a reader to hit EOF. `None` means the deadline passed first.
fn collect_output(rx: &Receiver<String>, deadline: Option<Instant>) -> Option<String> {
    let Some(deadline) = deadline else {
        return Some(rx.recv().unwrap_or_default());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Some(output),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn timed_out(command: String, options: &CommandOptions) -> ProvisorError {
    ProvisorError::Timeout {
        command,
        after: options.timeout.unwrap_or_default(),
    }
}

fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Render a program and its arguments as a single display line.
///
/// Arguments containing whitespace or quotes are single-quoted.
pub fn format_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'' || c == '"') {
            line.push('\'');
            line.push_str(&arg.replace('\'', "'\\''"));
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Convert string slices into owned arguments.
pub fn args<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}
