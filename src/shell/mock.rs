//! Scripted command runner for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ProvisorError, Result};

use super::command::{format_command, CommandOptions, CommandResult, CommandRunner};

/// A canned reply for a scripted command.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// The command ran and exited with `exit_code`.
    Exit {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    /// The binary could not be started.
    LaunchFailure(String),
    /// The command ran past its deadline.
    Timeout,
}

impl MockResponse {
    /// Exit 0 with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        MockResponse::Exit {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Exit non-zero with the given stderr.
    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        MockResponse::Exit {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// The binary is missing.
    pub fn not_found() -> Self {
        MockResponse::LaunchFailure("No such file or directory (os error 2)".to_string())
    }
}

/// A recorded invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Display form, as produced by [`format_command`].
    pub command: String,
    pub options: CommandOptions,
}

#[derive(Debug)]
struct Rule {
    prefix: String,
    responses: VecDeque<MockResponse>,
}

/// Command runner that answers from a script and records every call.
///
/// Rules match on a prefix of the formatted command line; the longest
/// matching prefix wins. Queued responses are consumed in order and the
/// last one repeats. Unmatched commands succeed with empty output.
///
/// # Example
///
/// ```
/// use provisor::shell::{CommandOptions, CommandRunner, MockResponse, MockRunner};
///
/// let runner = MockRunner::new();
/// runner.respond("systemctl is-active", MockResponse::fail(3, "inactive"));
///
/// let result = runner
///     .run("systemctl", &["is-active".into(), "postgresql".into()], &CommandOptions::default())
///     .unwrap();
/// assert!(!result.success);
/// assert_eq!(runner.count("systemctl"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    /// Create a runner where every command succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for commands starting with `prefix`.
    pub fn respond(&self, prefix: &str, response: MockResponse) {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rule) = rules.iter_mut().find(|r| r.prefix == prefix) {
            rule.responses.push_back(response);
        } else {
            rules.push(Rule {
                prefix: prefix.to_string(),
                responses: VecDeque::from([response]),
            });
        }
    }

    /// All recorded invocations, in call order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Formatted command lines, in call order.
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    /// Number of calls whose command line starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.command.starts_with(prefix))
            .count()
    }

    fn next_response(&self, command: &str) -> Option<MockResponse> {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        let rule = rules
            .iter_mut()
            .filter(|r| command.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())?;

        if rule.responses.len() > 1 {
            rule.responses.pop_front()
        } else {
            rule.responses.front().cloned()
        }
    }
}

impl CommandRunner for MockRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        options: &CommandOptions,
    ) -> Result<CommandResult> {
        let command = format_command(program, args);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                command: command.clone(),
                options: options.clone(),
            });

        match self.next_response(&command) {
            None => Ok(CommandResult::success(command, "")),
            Some(MockResponse::Exit {
                exit_code,
                stdout,
                stderr,
            }) => Ok(CommandResult {
                command,
                exit_code: Some(exit_code),
                stdout,
                stderr,
                duration: Duration::ZERO,
                success: exit_code == 0,
            }),
            Some(MockResponse::LaunchFailure(message)) => {
                Err(ProvisorError::LaunchFailure { command, message })
            }
            Some(MockResponse::Timeout) => Err(ProvisorError::Timeout {
                command,
                after: options.timeout.unwrap_or_default(),
            }),
        }
    }
}
