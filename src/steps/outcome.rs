//! Per-step outcome records.
//!
//! A [`StepOutcome`] is created `Pending` when a run begins, may pass
//! through `Running`, and transitions exactly once to a terminal status.
//! Only the orchestrator drives these transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ErrorKind, ProvisorError};
use crate::secrets::OutputMasker;
use crate::shell::CommandResult;
use crate::ui::format_duration;

/// Status of a step in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step is waiting to run.
    Pending,

    /// Step is currently executing.
    Running,

    /// Step applied successfully.
    Succeeded,

    /// Step did not apply; see [`SkipReason`].
    Skipped,

    /// Step failed.
    Failed,
}

impl StepStatus {
    /// Check if this is a terminal state (no more changes expected).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Pending => '○',
            StepStatus::Running => '◉',
            StepStatus::Succeeded => '✓',
            StepStatus::Failed => '✗',
            StepStatus::Skipped => '⊘',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Why a step was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A required step did not succeed.
    PrerequisiteNotSatisfied,
    /// `verify` reported the change is already in place.
    AlreadyApplied,
    /// An earlier critical step failed.
    AbortedAfterCriticalFailure,
    /// The run was cancelled before this step started.
    Cancelled,
    /// Dry run: the step would have applied.
    DryRun,
}

impl SkipReason {
    /// User-facing reason text.
    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::PrerequisiteNotSatisfied => "prerequisite not satisfied",
            SkipReason::AlreadyApplied => "already applied",
            SkipReason::AbortedAfterCriticalFailure => "aborted after critical failure",
            SkipReason::Cancelled => "cancelled",
            SkipReason::DryRun => "dry run",
        }
    }

    /// Whether dependents may proceed past a step skipped for this reason.
    pub fn counts_as_satisfied(&self) -> bool {
        matches!(self, SkipReason::AlreadyApplied | SkipReason::DryRun)
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Captured output of the last command a step ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitDetail {
    pub command: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl From<&CommandResult> for ExitDetail {
    fn from(result: &CommandResult) -> Self {
        Self {
            command: result.command.clone(),
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            duration_ms: result.duration.as_millis() as u64,
        }
    }
}

impl ExitDetail {
    /// Detail for a command that never produced an exit status.
    pub fn unfinished(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
        }
    }

    fn mask(&mut self, masker: &OutputMasker) {
        self.command = masker.mask(&self.command);
        self.stdout = masker.mask(&self.stdout);
        self.stderr = masker.mask(&self.stderr);
    }
}

/// Interpreted failure of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ProvisorError> for StepFailure {
    fn from(err: &ProvisorError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one step in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_name: String,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_detail: Option<ExitDetail>,
    #[serde(default)]
    pub critical: bool,
}

impl StepOutcome {
    pub(crate) fn pending(step_name: &str, critical: bool) -> Self {
        Self {
            step_name: step_name.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            error: None,
            skip_reason: None,
            exit_detail: None,
            critical,
        }
    }

    pub(crate) fn begin(&mut self) {
        if self.status == StepStatus::Pending {
            self.status = StepStatus::Running;
            self.started_at = Some(Utc::now());
        }
    }

    pub(crate) fn succeed(&mut self, detail: Option<ExitDetail>) {
        if self.finish(StepStatus::Succeeded) {
            self.exit_detail = detail;
        }
    }

    pub(crate) fn skip(&mut self, reason: SkipReason, detail: Option<ExitDetail>) {
        if self.finish(StepStatus::Skipped) {
            self.skip_reason = Some(reason);
            self.exit_detail = detail;
        }
    }

    pub(crate) fn fail(&mut self, failure: StepFailure, detail: Option<ExitDetail>) {
        if self.finish(StepStatus::Failed) {
            self.error = Some(failure);
            self.exit_detail = detail;
        }
    }

    /// Move to `status` unless already terminal. Returns whether it moved.
    fn finish(&mut self, status: StepStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        true
    }

    pub(crate) fn mask(&mut self, masker: &OutputMasker) {
        if let Some(detail) = self.exit_detail.as_mut() {
            detail.mask(masker);
        }
        if let Some(error) = self.error.as_mut() {
            error.message = masker.mask(&error.message);
        }
    }

    /// Whether dependents of this step may run.
    pub fn is_satisfied(&self) -> bool {
        match self.status {
            StepStatus::Succeeded => true,
            StepStatus::Skipped => self
                .skip_reason
                .map(|r| r.counts_as_satisfied())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Wall-clock time between start and finish, if the step started.
    pub fn duration(&self) -> Option<Duration> {
        let started = self.started_at?;
        let finished = self.finished_at?;
        (finished - started).to_std().ok()
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let glyph = self.status.display_char();
        match self.status {
            StepStatus::Succeeded => {
                let duration = self.duration().unwrap_or_default();
                format!("{} {} ({})", glyph, self.step_name, format_duration(duration))
            }
            StepStatus::Skipped => {
                let reason = self
                    .skip_reason
                    .map(|r| r.description())
                    .unwrap_or("skipped");
                format!("{} {} ({})", glyph, self.step_name, reason)
            }
            StepStatus::Failed => match &self.error {
                Some(failure) => format!(
                    "{} {} - {}: {}",
                    glyph, self.step_name, failure.kind, failure.message
                ),
                None => format!("{} {} - unknown error", glyph, self.step_name),
            },
            _ => format!("{} {}", glyph, self.step_name),
        }
    }
}
