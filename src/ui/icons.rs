//! Shared status vocabulary for CLI output.

use crate::steps::{StepOutcome, StepStatus};

use super::theme::ProvisorTheme;

/// Canonical status kinds used across all output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Operation completed successfully.
    Success,
    /// Operation failed.
    Failed,
    /// Nothing to do (already applied or dry run).
    Skipped,
    /// Not run yet.
    Pending,
    /// Currently running.
    Running,
    /// Could not run (prerequisite, abort or cancellation).
    Blocked,
    /// Non-fatal warning.
    Warning,
}

impl StatusKind {
    /// Unicode icon for TTY output.
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Failed => "✗",
            Self::Skipped => "○",
            Self::Pending => "◌",
            Self::Running => "◆",
            Self::Blocked => "⊘",
            Self::Warning => "⚠",
        }
    }

    /// Styled icon string using the given theme.
    pub fn styled(self, theme: &ProvisorTheme) -> String {
        let icon = self.icon();
        match self {
            Self::Success => theme.success.apply_to(icon).to_string(),
            Self::Failed => theme.error.apply_to(icon).to_string(),
            Self::Skipped | Self::Pending => theme.dim.apply_to(icon).to_string(),
            Self::Running => theme.info.apply_to(icon).to_string(),
            Self::Blocked | Self::Warning => theme.warning.apply_to(icon).to_string(),
        }
    }

    /// Format a status line: styled icon + message.
    pub fn format(self, theme: &ProvisorTheme, msg: &str) -> String {
        format!("{} {}", self.styled(theme), msg)
    }
}

impl From<StepStatus> for StatusKind {
    fn from(status: StepStatus) -> Self {
        match status {
            StepStatus::Pending => Self::Pending,
            StepStatus::Running => Self::Running,
            StepStatus::Succeeded => Self::Success,
            StepStatus::Failed => Self::Failed,
            StepStatus::Skipped => Self::Skipped,
        }
    }
}

impl From<&StepOutcome> for StatusKind {
    fn from(outcome: &StepOutcome) -> Self {
        match (outcome.status, outcome.skip_reason) {
            (StepStatus::Skipped, Some(reason)) if !reason.counts_as_satisfied() => Self::Blocked,
            (status, _) => status.into(),
        }
    }
}
