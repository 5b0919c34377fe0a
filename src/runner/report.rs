//! Run reports.
//!
//! A [`RunReport`] is the immutable record of one orchestrator run: one
//! [`StepOutcome`] per registered step, in execution order, plus the
//! derived [`OverallStatus`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProvisorError, Result};
use crate::steps::{StepOutcome, StepStatus};
use crate::ui::{format_duration, ProvisorTheme, StatusKind};

/// Captured output lines shown per failed step.
const OUTPUT_TAIL_LINES: usize = 15;

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every step succeeded or was already satisfied.
    Success,
    /// At least one non-critical step failed; the run went on.
    PartialFailure,
    /// A critical failure or cancellation halted the run.
    Aborted,
}

impl OverallStatus {
    /// Process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            OverallStatus::Success => 0,
            OverallStatus::PartialFailure => 2,
            OverallStatus::Aborted => 3,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OverallStatus::Success)
    }

    /// Derive the status from final outcomes.
    pub fn derive(outcomes: &[StepOutcome], aborted: bool) -> Self {
        if aborted {
            OverallStatus::Aborted
        } else if outcomes.iter().any(|o| o.status == StepStatus::Failed) {
            OverallStatus::PartialFailure
        } else {
            OverallStatus::Success
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Success => "success",
            OverallStatus::PartialFailure => "partial failure",
            OverallStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// The record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    overall_status: OverallStatus,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    #[serde(default)]
    dry_run: bool,
    steps: Vec<StepOutcome>,
}

impl RunReport {
    pub(crate) fn new(
        started_at: DateTime<Utc>,
        steps: Vec<StepOutcome>,
        aborted: bool,
        dry_run: bool,
    ) -> Self {
        Self {
            overall_status: OverallStatus::derive(&steps, aborted),
            started_at,
            finished_at: Utc::now(),
            dry_run,
            steps,
        }
    }

    pub fn overall_status(&self) -> OverallStatus {
        self.overall_status
    }

    /// Outcomes in execution order.
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.steps
    }

    /// Outcome for a step by name.
    pub fn outcome(&self, name: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|o| o.step_name == name)
    }

    /// Names of failed steps, in execution order.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.names_with(StepStatus::Failed)
    }

    /// Names of succeeded steps, in execution order.
    pub fn succeeded_steps(&self) -> Vec<&str> {
        self.names_with(StepStatus::Succeeded)
    }

    /// Names of skipped steps, in execution order.
    pub fn skipped_steps(&self) -> Vec<&str> {
        self.names_with(StepStatus::Skipped)
    }

    fn names_with(&self, status: StepStatus) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.step_name.as_str())
            .collect()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Total wall-clock time of the run.
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProvisorError::Other(e.into()))
    }

    /// Parse a report produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ProvisorError::Other(e.into()))
    }

    /// Write the JSON form to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Human-readable rendering for terminal output: every outcome, then
    /// the summary.
    pub fn render(&self, theme: &ProvisorTheme) -> String {
        let mut lines: Vec<String> = self
            .steps
            .iter()
            .map(|outcome| render_outcome(outcome, theme))
            .collect();
        lines.push(String::new());
        lines.push(self.render_summary(theme));
        lines.join("\n")
    }

    /// Captured output of each failed step, the counts and the overall
    /// status. Used after live progress already showed every outcome.
    pub fn render_summary(&self, theme: &ProvisorTheme) -> String {
        let mut lines = Vec::new();

        for outcome in self.steps.iter().filter(|o| o.status == StepStatus::Failed) {
            let Some(detail) = &outcome.exit_detail else {
                continue;
            };
            lines.push(format!(
                "{} {}",
                theme.step_title.apply_to(&outcome.step_name),
                theme.dim.apply_to("output:")
            ));
            lines.push(format!(
                "    {} {}",
                theme.dim.apply_to("$"),
                theme.command.apply_to(&detail.command)
            ));
            let output = if detail.stderr.trim().is_empty() {
                &detail.stdout
            } else {
                &detail.stderr
            };
            for line in tail(output, OUTPUT_TAIL_LINES) {
                lines.push(format!("    {}", theme.dim.apply_to(line)));
            }
        }

        lines.push(format!(
            "{} succeeded, {} skipped, {} failed in {}",
            self.succeeded_steps().len(),
            self.skipped_steps().len(),
            self.failed_steps().len(),
            format_duration(self.duration())
        ));

        let status_line = format!("Provisioning {}", self.overall_status);
        lines.push(match self.overall_status {
            OverallStatus::Success => theme.format_success(&status_line),
            OverallStatus::PartialFailure => theme.format_warning(&status_line),
            OverallStatus::Aborted => theme.format_error(&status_line),
        });

        lines.join("\n")
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&ProvisorTheme::plain()))
    }
}

fn render_outcome(outcome: &StepOutcome, theme: &ProvisorTheme) -> String {
    let name = theme.step_title.apply_to(&outcome.step_name);
    match outcome.status {
        StepStatus::Succeeded => {
            let duration = format_duration(outcome.duration().unwrap_or_default());
            format!(
                "{} {} {}",
                StatusKind::Success.styled(theme),
                name,
                theme.duration.apply_to(format!("({})", duration))
            )
        }
        StepStatus::Skipped => {
            let reason = outcome
                .skip_reason
                .map(|r| r.description())
                .unwrap_or("skipped");
            let kind = match outcome.skip_reason {
                Some(r) if r.counts_as_satisfied() => StatusKind::Skipped,
                _ => StatusKind::Blocked,
            };
            format!(
                "{} {} {}",
                kind.styled(theme),
                name,
                theme.dim.apply_to(format!("(skipped: {})", reason))
            )
        }
        StepStatus::Failed => {
            let (kind, message) = outcome
                .error
                .as_ref()
                .map(|e| (e.kind.label(), e.message.as_str()))
                .unwrap_or(("error", "unknown error"));
            let critical = if outcome.critical { " [critical]" } else { "" };
            format!(
                "{} {}{} {} {}",
                StatusKind::Failed.styled(theme),
                name,
                critical,
                theme.error.apply_to(format!("{}:", kind)),
                message
            )
        }
        StepStatus::Pending => format!("{} {}", StatusKind::Pending.styled(theme), name),
        StepStatus::Running => format!("{} {}", StatusKind::Running.styled(theme), name),
    }
}

fn tail(output: &str, max: usize) -> Vec<&str> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::steps::{ExitDetail, SkipReason, StepFailure};

    fn succeeded(name: &str) -> StepOutcome {
        let mut o = StepOutcome::pending(name, true);
        o.begin();
        o.succeed(None);
        o
    }

    fn failed(name: &str, critical: bool) -> StepOutcome {
        let mut o = StepOutcome::pending(name, critical);
        o.begin();
        o.fail(
            StepFailure {
                kind: ErrorKind::CommandFailure,
                message: "Command failed with exit code Some(1): ufw enable".into(),
            },
            Some(ExitDetail {
                command: "ufw enable".into(),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "ERROR: problem running iptables\n".into(),
                duration_ms: 12,
            }),
        );
        o
    }

    fn skipped(name: &str, reason: SkipReason) -> StepOutcome {
        let mut o = StepOutcome::pending(name, true);
        o.skip(reason, None);
        o
    }

    #[test]
    fn derive_success_when_all_satisfied() {
        let outcomes = vec![succeeded("a"), skipped("b", SkipReason::AlreadyApplied)];
        assert_eq!(
            OverallStatus::derive(&outcomes, false),
            OverallStatus::Success
        );
    }

    #[test]
    fn derive_partial_failure_with_failed_step() {
        let outcomes = vec![succeeded("a"), failed("b", false)];
        assert_eq!(
            OverallStatus::derive(&outcomes, false),
            OverallStatus::PartialFailure
        );
    }

    #[test]
    fn derive_aborted_wins() {
        let outcomes = vec![failed("a", true)];
        assert_eq!(
            OverallStatus::derive(&outcomes, true),
            OverallStatus::Aborted
        );
    }

    #[test]
    fn exit_codes_are_distinct() {
        assert_eq!(OverallStatus::Success.exit_code(), 0);
        assert_ne!(OverallStatus::PartialFailure.exit_code(), 0);
        assert_ne!(OverallStatus::Aborted.exit_code(), 0);
        assert_ne!(
            OverallStatus::PartialFailure.exit_code(),
            OverallStatus::Aborted.exit_code()
        );
    }

    #[test]
    fn queries_preserve_order() {
        let report = RunReport::new(
            Utc::now(),
            vec![
                succeeded("a"),
                failed("b", false),
                succeeded("c"),
                skipped("d", SkipReason::PrerequisiteNotSatisfied),
            ],
            false,
            false,
        );

        assert_eq!(report.succeeded_steps(), vec!["a", "c"]);
        assert_eq!(report.failed_steps(), vec!["b"]);
        assert_eq!(report.skipped_steps(), vec!["d"]);
        assert_eq!(report.outcome("b").unwrap().status, StepStatus::Failed);
        assert!(report.outcome("zzz").is_none());
    }

    #[test]
    fn render_shows_reasons_and_captured_output() {
        let report = RunReport::new(
            Utc::now(),
            vec![
                succeeded("packages"),
                failed("firewall", false),
                skipped("hotspot", SkipReason::PrerequisiteNotSatisfied),
            ],
            false,
            false,
        );

        let text = report.to_string();
        assert!(text.contains("packages"));
        assert!(text.contains("command failure:"));
        assert!(text.contains("$ ufw enable"));
        assert!(text.contains("problem running iptables"));
        assert!(text.contains("skipped: prerequisite not satisfied"));
        assert!(text.contains("1 succeeded, 1 skipped, 1 failed"));
        assert!(text.contains("Provisioning partial failure"));
    }

    #[test]
    fn summary_omits_satisfied_steps() {
        let report = RunReport::new(
            Utc::now(),
            vec![succeeded("packages"), failed("firewall", false)],
            false,
            false,
        );

        let summary = report.render_summary(&ProvisorTheme::plain());
        assert!(!summary.contains("packages"));
        assert!(summary.contains("firewall output:"));
        assert!(summary.contains("$ ufw enable"));
        assert!(summary.ends_with("Provisioning partial failure"));
    }

    #[test]
    fn json_round_trip_keeps_order_and_status() {
        let report = RunReport::new(
            Utc::now(),
            vec![succeeded("a"), failed("b", true)],
            true,
            false,
        );

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["overall_status"], "aborted");
        assert_eq!(value["steps"][0]["step_name"], "a");
        assert_eq!(value["steps"][1]["error"]["kind"], "command_failure");

        let parsed = RunReport::from_json(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn write_json_creates_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("reports/run.json");
        let report = RunReport::new(Utc::now(), vec![succeeded("a")], false, false);

        report.write_json(&path).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("\"step_name\": \"a\""));
    }

    #[test]
    fn tail_keeps_last_lines() {
        let output = "1\n2\n\n3\n4\n";
        assert_eq!(tail(output, 2), vec!["3", "4"]);
        assert_eq!(tail(output, 10), vec!["1", "2", "3", "4"]);
    }
}
