//! Sequential step execution.
//!
//! The [`Orchestrator`] walks a [`ValidatedRegistry`] in its fixed order and
//! records exactly one [`StepOutcome`] per step:
//!
//! 1. A step whose prerequisites are not all satisfied is skipped.
//! 2. Otherwise `verify` runs (unless forced); `Ok(true)` skips the step as
//!    already applied.
//! 3. Otherwise `apply` runs. A failure of a critical step, or a launch
//!    failure anywhere, aborts the run and every remaining step is skipped.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::ProvisorError;
use crate::runner::registry::ValidatedRegistry;
use crate::runner::report::RunReport;
use crate::secrets::OutputMasker;
use crate::shell::{CommandOptions, CommandRunner};
use crate::steps::{SkipReason, Step, StepContext, StepFailure, StepOutcome};

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A step is about to be evaluated.
    StepStarting {
        name: &'a str,
        index: usize,
        total: usize,
    },
    /// A step reached its terminal status.
    StepFinished { outcome: &'a StepOutcome },
}

/// Cooperative cancellation flag, checked before each step starts.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The step in flight finishes first.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for a single run.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Steps that skip `verify` and always apply.
    pub force: HashSet<String>,
    /// Run `verify` only; steps that would apply are skipped.
    pub dry_run: bool,
    /// Default timeout for every command a step runs.
    pub command_timeout: Option<Duration>,
    /// Environment overlay for every command a step runs.
    pub env: HashMap<String, String>,
    /// Values scrubbed from recorded output and error messages.
    pub secrets: Vec<String>,
    /// Checked before each step.
    pub cancel: Option<CancelToken>,
}

impl RunOptions {
    fn command_defaults(&self) -> CommandOptions {
        CommandOptions {
            cwd: None,
            env: self.env.clone(),
            timeout: self.command_timeout,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Executes the steps of a validated registry, once.
///
/// `run` consumes the orchestrator; the registry it borrows may be handed
/// to a fresh orchestrator for another run.
pub struct Orchestrator<'a> {
    registry: &'a ValidatedRegistry,
    runner: &'a dyn CommandRunner,
}

/// How a single evaluated step ended, before abort bookkeeping.
enum Evaluation {
    Done,
    Failed { abort: bool },
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a ValidatedRegistry, runner: &'a dyn CommandRunner) -> Self {
        Self { registry, runner }
    }

    /// Run every step and return the report.
    pub fn run(self, options: &RunOptions) -> RunReport {
        self.run_with_progress(options, |_| {})
    }

    /// Run every step, reporting progress through `on_progress`.
    pub fn run_with_progress(
        self,
        options: &RunOptions,
        mut on_progress: impl FnMut(RunProgress<'_>),
    ) -> RunReport {
        let started_at = Utc::now();
        let total = self.registry.len();

        let mut masker = OutputMasker::new();
        masker.add_secrets(options.secrets.iter().cloned());

        let steps: Vec<&Step> = self.registry.ordered_steps().collect();
        let mut outcomes: Vec<StepOutcome> = steps
            .iter()
            .map(|s| StepOutcome::pending(s.name(), s.is_critical()))
            .collect();
        let mut satisfied: HashMap<&str, bool> = HashMap::new();
        let mut halted: Option<SkipReason> = None;

        for (index, step) in steps.iter().enumerate() {
            let outcome = &mut outcomes[index];
            on_progress(RunProgress::StepStarting {
                name: step.name(),
                index,
                total,
            });

            if let Some(reason) = halted {
                outcome.skip(reason, None);
            } else if !prerequisites_met(step, &satisfied) {
                tracing::info!(step = step.name(), "Skipping: prerequisite not satisfied");
                outcome.skip(SkipReason::PrerequisiteNotSatisfied, None);
            } else if options.is_cancelled() {
                tracing::warn!(step = step.name(), "Run cancelled");
                outcome.skip(SkipReason::Cancelled, None);
                halted = Some(SkipReason::Cancelled);
            } else if let Evaluation::Failed { abort: true } =
                self.evaluate(step, outcome, options)
            {
                tracing::error!(step = step.name(), "Critical failure, aborting run");
                halted = Some(SkipReason::AbortedAfterCriticalFailure);
            }

            outcome.mask(&masker);
            satisfied.insert(step.name(), outcome.is_satisfied());
            on_progress(RunProgress::StepFinished { outcome: &*outcome });
        }

        let report = RunReport::new(started_at, outcomes, halted.is_some(), options.dry_run);
        tracing::info!(status = %report.overall_status(), "Run finished");
        report
    }

    /// Verify then apply one step, recording its terminal status.
    fn evaluate(&self, step: &Step, outcome: &mut StepOutcome, options: &RunOptions) -> Evaluation {
        let mut ctx = StepContext::new(step.name(), self.runner, options.command_defaults());
        outcome.begin();

        let forced = options.force.contains(step.name());
        if !forced {
            match step.run_verify(&mut ctx) {
                Some(Ok(true)) => {
                    tracing::info!(step = step.name(), "Already applied");
                    outcome.skip(SkipReason::AlreadyApplied, ctx.last_detail());
                    return Evaluation::Done;
                }
                Some(Ok(false)) | None => {}
                Some(Err(e)) => return fail(step, outcome, &ctx, &e),
            }
        }

        if options.dry_run {
            tracing::info!(step = step.name(), "Would apply");
            outcome.skip(SkipReason::DryRun, ctx.last_detail());
            return Evaluation::Done;
        }

        tracing::info!(step = step.name(), forced, "Applying");
        match step.run_apply(&mut ctx) {
            Ok(()) => {
                outcome.succeed(ctx.last_detail());
                Evaluation::Done
            }
            Err(e) => fail(step, outcome, &ctx, &e),
        }
    }
}

fn fail(
    step: &Step,
    outcome: &mut StepOutcome,
    ctx: &StepContext<'_>,
    err: &ProvisorError,
) -> Evaluation {
    tracing::warn!(step = step.name(), kind = %err.kind(), "Step failed: {}", err);
    outcome.fail(StepFailure::from(err), ctx.last_detail());
    Evaluation::Failed {
        abort: step.is_critical() || err.is_always_critical(),
    }
}

fn prerequisites_met(step: &Step, satisfied: &HashMap<&str, bool>) -> bool {
    step.prerequisites()
        .iter()
        .all(|p| satisfied.get(p.as_str()).copied().unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::registry::StepRegistry;
    use crate::runner::report::OverallStatus;
    use crate::shell::{MockResponse, MockRunner};
    use crate::steps::StepStatus;

    fn build(steps: Vec<Step>) -> ValidatedRegistry {
        let mut registry = StepRegistry::new();
        for step in steps {
            registry.register(step).unwrap();
        }
        registry.finalize().unwrap()
    }

    fn cmd(name: &str, program: &'static str) -> Step {
        Step::new(name).apply(move |ctx| {
            ctx.run(program, &[] as &[&str])?;
            Ok(())
        })
    }

    #[test]
    fn empty_registry_succeeds() {
        let registry = build(vec![]);
        let runner = MockRunner::new();
        let report = Orchestrator::new(&registry, &runner).run(&RunOptions::default());
        assert_eq!(report.overall_status(), OverallStatus::Success);
        assert!(report.outcomes().is_empty());
    }

    #[test]
    fn verify_satisfied_skips_apply() {
        let registry = build(vec![cmd("a", "install").verify(|_| Ok(true))]);
        let runner = MockRunner::new();

        let report = Orchestrator::new(&registry, &runner).run(&RunOptions::default());

        let outcome = report.outcome("a").unwrap();
        assert_eq!(outcome.status, StepStatus::Skipped);
        assert_eq!(outcome.skip_reason, Some(SkipReason::AlreadyApplied));
        assert_eq!(runner.count("install"), 0);
        assert_eq!(report.overall_status(), OverallStatus::Success);
    }

    #[test]
    fn force_bypasses_verify() {
        let registry = build(vec![cmd("a", "install").verify(|_| Ok(true))]);
        let runner = MockRunner::new();
        let options = RunOptions {
            force: ["a".to_string()].into_iter().collect(),
            ..Default::default()
        };

        let report = Orchestrator::new(&registry, &runner).run(&options);

        assert_eq!(report.outcome("a").unwrap().status, StepStatus::Succeeded);
        assert_eq!(runner.count("install"), 1);
    }

    #[test]
    fn dry_run_never_applies() {
        let registry = build(vec![
            cmd("a", "install").verify(|_| Ok(false)),
            cmd("b", "configure").requires(["a"]),
        ]);
        let runner = MockRunner::new();
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = Orchestrator::new(&registry, &runner).run(&options);

        assert!(runner.commands().is_empty());
        assert_eq!(report.skipped_steps(), vec!["a", "b"]);
        assert_eq!(
            report.outcome("b").unwrap().skip_reason,
            Some(SkipReason::DryRun)
        );
        assert!(report.is_dry_run());
        assert_eq!(report.overall_status(), OverallStatus::Success);
    }

    #[test]
    fn verify_error_fails_step() {
        let registry = build(vec![Step::new("a")
            .critical(false)
            .verify(|ctx| Ok(ctx.run("psql", &["-c", "select 1"])?.success))]);
        let runner = MockRunner::new();
        runner.respond("psql", MockResponse::fail(2, "connection refused"));

        let report = Orchestrator::new(&registry, &runner).run(&RunOptions::default());

        let outcome = report.outcome("a").unwrap();
        assert_eq!(outcome.status, StepStatus::Failed);
        assert_eq!(
            outcome.exit_detail.as_ref().unwrap().stderr,
            "connection refused"
        );
        assert_eq!(report.overall_status(), OverallStatus::PartialFailure);
    }

    #[test]
    fn launch_failure_aborts_even_when_not_critical() {
        let registry = build(vec![
            cmd("a", "ufw").critical(false),
            cmd("b", "systemctl").critical(false),
        ]);
        let runner = MockRunner::new();
        runner.respond("ufw", MockResponse::not_found());

        let report = Orchestrator::new(&registry, &runner).run(&RunOptions::default());

        assert_eq!(report.overall_status(), OverallStatus::Aborted);
        assert_eq!(
            report.outcome("b").unwrap().skip_reason,
            Some(SkipReason::AbortedAfterCriticalFailure)
        );
        assert_eq!(runner.count("systemctl"), 0);
    }

    #[test]
    fn cancellation_stops_before_next_step() {
        let token = CancelToken::new();
        let trigger = token.clone();
        let registry = build(vec![
            Step::new("a").apply(move |_| {
                trigger.cancel();
                Ok(())
            }),
            cmd("b", "make"),
            cmd("c", "make"),
        ]);
        let runner = MockRunner::new();
        let options = RunOptions {
            cancel: Some(token),
            ..Default::default()
        };

        let report = Orchestrator::new(&registry, &runner).run(&options);

        assert_eq!(report.outcome("a").unwrap().status, StepStatus::Succeeded);
        for name in ["b", "c"] {
            assert_eq!(
                report.outcome(name).unwrap().skip_reason,
                Some(SkipReason::Cancelled)
            );
        }
        assert_eq!(report.overall_status(), OverallStatus::Aborted);
        assert_eq!(runner.count("make"), 0);
    }

    #[test]
    fn command_defaults_reach_runner() {
        let registry = build(vec![cmd("a", "apt-get")]);
        let runner = MockRunner::new();
        let options = RunOptions {
            command_timeout: Some(Duration::from_secs(30)),
            env: [("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };

        Orchestrator::new(&registry, &runner).run(&options);

        let call = &runner.calls()[0];
        assert_eq!(call.options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(
            call.options.env.get("DEBIAN_FRONTEND").map(String::as_str),
            Some("noninteractive")
        );
    }

    #[test]
    fn secrets_are_masked_in_outcomes() {
        let registry = build(vec![Step::new("db").critical(false).apply(|ctx| {
            ctx.run("psql", &["-c", "ALTER USER app PASSWORD 's3cret-pw'"])?;
            Ok(())
        })]);
        let runner = MockRunner::new();
        runner.respond("psql", MockResponse::fail(1, "syntax error near s3cret-pw"));
        let options = RunOptions {
            secrets: vec!["s3cret-pw".to_string()],
            ..Default::default()
        };

        let report = Orchestrator::new(&registry, &runner).run(&options);

        let json = report.to_json().unwrap();
        assert!(!json.contains("s3cret-pw"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn progress_events_cover_every_step() {
        let registry = build(vec![
            cmd("a", "true"),
            cmd("b", "true").requires(["a"]),
        ]);
        let runner = MockRunner::new();
        let mut events = Vec::new();

        Orchestrator::new(&registry, &runner).run_with_progress(
            &RunOptions::default(),
            |event| match event {
                RunProgress::StepStarting { name, index, total } => {
                    events.push(format!("start {} {}/{}", name, index + 1, total))
                }
                RunProgress::StepFinished { outcome } => {
                    events.push(format!("done {} {}", outcome.step_name, outcome.status))
                }
            },
        );

        assert_eq!(
            events,
            vec![
                "start a 1/2",
                "done a succeeded",
                "start b 2/2",
                "done b succeeded"
            ]
        );
    }

    #[test]
    fn registry_is_reusable_across_runs() {
        let registry = build(vec![cmd("a", "true")]);
        let runner = MockRunner::new();

        let first = Orchestrator::new(&registry, &runner).run(&RunOptions::default());
        let second = Orchestrator::new(&registry, &runner).run(&RunOptions::default());

        assert_eq!(first.outcomes().len(), second.outcomes().len());
        assert_eq!(runner.count("true"), 2);
    }
}
