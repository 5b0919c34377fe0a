//! Run command implementation.
//!
//! The `provisor run` command resolves the settings, builds the step
//! registry and provisions the host.

use std::collections::HashSet;
use std::time::Duration;

use tracing::debug;

use crate::cli::args::RunArgs;
use crate::config::{ConfigFile, ConfigResolver, ProvisionConfig};
use crate::error::{ProvisorError, Result};
use crate::provision::{build_registry, next_steps, run_secrets};
use crate::runner::{
    Orchestrator, OverallStatus, RunOptions, RunProgress, RunReport, ValidatedRegistry,
};
use crate::shell::{is_elevated, is_raspberry_pi, CommandRunner};
use crate::steps::{StepOutcome, StepStatus};
use crate::ui::{format_duration, OutputMode, SpinnerHandle, UserInterface};

use super::dispatcher::{Command, CommandResult, GlobalOptions};

/// The run command implementation.
pub struct RunCommand<'a> {
    options: GlobalOptions,
    args: RunArgs,
    runner: &'a dyn CommandRunner,
}

impl<'a> RunCommand<'a> {
    /// Create a new run command executing through `runner`.
    pub fn new(options: GlobalOptions, args: RunArgs, runner: &'a dyn CommandRunner) -> Self {
        Self {
            options,
            args,
            runner,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Changing the real host needs root; dry runs and staged roots don't.
    fn needs_root(&self) -> bool {
        !self.args.dry_run && self.options.paths.is_system()
    }

    fn resolver(&self, file: ConfigFile) -> ConfigResolver {
        let mut resolver = ConfigResolver::new(file);
        if let Some(dir) = &self.args.backend_dir {
            resolver = resolver.with_backend_dir(dir);
        }
        if let Some(dir) = &self.args.frontend_dir {
            resolver = resolver.with_frontend_dir(dir);
        }
        resolver
    }

    /// Build run options from args.
    fn build_options(&self, config: &ProvisionConfig) -> RunOptions {
        RunOptions {
            force: self.args.force.iter().cloned().collect(),
            dry_run: self.args.dry_run,
            command_timeout: (self.args.timeout > 0).then(|| Duration::from_secs(self.args.timeout)),
            secrets: run_secrets(config),
            ..Default::default()
        }
    }

    /// Reject `--force` names that match no registered step.
    fn check_forced(&self, registry: &ValidatedRegistry) -> Result<()> {
        let known: HashSet<&str> = registry.order().into_iter().collect();
        let unknown: Vec<&str> = self
            .args
            .force
            .iter()
            .map(String::as_str)
            .filter(|name| !known.contains(name))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ProvisorError::ConfigValidationError {
                message: format!("--force names unknown steps: {}", unknown.join(", ")),
            })
        }
    }

    fn report_result(
        &self,
        registry: &ValidatedRegistry,
        report: &RunReport,
        config: &ProvisionConfig,
        ui: &mut dyn UserInterface,
    ) {
        let theme = ui.theme();
        let rendered = if ui.output_mode() == OutputMode::Verbose {
            report.render(&theme)
        } else {
            report.render_summary(&theme)
        };
        ui.message("");
        ui.message(&rendered);

        match report.overall_status() {
            OverallStatus::Success if !report.is_dry_run() => {
                ui.message("");
                ui.message(&theme.format_header("Configuration"));
                for (key, value) in config.summary() {
                    ui.message(&theme.format_pair(key, &value));
                }
                ui.message("");
                ui.message(&theme.format_header("Next steps"));
                for hint in next_steps(config) {
                    ui.message(&format!("  {}", hint));
                }
            }
            OverallStatus::Success => {}
            OverallStatus::PartialFailure => {
                ui.warning(&format!(
                    "Some optional steps failed: {}",
                    report.failed_steps().join(", ")
                ));
            }
            OverallStatus::Aborted => {
                ui.error("Provisioning stopped; fix the error above and run again");
            }
        }

        for failed in report.failed_steps() {
            let dependents = registry.dependents_of(failed);
            if !dependents.is_empty() {
                ui.message(&format!("  {} is required by: {}", failed, dependents.join(", ")));
            }
        }
    }
}

impl Command for RunCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if self.needs_root() && !is_elevated() {
            ui.error("Provisioning changes system files; run with sudo, or use --dry-run");
            return Ok(CommandResult::failure(1));
        }

        let file = self.options.load_config_file()?;

        ui.show_header("Learn Lab server provisioning");
        if self.options.paths.is_system() && !is_raspberry_pi() {
            ui.warning("This does not look like a Raspberry Pi; continuing anyway");
        }

        let config = self.resolver(file).resolve(ui)?;
        debug!(?config, "Settings resolved");

        let registry = build_registry(&config, &self.options.paths)?;
        self.check_forced(&registry)?;
        let options = self.build_options(&config);

        if self.args.dry_run {
            ui.message("Dry run: checking every step without changing the host");
        }

        let mut spinner: Option<Box<dyn SpinnerHandle>> = None;
        let report = Orchestrator::new(&registry, self.runner).run_with_progress(
            &options,
            |progress| match progress {
                RunProgress::StepStarting { name, index, total } => {
                    spinner = Some(ui.start_spinner(&format!("[{}/{}] {}", index + 1, total, name)));
                }
                RunProgress::StepFinished { outcome } => {
                    if let Some(mut s) = spinner.take() {
                        finish_spinner(s.as_mut(), outcome);
                    }
                }
            },
        );

        if let Some(path) = &self.args.report {
            report.write_json(path)?;
            debug!(path = %path.display(), "Report written");
        }

        self.report_result(&registry, &report, &config, ui);

        let status = report.overall_status();
        Ok(CommandResult {
            success: status.is_success(),
            exit_code: status.exit_code(),
        })
    }
}

/// Close a step's spinner with its terminal status.
fn finish_spinner(spinner: &mut dyn SpinnerHandle, outcome: &StepOutcome) {
    let name = &outcome.step_name;
    match outcome.status {
        StepStatus::Succeeded => {
            let duration = format_duration(outcome.duration().unwrap_or_default());
            spinner.finish_success(&format!("{} ({})", name, duration));
        }
        StepStatus::Failed => {
            let message = outcome
                .error
                .as_ref()
                .map(|e| format!("{} failed: {}", name, e.message))
                .unwrap_or_else(|| format!("{} failed", name));
            spinner.finish_error(&message);
        }
        _ => {
            let reason = outcome
                .skip_reason
                .map(|r| r.description())
                .unwrap_or("skipped");
            spinner.finish_skipped(&format!("{} ({})", name, reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::HostPaths;
    use crate::shell::{MockResponse, MockRunner};
    use crate::ui::{MockUI, SpinnerStatus};
    use std::path::Path;
    use tempfile::TempDir;

    fn staged(root: &Path) -> GlobalOptions {
        GlobalOptions {
            config: None,
            paths: HostPaths::new(root),
        }
    }

    fn answered_ui() -> MockUI {
        let mut ui = MockUI::new();
        ui.set_prompt_response("database_password", "db-secret-1");
        ui.set_prompt_response("hotspot_password", "wifi-pass-123");
        ui.set_prompt_response("service_user", "pi");
        ui
    }

    fn args(root: &Path) -> RunArgs {
        RunArgs {
            backend_dir: Some(root.join("opt/learnlab/backend")),
            ..Default::default()
        }
    }

    #[test]
    fn forced_steps_must_exist() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let mut run_args = args(temp.path());
        run_args.force = vec!["firewall".into(), "nope".into()];
        let cmd = RunCommand::new(staged(temp.path()), run_args, &runner);

        let err = cmd.execute(&mut answered_ui()).unwrap_err();
        assert!(err.to_string().contains("nope"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn dry_run_changes_nothing() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.respond("", MockResponse::fail(1, ""));
        let mut run_args = args(temp.path());
        run_args.dry_run = true;
        let cmd = RunCommand::new(staged(temp.path()), run_args, &runner);
        let mut ui = answered_ui();

        let result = cmd.execute(&mut ui).unwrap();

        assert_eq!(result.exit_code, 0);
        assert!(!temp.path().join("opt/learnlab/backend/Makefile").exists());
        assert!(!ui.has_message("Next steps"));
        assert!(ui
            .spinner_finishes()
            .iter()
            .all(|(status, _)| *status == SpinnerStatus::Skipped));
    }

    #[test]
    fn critical_failure_aborts_with_exit_code() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.respond("dpkg-query", MockResponse::fail(1, ""));
        runner.respond("apt-get update", MockResponse::fail(100, "E: network unreachable"));
        let report_path = temp.path().join("report.json");
        let mut run_args = args(temp.path());
        run_args.report = Some(report_path.clone());
        let cmd = RunCommand::new(staged(temp.path()), run_args, &runner);
        let mut ui = answered_ui();

        let result = cmd.execute(&mut ui).unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, OverallStatus::Aborted.exit_code());
        assert!(ui.has_error("Provisioning stopped"));
        assert!(ui.has_message("network unreachable"));
        assert!(ui.has_message("system_packages is required by: postgresql_service"));

        let report = RunReport::from_json(&std::fs::read_to_string(report_path).unwrap()).unwrap();
        assert_eq!(report.failed_steps(), vec!["system_packages"]);
        assert!(!report.to_json().unwrap().contains("db-secret-1"));
    }

    #[test]
    fn prompts_follow_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("lab.yml");
        std::fs::write(
            &config_path,
            "database_password: from-file\nenable_hotspot: false\nservice_user: lab\n",
        )
        .unwrap();
        let runner = MockRunner::new();
        let mut run_args = args(temp.path());
        run_args.dry_run = true;
        let options = GlobalOptions {
            config: Some(config_path),
            paths: HostPaths::new(temp.path()),
        };
        let mut ui = MockUI::new();
        ui.set_strict_prompts(true);

        RunCommand::new(options, run_args, &runner)
            .execute(&mut ui)
            .unwrap();

        assert!(!ui.prompts_shown().contains(&"database_password".to_string()));
        assert!(!ui.prompts_shown().contains(&"hotspot_ssid".to_string()));
        assert!(ui.spinners().iter().all(|s| !s.contains("wifi_hotspot")));
    }

    #[test]
    fn timeout_zero_disables_deadline() {
        let temp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        let mut run_args = args(temp.path());
        run_args.timeout = 0;
        let cmd = RunCommand::new(staged(temp.path()), run_args, &runner);
        let config = ConfigResolver::new(ConfigFile {
            database_password: Some("pw".into()),
            enable_hotspot: Some(false),
            jwt_secret: Some("jwt".into()),
            ..Default::default()
        })
        .resolve(&mut MockUI::new())
        .unwrap();

        let options = cmd.build_options(&config);
        assert!(options.command_timeout.is_none());
        assert!(options.secrets.contains(&"pw".to_string()));
    }
}
