//! Plan command implementation.
//!
//! `provisor plan` prints the steps a run would evaluate, in order, without
//! prompting or touching the host.

use crate::cli::args::PlanArgs;
use crate::config::{ConfigFile, ConfigResolver, ProvisionConfig};
use crate::error::Result;
use crate::provision::build_registry;
use crate::runner::ValidatedRegistry;
use crate::ui::{NonInteractiveUI, UserInterface};

use super::dispatcher::{Command, CommandResult, GlobalOptions};

/// Stands in for secrets nobody supplied; the plan never uses them.
const PLACEHOLDER_SECRET: &str = "unset-secret";

/// The plan command implementation.
pub struct PlanCommand {
    options: GlobalOptions,
    args: PlanArgs,
}

impl PlanCommand {
    pub fn new(options: GlobalOptions, args: PlanArgs) -> Self {
        Self { options, args }
    }

    fn resolve(&self, ui: &dyn UserInterface) -> Result<ProvisionConfig> {
        let mut file = self.options.load_config_file()?;
        fill_secrets(&mut file);

        let mut resolver = ConfigResolver::new(file);
        if let Some(dir) = &self.args.backend_dir {
            resolver = resolver.with_backend_dir(dir);
        }
        if let Some(dir) = &self.args.frontend_dir {
            resolver = resolver.with_frontend_dir(dir);
        }
        resolver.resolve(&mut NonInteractiveUI::new(ui.output_mode()))
    }
}

fn fill_secrets(file: &mut ConfigFile) {
    for secret in [
        &mut file.database_password,
        &mut file.hotspot_password,
        &mut file.jwt_secret,
    ] {
        secret.get_or_insert_with(|| PLACEHOLDER_SECRET.to_string());
    }
}

/// One line per step: position, name, criticality and prerequisites.
pub fn plan_lines(registry: &ValidatedRegistry) -> Vec<String> {
    registry
        .ordered_steps()
        .enumerate()
        .map(|(index, step)| {
            let mut line = format!("{:>2}. {}", index + 1, step.name());
            if !step.is_critical() {
                line.push_str(" (optional)");
            }
            if !step.prerequisites().is_empty() {
                line.push_str(&format!(" <- {}", step.prerequisites().join(", ")));
            }
            line
        })
        .collect()
}

impl Command for PlanCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = self.resolve(ui)?;
        let registry = build_registry(&config, &self.options.paths)?;

        ui.show_header("Provisioning plan");
        for line in plan_lines(&registry) {
            ui.message(&line);
        }
        ui.message("");
        ui.message(&format!(
            "{} steps; optional steps may fail without stopping the run",
            registry.len()
        ));

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::HostPaths;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plan_lists_every_step_in_order() {
        let temp = TempDir::new().unwrap();
        let cmd = PlanCommand::new(
            GlobalOptions {
                config: None,
                paths: HostPaths::new(temp.path()),
            },
            PlanArgs {
                backend_dir: Some(temp.path().join("backend")),
                frontend_dir: None,
            },
        );
        let mut ui = MockUI::new();

        let result = cmd.execute(&mut ui).unwrap();

        assert!(result.success);
        assert!(ui.prompts_shown().is_empty());
        assert_eq!(ui.messages()[0], " 1. backend_layout");
        assert_eq!(ui.messages()[1], " 2. frontend_env (optional)");
        assert!(ui.has_message("backend_env <- backend_layout"));
        assert!(ui.has_message("service_activation <- service_units, postgresql_service"));
        assert!(ui.has_message("14 steps"));
    }

    #[test]
    fn plan_follows_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lab.yml");
        fs::write(&path, "enable_hotspot: false\n").unwrap();
        let cmd = PlanCommand::new(
            GlobalOptions {
                config: Some(path),
                paths: HostPaths::new(temp.path()),
            },
            PlanArgs::default(),
        );
        let mut ui = MockUI::new();

        cmd.execute(&mut ui).unwrap();

        assert!(!ui.has_message("wifi_hotspot"));
        assert!(ui.has_message("13 steps"));
    }

    #[test]
    fn supplied_secrets_are_kept() {
        let mut file = ConfigFile {
            database_password: Some("given".into()),
            ..Default::default()
        };
        fill_secrets(&mut file);
        assert_eq!(file.database_password.as_deref(), Some("given"));
        assert_eq!(file.jwt_secret.as_deref(), Some(PLACEHOLDER_SECRET));
    }
}
