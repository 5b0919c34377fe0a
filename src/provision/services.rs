//! systemd units for the backend services and the gateway.

use std::path::PathBuf;

use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::steps::check::{command_succeeds, file_has_content};
use crate::steps::Step;

use super::backend::SERVICES;
use super::{template_vars, templates, HostPaths};

pub const SYSTEMD_DIR: &str = "/etc/systemd/system";

/// Binaries that get a unit: every backend service plus the gateway.
pub fn service_binaries() -> Vec<&'static str> {
    SERVICES
        .iter()
        .map(|s| s.name)
        .chain(std::iter::once("gateway"))
        .collect()
}

/// systemd unit name for a service binary.
pub fn unit_name(binary: &str) -> String {
    format!("learnlab-{}", binary)
}

/// Write a unit file for each service and reload systemd.
pub fn service_units(config: &ProvisionConfig, paths: &HostPaths) -> Result<Step> {
    let mut units: Vec<(PathBuf, String)> = Vec::new();
    for binary in service_binaries() {
        let vars = template_vars(config).with("service", binary);
        let path = paths
            .host(SYSTEMD_DIR)
            .join(format!("{}.service", unit_name(binary)));
        units.push((path, templates::render("learnlab.service", &vars)?));
    }
    let verify_units = units.clone();

    Ok(Step::new("service_units")
        .requires(["backend_build"])
        .description("Write systemd units")
        .verify(move |_| {
            Ok(verify_units
                .iter()
                .all(|(path, content)| file_has_content(path, content)))
        })
        .apply(move |ctx| {
            for (path, content) in &units {
                ctx.write_file(path, content)?;
            }
            ctx.run("systemctl", &["daemon-reload"])?;
            Ok(())
        }))
}

/// Enable every unit so the services start at boot.
pub fn service_activation() -> Step {
    let units: Vec<String> = service_binaries().into_iter().map(unit_name).collect();
    let verify_units = units.clone();

    Step::new("service_activation")
        .requires(["service_units", "postgresql_service"])
        .description("Enable backend services")
        .verify(move |ctx| {
            for unit in &verify_units {
                if !command_succeeds(ctx, "systemctl", &["is-enabled", "--quiet", unit.as_str()])? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
        .apply(move |ctx| {
            for unit in &units {
                ctx.run("systemctl", &["enable", unit.as_str()])?;
            }
            Ok(())
        })
}
