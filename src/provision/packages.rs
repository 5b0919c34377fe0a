//! System packages from apt.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{ProvisorError, Result};
use crate::shell::CommandOptions;
use crate::steps::{Step, StepContext};

/// Packages the lab server needs.
pub const PACKAGES: &[&str] = &[
    "postgresql-15",
    "postgresql-contrib-15",
    "python3-pip",
    "protobuf-compiler",
    "ufw",
    "hostapd",
    "dnsmasq",
    "make",
    "wget",
];

/// `dpkg-query` format: package name and its installation state.
const DPKG_FORMAT: &str = "-f=${Package}\t${db:Status-Status}\n";

/// Install every package in [`PACKAGES`].
pub fn system_packages() -> Step {
    Step::new("system_packages")
        .description("Install system packages")
        .verify(|ctx| {
            let installed = installed_packages(ctx, PACKAGES)?;
            let missing: Vec<_> = PACKAGES
                .iter()
                .filter(|p| !installed.contains(**p))
                .collect();
            debug!(?missing, "package check");
            Ok(missing.is_empty())
        })
        .apply(|ctx| {
            let options = CommandOptions::default().with_env("DEBIAN_FRONTEND", "noninteractive");
            ctx.run_with("apt-get", &["update"], &options)?;

            let mut args = vec!["install", "-y"];
            args.extend_from_slice(PACKAGES);
            ctx.run_with("apt-get", &args, &options)?;
            Ok(())
        })
}

/// Which of `packages` dpkg reports as installed.
///
/// Unknown packages make `dpkg-query` exit non-zero, so the exit code is
/// ignored. A missing `dpkg-query` means nothing is installed.
fn installed_packages(ctx: &mut StepContext<'_>, packages: &[&str]) -> Result<BTreeSet<String>> {
    let mut args = vec!["-W", DPKG_FORMAT];
    args.extend_from_slice(packages);

    match ctx.probe("dpkg-query", &args) {
        Ok(result) => Ok(parse_dpkg_status(&result.stdout)),
        Err(ProvisorError::LaunchFailure { .. }) => Ok(BTreeSet::new()),
        Err(e) => Err(e),
    }
}

fn parse_dpkg_status(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .filter(|(_, status)| status.trim() == "installed")
        .map(|(name, _)| name.trim().to_string())
        .collect()
}
