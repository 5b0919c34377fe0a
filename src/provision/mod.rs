//! The LearnLab host provisioning steps.
//!
//! [`build_registry`] turns a resolved [`ProvisionConfig`] into a validated
//! registry of steps. Every payload (config files, unit files, SQL) is
//! rendered here, before the run, and captured by value in the step
//! closures.
//!
//! # Example
//!
//! ```
//! use provisor::config::{ConfigFile, ConfigResolver};
//! use provisor::provision::{build_registry, HostPaths};
//! use provisor::ui::MockUI;
//!
//! let file = ConfigFile::parse(
//!     "database_password: s3cret\nhotspot_password: classroom\nbackend_dir: /opt/lab/backend\n",
//! )
//! .unwrap();
//! let config = ConfigResolver::new(file).resolve(&mut MockUI::new()).unwrap();
//!
//! let registry = build_registry(&config, &HostPaths::system()).unwrap();
//! assert_eq!(registry.order()[0], "backend_layout");
//! assert!(registry.get("wifi_hotspot").is_some());
//! ```

pub mod backend;
pub mod database;
pub mod firewall;
pub mod hotspot;
pub mod packages;
pub mod scaffold;
pub mod services;
pub mod templates;

use std::path::{Path, PathBuf};

use crate::config::{ProvisionConfig, Variables};
use crate::error::Result;
use crate::runner::{StepRegistry, ValidatedRegistry};
use crate::secrets::SecretKeys;

/// Where host paths such as `/etc/hostapd/hostapd.conf` actually live.
///
/// The default root is `/`. Any other root stages the files under that
/// directory instead, which is how tests avoid touching the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    root: PathBuf,
}

impl HostPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The real filesystem.
    pub fn system() -> Self {
        Self::new("/")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether paths map onto the real filesystem.
    pub fn is_system(&self) -> bool {
        self.root == Path::new("/")
    }

    /// Map an absolute host path under the root.
    ///
    /// ```
    /// use provisor::provision::HostPaths;
    /// use std::path::Path;
    ///
    /// let paths = HostPaths::new("/tmp/stage");
    /// assert_eq!(paths.host("/etc/dnsmasq.conf"), Path::new("/tmp/stage/etc/dnsmasq.conf"));
    /// assert_eq!(HostPaths::system().host("/etc/dnsmasq.conf"), Path::new("/etc/dnsmasq.conf"));
    /// ```
    pub fn host(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }
}

impl Default for HostPaths {
    fn default() -> Self {
        Self::system()
    }
}

/// Register every provisioning step for `config` and validate the graph.
///
/// `wifi_hotspot` is only registered when the hotspot is enabled.
pub fn build_registry(config: &ProvisionConfig, paths: &HostPaths) -> Result<ValidatedRegistry> {
    let mut registry = StepRegistry::new();

    registry.register(scaffold::backend_layout(config, paths)?)?;
    registry.register(scaffold::frontend_env(config, paths))?;
    registry.register(packages::system_packages())?;
    registry.register(database::postgresql_service())?;
    registry.register(database::database_bootstrap(config))?;
    registry.register(database::database_tuning(config, paths))?;
    if config.enable_hotspot {
        registry.register(hotspot::wifi_hotspot(config, paths)?)?;
    }
    registry.register(firewall::firewall(config))?;
    registry.register(backend::backend_env(config, paths))?;
    registry.register(backend::go_toolchain(config, paths)?)?;
    registry.register(backend::protoc_plugins(paths))?;
    registry.register(backend::backend_build(config, paths))?;
    registry.register(services::service_units(config, paths)?)?;
    registry.register(services::service_activation())?;

    registry.finalize()
}

/// Values the payload templates may reference.
pub(crate) fn template_vars(config: &ProvisionConfig) -> Variables {
    Variables::new()
        .with("host_ip", &config.host_ip)
        .with("hotspot_ssid", &config.hotspot_ssid)
        .with("hotspot_password", &config.hotspot_password)
        .with("service_user", &config.service_user)
        .with("backend_dir", config.backend_dir.display())
}

/// Values a run must keep out of its output: the configured secrets plus
/// any secret-named entry of the generated env files.
pub fn run_secrets(config: &ProvisionConfig) -> Vec<String> {
    let keys = SecretKeys::new();
    let mut secrets = config.secrets();
    for file in [
        backend::backend_env_file(config),
        scaffold::frontend_env_file(config),
    ] {
        for value in keys.secret_values(file.vars()) {
            if !secrets.contains(&value) {
                secrets.push(value);
            }
        }
    }
    secrets
}

/// What to do after a successful run.
pub fn next_steps(config: &ProvisionConfig) -> Vec<String> {
    let mut steps = Vec::new();
    if config.enable_hotspot {
        steps.push("Reboot to bring up the hotspot: sudo reboot".to_string());
        steps.push(format!(
            "Connect your laptop to the '{}' network",
            config.hotspot_ssid
        ));
    }
    steps.push("Start services: sudo systemctl start learnlab-*".to_string());
    steps.push("Check status: sudo systemctl status learnlab-gateway".to_string());
    steps.push("View logs: sudo journalctl -u learnlab-gateway -f".to_string());
    steps.push(format!("REST API: {}/", config.api_url()));
    steps
}
