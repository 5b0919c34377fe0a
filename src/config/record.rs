//! The configuration record and its file form.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProvisorError, Result};

/// Default values used when neither the file nor the user supplies one.
pub mod defaults {
    pub const DATABASE_NAME: &str = "learnlab";
    pub const DATABASE_USER: &str = "learnlab_user";
    pub const HOST_IP: &str = "192.168.4.1";
    pub const GATEWAY_PORT: u16 = 8080;
    pub const ENABLE_HOTSPOT: bool = true;
    pub const HOTSPOT_SSID: &str = "LearnLab";
    pub const GO_VERSION: &str = "1.21.5";
}

/// Fully resolved provisioning settings.
///
/// Built once before a run and captured by value into step closures, so
/// nothing a step does depends on prompts or ambient process state.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    pub database_name: String,
    pub database_user: String,
    pub database_password: String,
    /// Address clients use to reach the host.
    pub host_ip: String,
    pub gateway_port: u16,
    pub enable_hotspot: bool,
    pub hotspot_ssid: String,
    pub hotspot_password: String,
    pub jwt_secret: String,
    /// Account the backend services run as.
    pub service_user: String,
    pub backend_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub go_version: String,
}

impl ProvisionConfig {
    /// Connection string for the application database.
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@localhost:5432/{}?sslmode=disable",
            self.database_user, self.database_password, self.database_name
        )
    }

    /// Public REST endpoint of the gateway.
    pub fn api_url(&self) -> String {
        format!("http://{}:{}/api/v1", self.host_ip, self.gateway_port)
    }

    /// Values that must never appear in output.
    pub fn secrets(&self) -> Vec<String> {
        let mut secrets = vec![
            self.database_password.clone(),
            self.jwt_secret.clone(),
            self.database_url(),
        ];
        if self.enable_hotspot {
            secrets.push(self.hotspot_password.clone());
        }
        secrets.retain(|s| !s.is_empty());
        secrets
    }

    /// Non-secret settings as display pairs.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("Database", self.database_name.clone()),
            ("Database user", self.database_user.clone()),
            ("Host IP", self.host_ip.clone()),
            ("Gateway port", self.gateway_port.to_string()),
            ("Service user", self.service_user.clone()),
            ("Backend", self.backend_dir.display().to_string()),
            ("Frontend", self.frontend_dir.display().to_string()),
        ];
        if self.enable_hotspot {
            pairs.push(("Hotspot SSID", self.hotspot_ssid.clone()));
        }
        pairs
    }
}

impl fmt::Debug for ProvisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionConfig")
            .field("database_name", &self.database_name)
            .field("database_user", &self.database_user)
            .field("database_password", &"[REDACTED]")
            .field("host_ip", &self.host_ip)
            .field("gateway_port", &self.gateway_port)
            .field("enable_hotspot", &self.enable_hotspot)
            .field("hotspot_ssid", &self.hotspot_ssid)
            .field("hotspot_password", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("service_user", &self.service_user)
            .field("backend_dir", &self.backend_dir)
            .field("frontend_dir", &self.frontend_dir)
            .field("go_version", &self.go_version)
            .finish()
    }
}

/// Settings loaded from a YAML file; anything missing is resolved later.
///
/// ```
/// use provisor::config::ConfigFile;
///
/// let file = ConfigFile::parse("database_name: lab\ngateway_port: 9090\n").unwrap();
/// assert_eq!(file.database_name.as_deref(), Some("lab"));
/// assert_eq!(file.gateway_port, Some(9090));
/// assert!(file.database_password.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub database_name: Option<String>,
    pub database_user: Option<String>,
    pub database_password: Option<String>,
    pub host_ip: Option<String>,
    pub gateway_port: Option<u16>,
    pub enable_hotspot: Option<bool>,
    pub hotspot_ssid: Option<String>,
    pub hotspot_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub service_user: Option<String>,
    pub backend_dir: Option<PathBuf>,
    pub frontend_dir: Option<PathBuf>,
    pub go_version: Option<String>,
}

impl ConfigFile {
    /// Parse YAML content. An empty document is an empty file.
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load a config file.
    ///
    /// Returns `ConfigNotFound` if the file doesn't exist and
    /// `ConfigParseError` if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProvisorError::ConfigNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ProvisorError::Io(e)
            }
        })?;

        Self::parse(&content).map_err(|e| ProvisorError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_config() -> ProvisionConfig {
    ProvisionConfig {
        database_name: "learnlab".into(),
        database_user: "learnlab_user".into(),
        database_password: "db-pass-123".into(),
        host_ip: "192.168.4.1".into(),
        gateway_port: 8080,
        enable_hotspot: true,
        hotspot_ssid: "LearnLab".into(),
        hotspot_password: "wifi-pass-123".into(),
        jwt_secret: "feedface".into(),
        service_user: "pi".into(),
        backend_dir: PathBuf::from("/opt/learnlab/backend"),
        frontend_dir: PathBuf::from("/opt/learnlab"),
        go_version: "1.21.5".into(),
    }
}
