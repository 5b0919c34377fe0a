//! Pre-run resolution of the configuration record.
//!
//! Every value comes from, in order: an explicit override, the config file,
//! a prompt (answered by the user, a `PROVISOR_PROMPT_<KEY>` variable or the
//! prompt default). Nothing is asked once the run has started.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::record::{defaults, ConfigFile, ProvisionConfig};
use crate::config::validator::ensure_valid;
use crate::error::{ProvisorError, Result};
use crate::shell::invoking_user;
use crate::ui::{Prompt, UserInterface};

/// Bytes of randomness in a generated JWT secret.
const JWT_SECRET_BYTES: usize = 32;

/// Turns a partial [`ConfigFile`] into a complete [`ProvisionConfig`].
///
/// ```
/// use provisor::config::{ConfigFile, ConfigResolver};
/// use provisor::ui::MockUI;
///
/// let file = ConfigFile::parse("database_password: s3cret\nenable_hotspot: false\n").unwrap();
/// let mut ui = MockUI::new();
///
/// let config = ConfigResolver::new(file)
///     .with_backend_dir("/opt/learnlab/backend")
///     .resolve(&mut ui)
///     .unwrap();
///
/// assert_eq!(config.database_name, "learnlab");
/// assert_eq!(config.frontend_dir.to_str(), Some("/opt/learnlab"));
/// assert_eq!(config.jwt_secret.len(), 64);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    file: ConfigFile,
    backend_dir: Option<PathBuf>,
    frontend_dir: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(file: ConfigFile) -> Self {
        Self {
            file,
            ..Default::default()
        }
    }

    /// Override the backend directory from the file.
    pub fn with_backend_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backend_dir = Some(dir.into());
        self
    }

    /// Override the frontend directory from the file.
    pub fn with_frontend_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.frontend_dir = Some(dir.into());
        self
    }

    /// Resolve every field and validate the result.
    pub fn resolve(self, ui: &mut dyn UserInterface) -> Result<ProvisionConfig> {
        let file = self.file;

        let database_name = text(
            ui,
            file.database_name,
            Prompt::input("database_name", "Database name").with_default(defaults::DATABASE_NAME),
        )?;
        let database_user = text(
            ui,
            file.database_user,
            Prompt::input("database_user", "Database user").with_default(defaults::DATABASE_USER),
        )?;
        let database_password = text(
            ui,
            file.database_password,
            Prompt::password("database_password", "Database password"),
        )?;
        let host_ip = text(
            ui,
            file.host_ip,
            Prompt::input("host_ip", "Host IP address").with_default(defaults::HOST_IP),
        )?;
        let gateway_port = match file.gateway_port {
            Some(port) => port,
            None => {
                let prompt = Prompt::input("gateway_port", "API gateway port")
                    .with_default(defaults::GATEWAY_PORT.to_string());
                parse_port(&ui.prompt(&prompt)?.as_string())?
            }
        };

        let enable_hotspot = match file.enable_hotspot {
            Some(enabled) => enabled,
            None => {
                let prompt = Prompt::confirm("enable_hotspot", "Set up a WiFi hotspot?")
                    .with_default(if defaults::ENABLE_HOTSPOT { "yes" } else { "no" });
                ui.prompt(&prompt)?.as_bool()
            }
        };

        let (hotspot_ssid, hotspot_password) = if enable_hotspot {
            let ssid = text(
                ui,
                file.hotspot_ssid,
                Prompt::input("hotspot_ssid", "Hotspot SSID").with_default(defaults::HOTSPOT_SSID),
            )?;
            let password = text(
                ui,
                file.hotspot_password,
                Prompt::password("hotspot_password", "Hotspot password (8+ characters)"),
            )?;
            (ssid, password)
        } else {
            (
                file.hotspot_ssid
                    .unwrap_or_else(|| defaults::HOTSPOT_SSID.to_string()),
                file.hotspot_password.unwrap_or_default(),
            )
        };

        let service_user = text(
            ui,
            file.service_user,
            Prompt::input("service_user", "User to run services as").with_default(invoking_user()),
        )?;

        let jwt_secret = match file.jwt_secret {
            Some(secret) => secret,
            None => {
                debug!("generating JWT secret");
                generate_jwt_secret()?
            }
        };

        let backend_dir = match self.backend_dir.or(file.backend_dir) {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let frontend_dir = self
            .frontend_dir
            .or(file.frontend_dir)
            .unwrap_or_else(|| default_frontend_dir(&backend_dir));

        let config = ProvisionConfig {
            database_name,
            database_user,
            database_password,
            host_ip,
            gateway_port,
            enable_hotspot,
            hotspot_ssid,
            hotspot_password,
            jwt_secret,
            service_user,
            backend_dir,
            frontend_dir,
            go_version: file
                .go_version
                .unwrap_or_else(|| defaults::GO_VERSION.to_string()),
        };

        ensure_valid(&config)?;
        Ok(config)
    }
}

/// File value if present, otherwise ask.
fn text(ui: &mut dyn UserInterface, value: Option<String>, prompt: Prompt) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(ui.prompt(&prompt)?.as_string().trim().to_string()),
    }
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| ProvisorError::ConfigValidationError {
            message: format!("gateway_port: '{}' is not a valid port", value),
        })
}

/// The frontend lives one level above the backend.
fn default_frontend_dir(backend_dir: &Path) -> PathBuf {
    backend_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| backend_dir.to_path_buf())
}

/// Random 256-bit secret from the OS random device, hex encoded.
pub fn generate_jwt_secret() -> Result<String> {
    let mut bytes = [0u8; JWT_SECRET_BYTES];
    File::open("/dev/urandom")?.read_exact(&mut bytes)?;
    Ok(hex::encode(bytes))
}
