//! Configuration validation rules.
//!
//! Everything here runs before any step is registered:
//! - database identifiers are safe to splice into SQL and the URL
//! - the database password is present
//! - hotspot credentials are acceptable to hostapd
//! - the gateway port is usable

use std::sync::LazyLock;

use regex::Regex;

use crate::config::record::ProvisionConfig;
use crate::error::{ProvisorError, Result};

/// Validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field the rule applies to
    pub field: &'static str,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// SQL identifiers that need no quoting.
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("IDENTIFIER must compile")
});

/// Validate a configuration and return all errors.
///
/// All rules are checked so the user can fix every problem at once.
pub fn validate_config(config: &ProvisionConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("database_name", &config.database_name),
        ("database_user", &config.database_user),
    ] {
        if !IDENTIFIER.is_match(value) {
            errors.push(ValidationError::new(
                field,
                format!(
                    "'{}' must start with a letter or underscore and contain only letters, digits and underscores",
                    value
                ),
            ));
        }
    }

    if config.database_password.is_empty() {
        errors.push(ValidationError::new(
            "database_password",
            "must not be empty",
        ));
    }

    if config.enable_hotspot {
        let ssid_len = config.hotspot_ssid.len();
        if ssid_len == 0 || ssid_len > 32 {
            errors.push(ValidationError::new(
                "hotspot_ssid",
                format!("must be 1 to 32 bytes long, got {}", ssid_len),
            ));
        }
        if config.hotspot_password.chars().count() < 8 {
            errors.push(ValidationError::new(
                "hotspot_password",
                "must be at least 8 characters",
            ));
        }
    }

    if config.gateway_port == 0 {
        errors.push(ValidationError::new("gateway_port", "must not be 0"));
    }

    errors
}

/// Fail with a `ConfigValidationError` listing every problem.
pub fn ensure_valid(config: &ProvisionConfig) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(ProvisorError::ConfigValidationError { message })
}
