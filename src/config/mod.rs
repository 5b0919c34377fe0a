//! Configuration loading, resolution, and validation.
//!
//! This module handles all aspects of configuration:
//! - The resolved record and its YAML file form in [`record`]
//! - Pre-run resolution through prompts in [`resolve`]
//! - Validation in [`validator`]
//! - `${var}` interpolation for payload templates in [`interpolation`]
//! - `.env` rendering and parsing in [`env_file`]
//!
//! # Example
//!
//! ```
//! use provisor::config::{ConfigFile, ConfigResolver};
//! use provisor::ui::{NonInteractiveUI, OutputMode};
//! use std::collections::HashMap;
//!
//! let file = ConfigFile::parse(
//!     "database_password: s3cret\nhotspot_password: classroom\nbackend_dir: /srv/lab/backend\n",
//! )
//! .unwrap();
//! let mut ui = NonInteractiveUI::with_overrides(OutputMode::Quiet, HashMap::new());
//!
//! let config = ConfigResolver::new(file).resolve(&mut ui).unwrap();
//! assert_eq!(config.api_url(), "http://192.168.4.1:8080/api/v1");
//! ```

pub mod env_file;
pub mod interpolation;
pub mod record;
pub mod resolve;
pub mod validator;

pub use env_file::EnvFile;
pub use interpolation::{extract_variables, parse_interpolation, render_template, Variables};
pub use record::{defaults, ConfigFile, ProvisionConfig};
pub use resolve::{generate_jwt_secret, ConfigResolver};
pub use validator::{ensure_valid, validate_config, ValidationError};
