//! Integration tests for the provisor binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const LAB_CONFIG: &str = r#"
database_password: classroom-db
hotspot_password: classroom-wifi
jwt_secret: abc123
service_user: pi
backend_dir: /opt/learnlab/backend
"#;

fn write_config(content: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("lab.yml"), content).unwrap();
    temp
}

fn provisor() -> Command {
    let mut cmd = Command::new(cargo_bin("provisor"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    provisor()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Learn Lab server"))
        .stdout(predicate::str::contains("plan"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    provisor()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn run_help_lists_flags() -> Result<(), Box<dyn std::error::Error>> {
    provisor()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--report"))
        .stdout(predicate::str::contains("1800"));
    Ok(())
}

#[test]
fn plan_prints_ordered_steps() -> Result<(), Box<dyn std::error::Error>> {
    let temp = write_config(LAB_CONFIG);
    provisor()
        .arg("--config")
        .arg(temp.path().join("lab.yml"))
        .arg("--root")
        .arg(temp.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains(" 1. backend_layout"))
        .stdout(predicate::str::contains("wifi_hotspot (optional)"))
        .stdout(predicate::str::contains("service_activation <- service_units"));
    Ok(())
}

#[test]
fn plan_without_hotspot_omits_it() -> Result<(), Box<dyn std::error::Error>> {
    let temp = write_config("enable_hotspot: false\nbackend_dir: /opt/lab/backend\n");
    provisor()
        .arg("--config")
        .arg(temp.path().join("lab.yml"))
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("wifi_hotspot").not())
        .stdout(predicate::str::contains("13 steps"));
    Ok(())
}

#[test]
fn missing_config_file_exits_1() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new().unwrap();
    provisor()
        .arg("--config")
        .arg(temp.path().join("absent.yml"))
        .arg("plan")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration not found"));
    Ok(())
}

#[test]
fn malformed_config_exits_1() -> Result<(), Box<dyn std::error::Error>> {
    let temp = write_config("database_nmae: typo\n");
    provisor()
        .arg("--config")
        .arg(temp.path().join("lab.yml"))
        .arg("plan")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config"));
    Ok(())
}

#[test]
fn non_interactive_run_needs_password() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new().unwrap();
    provisor()
        .env_remove("PROVISOR_PROMPT_DATABASE_PASSWORD")
        .arg("--root")
        .arg(temp.path())
        .args(["run", "--non-interactive", "--backend-dir", "/opt/lab/backend"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("database_password"));
    Ok(())
}

#[test]
fn invalid_setting_exits_1() -> Result<(), Box<dyn std::error::Error>> {
    let temp = write_config("database_name: bad-name\nenable_hotspot: false\n");
    provisor()
        .arg("--config")
        .arg(temp.path().join("lab.yml"))
        .arg("plan")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration: database_name"));
    Ok(())
}

#[test]
fn completions_for_bash() -> Result<(), Box<dyn std::error::Error>> {
    provisor()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provisor"));
    Ok(())
}

#[test]
fn unknown_subcommand_fails() -> Result<(), Box<dyn std::error::Error>> {
    provisor().arg("destroy").assert().failure();
    Ok(())
}
