//! End-to-end provisioning runs against a staged root.

use std::fs;
use std::path::Path;

use provisor::config::{ConfigFile, ConfigResolver, EnvFile, ProvisionConfig};
use provisor::provision::backend::{GO_ROOT, PROTOC_PLUGINS};
use provisor::provision::database::{PG_HBA_CONF, POSTGRESQL_CONF};
use provisor::provision::packages::PACKAGES;
use provisor::provision::{build_registry, run_secrets, HostPaths};
use provisor::runner::{Orchestrator, OverallStatus, RunOptions};
use provisor::shell::{MockResponse, MockRunner};
use provisor::steps::{SkipReason, StepStatus};
use provisor::ui::MockUI;
use tempfile::TempDir;

const CONFIG: &str = "\
database_password: lab-db-pass
hotspot_password: classroom42
jwt_secret: 0123456789abcdef
service_user: pi
backend_dir: /opt/learnlab/backend
";

fn config() -> ProvisionConfig {
    let file = ConfigFile::parse(CONFIG).unwrap();
    ConfigResolver::new(file).resolve(&mut MockUI::new()).unwrap()
}

/// A staged root where PostgreSQL's config files already exist.
fn staged_root() -> TempDir {
    let temp = TempDir::new().unwrap();
    let paths = HostPaths::new(temp.path());
    let conf = paths.host(POSTGRESQL_CONF);
    fs::create_dir_all(conf.parent().unwrap()).unwrap();
    fs::write(&conf, "# postgresql.conf\n").unwrap();
    fs::write(paths.host(PG_HBA_CONF), "local all postgres peer\n").unwrap();
    temp
}

fn options(config: &ProvisionConfig) -> RunOptions {
    RunOptions {
        secrets: run_secrets(config),
        ..Default::default()
    }
}

fn go_bin(paths: &HostPaths) -> String {
    paths.host(GO_ROOT).join("bin/go").display().to_string()
}

/// Script the probes of an already provisioned host.
fn provisioned_host(runner: &MockRunner, paths: &HostPaths) {
    let status: String = PACKAGES.iter().map(|p| format!("{p}\tinstalled\n")).collect();
    runner.respond("dpkg-query", MockResponse::ok(status));
    runner.respond("sudo -u postgres psql -tAc", MockResponse::ok("1\n"));
    runner.respond(
        "ufw status",
        MockResponse::ok(
            "Status: active\n\n22/tcp ALLOW Anywhere\n5432/tcp ALLOW Anywhere\n\
             8080/tcp ALLOW Anywhere\n80/tcp ALLOW Anywhere\n443/tcp ALLOW Anywhere\n\
             53/udp ALLOW Anywhere\n67/udp ALLOW Anywhere\n",
        ),
    );
    let go = go_bin(paths);
    runner.respond(
        &format!("{go} version"),
        MockResponse::ok("go version go1.21.5 linux/arm64\n"),
    );
    runner.respond(&format!("{go} env GOPATH"), MockResponse::ok("/home/pi/go\n"));

    let bin_dir = paths.host("/home/pi/go/bin");
    fs::create_dir_all(&bin_dir).unwrap();
    for (binary, _) in PROTOC_PLUGINS {
        fs::write(bin_dir.join(binary), "").unwrap();
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

#[test]
fn fresh_host_is_fully_provisioned() {
    let temp = staged_root();
    let paths = HostPaths::new(temp.path());
    let config = config();
    let registry = build_registry(&config, &paths).unwrap();
    let runner = MockRunner::new();

    let report = Orchestrator::new(&registry, &runner).run(&options(&config));

    assert_eq!(report.overall_status(), OverallStatus::Success, "{}", report);
    assert_eq!(report.outcomes().len(), registry.len());
    let names: Vec<&str> = report.outcomes().iter().map(|o| o.step_name.as_str()).collect();
    assert_eq!(names, registry.order());

    let backend = paths.host("/opt/learnlab/backend");
    assert!(backend.join("Makefile").is_file());
    assert!(backend.join("gateway/cmd/server").is_dir());

    let env = EnvFile::parse(&read(&backend.join(".env"))).unwrap();
    assert_eq!(env.get("JWT_SECRET"), Some("0123456789abcdef"));
    assert_eq!(env.get("GATEWAY_PORT"), Some("8080"));

    assert!(read(&paths.host("/etc/hostapd/hostapd.conf")).contains("wpa_passphrase=classroom42"));
    assert!(read(&paths.host(PG_HBA_CONF)).contains("learnlab_user"));
    assert!(read(&paths.host("/etc/systemd/system/learnlab-gateway.service"))
        .contains("EnvironmentFile=/opt/learnlab/backend/.env"));

    let commands = runner.commands();
    assert!(commands.iter().any(|c| c.starts_with("apt-get install -y postgresql-15")));
    assert!(commands.iter().any(|c| c == "ufw --force enable"));
    assert!(commands.iter().any(|c| c.ends_with("make build")));
}

#[test]
fn provisioned_host_only_rebuilds_backend() {
    let temp = staged_root();
    let paths = HostPaths::new(temp.path());
    let config = config();
    let registry = build_registry(&config, &paths).unwrap();

    let first_runner = MockRunner::new();
    Orchestrator::new(&registry, &first_runner).run(&options(&config));

    let runner = MockRunner::new();
    provisioned_host(&runner, &paths);
    let report = Orchestrator::new(&registry, &runner).run(&options(&config));

    assert_eq!(report.overall_status(), OverallStatus::Success, "{}", report);
    assert_eq!(report.succeeded_steps(), vec!["backend_build"]);
    for name in report.skipped_steps() {
        assert_eq!(
            report.outcome(name).unwrap().skip_reason,
            Some(SkipReason::AlreadyApplied),
            "{name}"
        );
    }
    assert_eq!(runner.count("apt-get"), 0);
    assert_eq!(runner.count("ufw allow"), 0);
}

#[test]
fn missing_package_manager_aborts_before_database() {
    let temp = staged_root();
    let paths = HostPaths::new(temp.path());
    let config = config();
    let registry = build_registry(&config, &paths).unwrap();
    let runner = MockRunner::new();
    runner.respond("apt-get", MockResponse::not_found());

    let report = Orchestrator::new(&registry, &runner).run(&options(&config));

    assert_eq!(report.overall_status(), OverallStatus::Aborted);
    assert_eq!(report.failed_steps(), vec!["system_packages"]);
    assert_eq!(
        report.outcome("database_bootstrap").unwrap().skip_reason,
        Some(SkipReason::AbortedAfterCriticalFailure)
    );
    assert_eq!(runner.count("sudo -u postgres psql -v"), 0);
}

#[test]
fn firewall_failure_is_partial() {
    let temp = staged_root();
    let paths = HostPaths::new(temp.path());
    let config = config();
    let registry = build_registry(&config, &paths).unwrap();
    let runner = MockRunner::new();
    runner.respond("ufw --force enable", MockResponse::fail(1, "iptables unavailable"));

    let report = Orchestrator::new(&registry, &runner).run(&options(&config));

    assert_eq!(report.overall_status(), OverallStatus::PartialFailure);
    assert_eq!(report.failed_steps(), vec!["firewall"]);
    assert_eq!(
        report.outcome("service_activation").unwrap().status,
        StepStatus::Skipped
    );
    assert_eq!(
        report.outcome("service_activation").unwrap().skip_reason,
        Some(SkipReason::AlreadyApplied)
    );
}

#[test]
fn database_password_never_reaches_the_report() {
    let temp = staged_root();
    let paths = HostPaths::new(temp.path());
    let config = config();
    let registry = build_registry(&config, &paths).unwrap();
    let runner = MockRunner::new();
    runner.respond(
        "sudo -u postgres psql -v ON_ERROR_STOP=1 -c 'CREATE USER",
        MockResponse::fail(1, "ERROR: role creation failed"),
    );

    let report = Orchestrator::new(&registry, &runner).run(&options(&config));

    assert_eq!(report.failed_steps(), vec!["database_bootstrap"]);
    let json = report.to_json().unwrap();
    assert!(!json.contains("lab-db-pass"));
    assert!(json.contains("[REDACTED]"));
}
