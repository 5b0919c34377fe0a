//! Backend environment, Go toolchain and build.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{EnvFile, ProvisionConfig, Variables};
use crate::error::{ProvisorError, Result};
use crate::shell::CommandOptions;
use crate::steps::check::file_has_content;
use crate::steps::{Step, StepContext};

use super::{templates, HostPaths};

/// A gRPC backend service and its ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendService {
    pub name: &'static str,
    /// Prefix of the service's variables in `.env`.
    pub env_prefix: &'static str,
    pub grpc_port: u16,
    pub http_port: u16,
}

const fn service(
    name: &'static str,
    env_prefix: &'static str,
    grpc_port: u16,
    http_port: u16,
) -> BackendService {
    BackendService {
        name,
        env_prefix,
        grpc_port,
        http_port,
    }
}

/// The backend services behind the gateway.
pub const SERVICES: &[BackendService] = &[
    service("auth-service", "AUTH", 50051, 8001),
    service("course-service", "COURSE", 50052, 8002),
    service("ai-service", "AI", 50053, 8003),
    service("executor-service", "EXECUTOR", 50054, 8004),
    service("progress-service", "PROGRESS", 50055, 8005),
];

pub const GO_ROOT: &str = "/usr/local/go";
pub const GO_PROFILE: &str = "/etc/profile.d/go.sh";

/// `go install` targets and the binaries they produce.
pub const PROTOC_PLUGINS: &[(&str, &str)] = &[
    ("protoc-gen-go", "google.golang.org/protobuf/cmd/protoc-gen-go@latest"),
    ("protoc-gen-go-grpc", "google.golang.org/grpc/cmd/protoc-gen-go-grpc@latest"),
    (
        "protoc-gen-grpc-gateway",
        "github.com/grpc-ecosystem/grpc-gateway/v2/protoc-gen-grpc-gateway@latest",
    ),
];

/// Contents of the backend's `.env`.
pub fn backend_env_file(config: &ProvisionConfig) -> EnvFile {
    let mut file = EnvFile::new()
        .comment("Database Configuration")
        .var("DATABASE_URL", config.database_url())
        .blank()
        .comment("JWT Configuration")
        .var("JWT_SECRET", &config.jwt_secret)
        .var("JWT_EXPIRY", "24h")
        .blank()
        .comment("Service Ports");

    for svc in SERVICES {
        file = file
            .var(format!("{}_SERVICE_GRPC_PORT", svc.env_prefix), svc.grpc_port)
            .var(format!("{}_SERVICE_HTTP_PORT", svc.env_prefix), svc.http_port);
    }

    file = file
        .var("GATEWAY_PORT", config.gateway_port)
        .blank()
        .comment("Logging")
        .var("LOG_LEVEL", "info")
        .blank()
        .comment("Service URLs (for gateway)");

    for svc in SERVICES {
        file = file.var(
            format!("{}_SERVICE_URL", svc.env_prefix),
            format!("localhost:{}", svc.grpc_port),
        );
    }

    file
}

/// Write `<backend>/.env` unless an equivalent file is already there.
pub fn backend_env(config: &ProvisionConfig, paths: &HostPaths) -> Step {
    let path = paths.host(&config.backend_dir).join(".env");
    let desired = backend_env_file(config);
    let content = desired.render();
    let verify_path = path.clone();

    Step::new("backend_env")
        .requires(["backend_layout"])
        .description("Write backend .env")
        .verify(move |_| {
            // An unreadable or malformed file is rewritten.
            Ok(matches!(
                EnvFile::load_optional(&verify_path),
                Ok(Some(existing)) if existing.same_vars(&desired)
            ))
        })
        .apply(move |ctx| ctx.write_file(&path, &content))
}

/// Go's name for the host CPU architecture.
fn go_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "arm" => "armv6l",
        _ => "arm64",
    }
}

/// Install the Go toolchain under `/usr/local/go` and put it on `PATH`.
pub fn go_toolchain(config: &ProvisionConfig, paths: &HostPaths) -> Result<Step> {
    let go_bin = paths.host(GO_ROOT).join("bin/go");
    let profile_path = paths.host(GO_PROFILE);
    let profile = templates::render("go.sh", &Variables::new())?;
    let expected_version = format!("go{} ", config.go_version);

    let archive_name = format!("go{}.linux-{}.tar.gz", config.go_version, go_arch());
    let url = format!("https://go.dev/dl/{}", archive_name);
    let archive = std::env::temp_dir().join(&archive_name);
    let install_parent = paths.host("/usr/local");
    let go_root = paths.host(GO_ROOT);

    let verify_bin = go_bin.clone();
    let verify_profile = profile_path.clone();
    let verify_content = profile.clone();

    Ok(Step::new("go_toolchain")
        .requires(["system_packages"])
        .description(format!("Install Go {}", config.go_version))
        .verify(move |ctx| {
            if !file_has_content(&verify_profile, &verify_content) {
                return Ok(false);
            }
            match ctx.probe(&path_str(&verify_bin), &["version"]) {
                Ok(result) => Ok(result.success && result.stdout.contains(&expected_version)),
                Err(ProvisorError::LaunchFailure { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .apply(move |ctx| {
            let archive_arg = path_str(&archive);
            ctx.run("wget", &["-q", "-O", archive_arg.as_str(), url.as_str()])?;
            ctx.run("rm", &["-rf", path_str(&go_root).as_str()])?;
            ctx.run(
                "tar",
                &["-C", path_str(&install_parent).as_str(), "-xzf", archive_arg.as_str()],
            )?;
            ctx.run("rm", &["-f", archive_arg.as_str()])?;
            ctx.write_file(&profile_path, &profile)
        }))
}

/// `$(go env GOPATH)`, empty if go is missing or does not report one.
fn gopath(ctx: &mut StepContext<'_>, go_bin: &Path) -> Result<String> {
    match ctx.probe(&path_str(go_bin), &["env", "GOPATH"]) {
        Ok(result) if result.success => Ok(result.stdout.trim().to_string()),
        Ok(_) | Err(ProvisorError::LaunchFailure { .. }) => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Install the protobuf code generators into `$GOPATH/bin`.
pub fn protoc_plugins(paths: &HostPaths) -> Step {
    let go_bin = paths.host(GO_ROOT).join("bin/go");
    let verify_go = go_bin.clone();
    let verify_paths = paths.clone();

    Step::new("protoc_plugins")
        .requires(["go_toolchain"])
        .description("Install protoc Go plugins")
        .verify(move |ctx| {
            let gopath = gopath(ctx, &verify_go)?;
            if gopath.is_empty() {
                return Ok(false);
            }
            let bin_dir = verify_paths.host(&gopath).join("bin");
            let missing: Vec<_> = PROTOC_PLUGINS
                .iter()
                .filter(|(binary, _)| !bin_dir.join(binary).is_file())
                .map(|(binary, _)| *binary)
                .collect();
            debug!(?missing, "protoc plugin check");
            Ok(missing.is_empty())
        })
        .apply(move |ctx| {
            let go = path_str(&go_bin);
            for (_, module) in PROTOC_PLUGINS {
                ctx.run(&go, &["install", *module])?;
            }
            Ok(())
        })
}

/// `make generate`, `make deps`, `make migrate` and `make build`.
///
/// No verify: make and go only redo what is out of date.
pub fn backend_build(config: &ProvisionConfig, paths: &HostPaths) -> Step {
    let backend = paths.host(&config.backend_dir);
    let go_bin = paths.host(GO_ROOT).join("bin/go");
    let database_url = config.database_url();

    Step::new("backend_build")
        .requires(["protoc_plugins", "backend_env", "database_bootstrap"])
        .description("Generate, migrate and build backend services")
        .apply(move |ctx| {
            let gopath = gopath(ctx, &go_bin)?;
            let options = CommandOptions::default()
                .in_dir(&backend)
                .with_env("PATH", build_path(&go_bin, &gopath));

            ctx.run_with("make", &["generate"], &options)?;
            ctx.run_with("make", &["deps"], &options)?;
            ctx.run_with(
                "make",
                &["migrate"],
                &options.clone().with_env("DATABASE_URL", &database_url),
            )?;
            ctx.run_with("make", &["build"], &options)?;
            Ok(())
        })
}

/// `PATH` with the Go toolchain and `$GOPATH/bin` in front.
fn build_path(go_bin: &Path, gopath: &str) -> String {
    let mut entries: Vec<PathBuf> = Vec::new();
    if let Some(dir) = go_bin.parent() {
        entries.push(dir.to_path_buf());
    }
    if !gopath.is_empty() {
        entries.push(Path::new(gopath).join("bin"));
    }
    if let Some(current) = std::env::var_os("PATH") {
        entries.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(entries)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
