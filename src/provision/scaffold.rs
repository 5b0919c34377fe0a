//! Backend source tree and frontend environment.

use std::path::PathBuf;

use crate::config::{EnvFile, ProvisionConfig, Variables};
use crate::error::Result;
use crate::steps::check::{dirs_exist, file_has_content};
use crate::steps::Step;

use super::templates;
use super::HostPaths;

/// Directories the backend build expects, relative to the backend root.
pub const BACKEND_DIRS: &[&str] = &[
    "proto/auth/v1",
    "proto/course/v1",
    "proto/ai/v1",
    "proto/executor/v1",
    "proto/progress/v1",
    "proto/google/api",
    "services/auth-service/cmd/server",
    "services/auth-service/internal/config",
    "services/auth-service/internal/database",
    "services/auth-service/internal/models",
    "services/auth-service/internal/repository",
    "services/auth-service/internal/service",
    "services/auth-service/internal/server",
    "services/course-service/cmd/server",
    "services/ai-service/cmd/server",
    "services/executor-service/cmd/server",
    "services/progress-service/cmd/server",
    "gateway/cmd/server",
    "migrations",
    "scripts",
    "bin",
    "logs",
];

/// Create the backend directory tree and a Makefile if there is none.
///
/// An existing Makefile is never replaced.
pub fn backend_layout(config: &ProvisionConfig, paths: &HostPaths) -> Result<Step> {
    let backend = paths.host(&config.backend_dir);
    let dirs: Vec<PathBuf> = BACKEND_DIRS.iter().map(|d| backend.join(d)).collect();
    let makefile_path = backend.join("Makefile");
    let makefile = templates::render("Makefile", &Variables::new())?;

    let verify_dirs = dirs.clone();
    let verify_makefile = makefile_path.clone();

    Ok(Step::new("backend_layout")
        .description("Create backend directory layout")
        .verify(move |_| Ok(dirs_exist(&verify_dirs) && verify_makefile.is_file()))
        .apply(move |ctx| {
            for dir in &dirs {
                std::fs::create_dir_all(dir)?;
            }
            if !makefile_path.exists() {
                ctx.write_file(&makefile_path, &makefile)?;
            }
            Ok(())
        }))
}

/// Contents of the frontend's `.env.local`.
pub fn frontend_env_file(config: &ProvisionConfig) -> EnvFile {
    EnvFile::new()
        .comment("Learn Lab Frontend Configuration")
        .comment("Backend API URL")
        .var("NEXT_PUBLIC_API_URL", config.api_url())
        .blank()
        .comment("Development")
        .var("NODE_ENV", "development")
}

/// Point the frontend at the gateway.
pub fn frontend_env(config: &ProvisionConfig, paths: &HostPaths) -> Step {
    let path = paths.host(&config.frontend_dir).join(".env.local");
    let content = frontend_env_file(config).render();
    let expected = content.clone();
    let verify_path = path.clone();

    Step::new("frontend_env")
        .description("Write frontend .env.local")
        .critical(false)
        .verify(move |_| Ok(file_has_content(&verify_path, &expected)))
        .apply(move |ctx| ctx.write_file(&path, &content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::record::sample_config;
    use crate::shell::{CommandOptions, MockRunner};
    use crate::steps::StepContext;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn layout_creates_tree_and_makefile() {
        let temp = TempDir::new().unwrap();
        let paths = HostPaths::new(temp.path());
        let config = sample_config();
        let step = backend_layout(&config, &paths).unwrap();
        let runner = MockRunner::new();
        let mut ctx = StepContext::new("backend_layout", &runner, CommandOptions::default());

        assert!(!step.run_verify(&mut ctx).unwrap().unwrap());
        step.run_apply(&mut ctx).unwrap();
        assert!(step.run_verify(&mut ctx).unwrap().unwrap());

        let backend = paths.host(&config.backend_dir);
        assert!(backend.join("services/auth-service/internal/repository").is_dir());
        assert!(backend.join("Makefile").is_file());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn layout_keeps_existing_makefile() {
        let temp = TempDir::new().unwrap();
        let paths = HostPaths::new(temp.path());
        let config = sample_config();
        let makefile = paths.host(&config.backend_dir).join("Makefile");
        fs::create_dir_all(makefile.parent().unwrap()).unwrap();
        fs::write(&makefile, "custom:\n\ttrue\n").unwrap();

        let step = backend_layout(&config, &paths).unwrap();
        let runner = MockRunner::new();
        let mut ctx = StepContext::new("backend_layout", &runner, CommandOptions::default());
        step.run_apply(&mut ctx).unwrap();

        assert_eq!(fs::read_to_string(&makefile).unwrap(), "custom:\n\ttrue\n");
    }

    #[test]
    fn frontend_env_content() {
        let text = frontend_env_file(&sample_config()).render();
        assert!(text.starts_with("# Learn Lab Frontend Configuration\n"));
        assert!(text.contains("NEXT_PUBLIC_API_URL=http://192.168.4.1:8080/api/v1\n"));
        assert!(text.ends_with("NODE_ENV=development\n"));
    }

    #[test]
    fn frontend_env_verify_detects_changes() {
        let temp = TempDir::new().unwrap();
        let paths = HostPaths::new(temp.path());
        let mut config = sample_config();
        let runner = MockRunner::new();
        let mut ctx = StepContext::new("frontend_env", &runner, CommandOptions::default());

        let step = frontend_env(&config, &paths);
        step.run_apply(&mut ctx).unwrap();
        assert!(step.run_verify(&mut ctx).unwrap().unwrap());

        config.gateway_port = 9090;
        let changed = frontend_env(&config, &paths);
        assert!(!changed.run_verify(&mut ctx).unwrap().unwrap());
    }
}
