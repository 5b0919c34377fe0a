//! PostgreSQL service, application database and server tuning.

use std::path::{Path, PathBuf};

use anyhow::anyhow;

use crate::config::ProvisionConfig;
use crate::error::{ProvisorError, Result};
use crate::steps::check::{command_succeeds, file_contains_all, missing_lines};
use crate::steps::{Step, StepContext};

use super::HostPaths;

pub const POSTGRESQL_CONF: &str = "/etc/postgresql/15/main/postgresql.conf";
pub const PG_HBA_CONF: &str = "/etc/postgresql/15/main/pg_hba.conf";

/// Server settings sized for an 8 GB board.
pub const TUNING: &[&str] = &[
    "shared_buffers = 2GB",
    "effective_cache_size = 6GB",
    "max_connections = 100",
    "listen_addresses = '*'",
];

/// Enable and start the PostgreSQL server.
pub fn postgresql_service() -> Step {
    Step::new("postgresql_service")
        .requires(["system_packages"])
        .description("Enable and start PostgreSQL")
        .verify(|ctx| {
            Ok(
                command_succeeds(ctx, "systemctl", &["is-active", "--quiet", "postgresql"])?
                    && command_succeeds(ctx, "systemctl", &["is-enabled", "--quiet", "postgresql"])?,
            )
        })
        .apply(|ctx| {
            ctx.run("systemctl", &["enable", "postgresql"])?;
            ctx.run("systemctl", &["start", "postgresql"])?;
            Ok(())
        })
}

/// Create the application database and role and grant access.
pub fn database_bootstrap(config: &ProvisionConfig) -> Step {
    let verify_db = config.database_name.clone();
    let verify_user = config.database_user.clone();
    let db = config.database_name.clone();
    let user = config.database_user.clone();
    let password = config.database_password.clone();

    Step::new("database_bootstrap")
        .requires(["postgresql_service"])
        .description("Create database and role")
        .verify(move |ctx| {
            Ok(database_exists(ctx, &verify_db)? && role_exists(ctx, &verify_user)?)
        })
        .apply(move |ctx| {
            if !database_exists(ctx, &db)? {
                psql(ctx, None, &format!("CREATE DATABASE {};", db))?;
            }
            let role_sql = if role_exists(ctx, &user)? {
                "ALTER USER"
            } else {
                "CREATE USER"
            };
            psql(
                ctx,
                None,
                &format!("{} {} WITH PASSWORD {};", role_sql, user, sql_literal(&password)),
            )?;
            psql(
                ctx,
                None,
                &format!("GRANT ALL PRIVILEGES ON DATABASE {} TO {};", db, user),
            )?;
            psql(
                ctx,
                Some(db.as_str()),
                &format!("GRANT ALL ON SCHEMA public TO {};", user),
            )?;
            Ok(())
        })
}

/// `pg_hba.conf` rule letting the application role in with a password.
pub fn hba_rule(config: &ProvisionConfig) -> String {
    format!(
        "host    {}    {}    0.0.0.0/0    md5",
        config.database_name, config.database_user
    )
}

/// Append missing tuning and access lines, then restart the server.
pub fn database_tuning(config: &ProvisionConfig, paths: &HostPaths) -> Step {
    let targets: Vec<(PathBuf, Vec<String>)> = vec![
        (
            paths.host(POSTGRESQL_CONF),
            TUNING.iter().map(|l| l.to_string()).collect(),
        ),
        (paths.host(PG_HBA_CONF), vec![hba_rule(config)]),
    ];
    let verify_targets = targets.clone();

    Step::new("database_tuning")
        .requires(["database_bootstrap"])
        .critical(false)
        .description("Tune PostgreSQL and allow network access")
        .verify(move |_| {
            Ok(verify_targets
                .iter()
                .all(|(path, lines)| file_contains_all(path, lines)))
        })
        .apply(move |ctx| {
            for (path, lines) in &targets {
                append_missing(ctx, path, lines)?;
            }
            ctx.run("systemctl", &["restart", "postgresql"])?;
            Ok(())
        })
}

/// Append the lines of `wanted` that `path` lacks. The file must exist.
fn append_missing(ctx: &mut StepContext<'_>, path: &Path, wanted: &[String]) -> Result<()> {
    let content = ctx.read_file(path)?.ok_or_else(|| {
        ProvisorError::Other(anyhow!(
            "{} not found; is PostgreSQL 15 installed?",
            path.display()
        ))
    })?;

    let missing = missing_lines(&content, wanted);
    if missing.is_empty() {
        return Ok(());
    }

    let mut block = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        block.push('\n');
    }
    block.push('\n');
    block.push_str(&missing.join("\n"));
    block.push('\n');
    ctx.append_file(path, &block)
}

/// Run SQL as the `postgres` superuser.
fn psql(ctx: &mut StepContext<'_>, database: Option<&str>, sql: &str) -> Result<()> {
    let mut args = vec!["-u", "postgres", "psql", "-v", "ON_ERROR_STOP=1"];
    if let Some(database) = database {
        args.extend(["-d", database]);
    }
    args.extend(["-c", sql]);
    ctx.run("sudo", &args)?;
    Ok(())
}

/// Whether a single-value query returns `1`.
fn query_is_true(ctx: &mut StepContext<'_>, sql: &str) -> Result<bool> {
    match ctx.probe("sudo", &["-u", "postgres", "psql", "-tAc", sql]) {
        Ok(result) => Ok(result.success && result.stdout.trim() == "1"),
        Err(ProvisorError::LaunchFailure { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

fn database_exists(ctx: &mut StepContext<'_>, name: &str) -> Result<bool> {
    query_is_true(
        ctx,
        &format!("SELECT 1 FROM pg_database WHERE datname = {}", sql_literal(name)),
    )
}

fn role_exists(ctx: &mut StepContext<'_>, name: &str) -> Result<bool> {
    query_is_true(
        ctx,
        &format!("SELECT 1 FROM pg_roles WHERE rolname = {}", sql_literal(name)),
    )
}

/// Quote a value as an SQL string literal.
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
