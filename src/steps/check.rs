//! Reusable building blocks for `verify` actions.
//!
//! These report whether a change is already in place; none of them
//! mutate the host.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::context::StepContext;

/// True if `path` exists and its content equals `expected`.
pub fn file_has_content(path: &Path, expected: &str) -> bool {
    fs::read_to_string(path)
        .map(|content| content == expected)
        .unwrap_or(false)
}

/// Lines of `wanted` that do not appear (trimmed) as a line in `content`.
pub fn missing_lines<S: AsRef<str>>(content: &str, wanted: &[S]) -> Vec<String> {
    wanted
        .iter()
        .map(|w| w.as_ref().trim())
        .filter(|w| !content.lines().any(|line| line.trim() == *w))
        .map(str::to_string)
        .collect()
}

/// True if `path` exists and contains every line in `wanted`.
pub fn file_contains_all<S: AsRef<str>>(path: &Path, wanted: &[S]) -> bool {
    match fs::read_to_string(path) {
        Ok(content) => missing_lines(&content, wanted).is_empty(),
        Err(_) => false,
    }
}

/// Directories in `paths` that do not exist.
pub fn missing_dirs(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths.iter().filter(|p| !p.is_dir()).cloned().collect()
}

/// True if every path is an existing directory.
pub fn dirs_exist(paths: &[PathBuf]) -> bool {
    missing_dirs(paths).is_empty()
}

/// True if the command exits 0.
///
/// A binary that cannot be launched counts as "not satisfied" rather than
/// an error, so verify can run before the tool is installed.
pub fn command_succeeds<S: AsRef<str>>(
    ctx: &mut StepContext<'_>,
    program: &str,
    args: &[S],
) -> Result<bool> {
    match ctx.probe(program, args) {
        Ok(result) => Ok(result.success),
        Err(crate::error::ProvisorError::LaunchFailure { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{CommandOptions, MockResponse, MockRunner};
    use tempfile::TempDir;

    #[test]
    fn file_has_content_matches_exactly() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dnsmasq.conf");
        assert!(!file_has_content(&path, "interface=wlan0\n"));

        fs::write(&path, "interface=wlan0\n").unwrap();
        assert!(file_has_content(&path, "interface=wlan0\n"));
        assert!(!file_has_content(&path, "interface=wlan1\n"));
    }

    #[test]
    fn missing_lines_ignores_surrounding_whitespace() {
        let content = "shared_buffers = 2GB\n  max_connections = 100  \n";
        let missing = missing_lines(
            content,
            &["shared_buffers = 2GB", "max_connections = 100", "listen_addresses = '*'"],
        );
        assert_eq!(missing, vec!["listen_addresses = '*'".to_string()]);
    }

    #[test]
    fn file_contains_all_false_for_missing_file() {
        assert!(!file_contains_all(Path::new("/nonexistent/file"), &["x"]));
    }

    #[test]
    fn dirs_exist_reports_missing() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("bin");
        fs::create_dir(&present).unwrap();
        let absent = temp.path().join("logs");

        assert!(dirs_exist(&[present.clone()]));
        assert_eq!(missing_dirs(&[present, absent.clone()]), vec![absent]);
    }

    #[test]
    fn command_succeeds_treats_missing_binary_as_unsatisfied() {
        let runner = MockRunner::new();
        runner.respond("go", MockResponse::not_found());
        runner.respond("ufw", MockResponse::ok("Status: active"));
        let mut ctx = StepContext::new("check", &runner, CommandOptions::default());

        assert!(!command_succeeds(&mut ctx, "go", &["version"]).unwrap());
        assert!(command_succeeds(&mut ctx, "ufw", &["status"]).unwrap());
    }
}
