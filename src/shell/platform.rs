//! Host platform probes.

use std::path::Path;

/// Check if running in a CI environment.
///
/// Used to force non-interactive mode in `main()`. Checks common CI
/// environment variables: `CI`, `GITHUB_ACTIONS`, `GITLAB_CI`, `CIRCLECI`,
/// `TRAVIS`, `JENKINS_URL`.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
        || std::env::var("JENKINS_URL").is_ok()
}

/// Check if running as root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

/// Check whether the host reports itself as a Raspberry Pi.
pub fn is_raspberry_pi() -> bool {
    cpuinfo_mentions_raspberry_pi(Path::new("/proc/cpuinfo"))
}

fn cpuinfo_mentions_raspberry_pi(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains("Raspberry Pi"))
        .unwrap_or(false)
}

/// The user that invoked `sudo`, falling back to `pi`.
pub fn invoking_user() -> String {
    std::env::var("SUDO_USER")
        .ok()
        .filter(|u| !u.is_empty() && u != "root")
        .unwrap_or_else(|| "pi".to_string())
}
