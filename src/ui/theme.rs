//! Visual theme and styling.

use console::Style;

/// Terminal styles used across all output.
#[derive(Debug, Clone)]
pub struct ProvisorTheme {
    /// Success messages (green).
    pub success: Style,
    /// Warning messages (orange).
    pub warning: Style,
    /// Error messages (red bold).
    pub error: Style,
    /// Running elements (cyan).
    pub info: Style,
    /// Dim/secondary text.
    pub dim: Style,
    /// Highlighted text (bold).
    pub highlight: Style,
    /// Step names (bold).
    pub step_title: Style,
    /// Headers (cyan bold).
    pub header: Style,
    /// Durations and timestamps (dim).
    pub duration: Style,
    /// Commands shown in output (dim italic).
    pub command: Style,
    /// Key labels in key-value displays (bold).
    pub key: Style,
}

impl Default for ProvisorTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisorTheme {
    /// Create the colored theme.
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            step_title: Style::new().bold(),
            header: Style::new().bold().cyan(),
            duration: Style::new().dim(),
            command: Style::new().dim().italic(),
            key: Style::new().bold(),
        }
    }

    /// Create a theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            step_title: Style::new(),
            header: Style::new(),
            duration: Style::new(),
            command: Style::new(),
            key: Style::new(),
        }
    }

    /// Colored theme when `colors` is set, plain otherwise.
    pub fn for_colors(colors: bool) -> Self {
        if colors {
            Self::new()
        } else {
            Self::plain()
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_skipped(&self, msg: &str) -> String {
        format!("{}", self.dim.apply_to(format!("○ {}", msg)))
    }

    /// Format a header banner.
    pub fn format_header(&self, title: &str) -> String {
        format!(
            "{} {}",
            self.header.apply_to("▲"),
            self.highlight.apply_to(title)
        )
    }

    /// Format a `key: value` line.
    pub fn format_pair(&self, key: &str, value: &str) -> String {
        format!("{} {}", self.key.apply_to(format!("{}:", key)), value)
    }
}

/// Check if colors should be enabled.
///
/// Honors `NO_COLOR` and `--no-color` (which turns off
/// `console::colors_enabled`).
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    console::colors_enabled() && console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_has_no_escapes() {
        let theme = ProvisorTheme::plain();
        assert_eq!(theme.format_success("done"), "✓ done");
        assert_eq!(theme.format_error("bad"), "✗ bad");
        assert_eq!(theme.format_skipped("later"), "○ later");
        assert_eq!(theme.format_pair("Host IP", "192.168.4.1"), "Host IP: 192.168.4.1");
    }

    #[test]
    fn header_contains_title() {
        assert!(ProvisorTheme::plain()
            .format_header("LearnLab")
            .contains("LearnLab"));
    }
}
