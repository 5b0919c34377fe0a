//! `.env` files: rendering and parsing.
//!
//! Services read `KEY=VALUE` lines; provisioning writes them from an
//! [`EnvFile`] and, on later runs, parses what is on disk to decide whether
//! the file is already current.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Comment(String),
    Blank,
    Var { key: String, value: String },
}

/// An ordered env file with comments.
///
/// # Example
///
/// ```
/// use provisor::config::EnvFile;
///
/// let file = EnvFile::new()
///     .comment("Database Configuration")
///     .var("DATABASE_URL", "postgres://localhost/db")
///     .blank()
///     .var("LOG_LEVEL", "info");
///
/// let text = file.render();
/// assert!(text.starts_with("# Database Configuration\nDATABASE_URL="));
///
/// let parsed = EnvFile::parse(&text).unwrap();
/// assert!(parsed.same_vars(&file));
/// assert_eq!(parsed.get("LOG_LEVEL"), Some("info"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    lines: Vec<Line>,
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `# comment` line.
    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::Comment(text.into()));
        self
    }

    /// Append an empty line.
    pub fn blank(mut self) -> Self {
        self.lines.push(Line::Blank);
        self
    }

    /// Append a variable. A later entry for the same key wins.
    pub fn var(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.lines.push(Line::Var {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    /// Value of `key`, last definition wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Var { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Effective variables, sorted by key.
    pub fn vars(&self) -> BTreeMap<&str, &str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Var { key, value } => Some((key.as_str(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Whether both files define exactly the same variables.
    ///
    /// Comments, blank lines, order and quoting are ignored.
    pub fn same_vars(&self, other: &EnvFile) -> bool {
        self.vars() == other.vars()
    }

    /// Render as file content, one line each, trailing newline included.
    ///
    /// Values containing whitespace or `#` are double-quoted.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Comment(text) => {
                    out.push_str("# ");
                    out.push_str(text);
                }
                Line::Blank => {}
                Line::Var { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(&quote(value));
                }
            }
            out.push('\n');
        }
        out
    }

    /// Parse env file content.
    ///
    /// # Supported Formats
    ///
    /// - Simple: `KEY=value`
    /// - Quoted: `KEY="value with spaces"` or `KEY='single quoted'`
    /// - Empty: `KEY=`
    /// - Comments: `# This is a comment`
    /// - Optional `export ` prefix and whitespace around `=`
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = Vec::new();

        for (number, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                lines.push(Line::Blank);
            } else if let Some(comment) = line.strip_prefix('#') {
                lines.push(Line::Comment(comment.trim_start().to_string()));
            } else {
                let (key, value) = parse_assignment(line)
                    .with_context(|| format!("line {}: expected KEY=VALUE", number + 1))?;
                lines.push(Line::Var { key, value });
            }
        }

        Ok(Self { lines })
    }

    /// Load and parse an env file, `None` if it does not exist.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .map(Some)
                .with_context(|| format!("failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

fn parse_assignment(line: &str) -> Option<(String, String)> {
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_string(), unquote(value.trim())))
}

/// Remove surrounding quotes from a value.
fn unquote(value: &str) -> String {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

fn quote(value: &str) -> String {
    if value.contains(char::is_whitespace) || value.contains('#') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}
