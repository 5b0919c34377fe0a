//! `${name}` interpolation for payload templates.
//!
//! # Syntax
//!
//! - `${variable_name}` - replaced with the variable's value
//! - `$${escaped}` - produces literal `${escaped}` in output
//!
//! Any other `$` is left alone, so shell and Makefile text such as
//! `$PATH` or `$$DATABASE_URL` passes through unchanged.

use std::collections::{BTreeSet, HashMap};

use crate::error::{ProvisorError, Result};

/// A segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Variable reference: ${name}
    Variable(String),
}

/// Parse a string containing `${var}` interpolations.
pub fn parse_interpolation(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        literal.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(escaped) = tail.strip_prefix("$${") {
            // $${...} -> literal ${...}
            let end = escaped.find('}').map(|i| i + 1).unwrap_or(escaped.len());
            literal.push_str("${");
            literal.push_str(&escaped[..end]);
            rest = &escaped[end..];
        } else if let Some(open) = tail.strip_prefix("${") {
            match open.find('}') {
                Some(end) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(open[..end].trim().to_string()));
                    rest = &open[end + 1..];
                }
                None => {
                    // Unterminated reference stays literal.
                    literal.push_str(tail);
                    rest = "";
                }
            }
        } else {
            literal.push('$');
            rest = &tail[1..];
        }
    }
    literal.push_str(rest);

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

/// Variable names referenced by `input`, sorted.
pub fn extract_variables(input: &str) -> BTreeSet<String> {
    parse_interpolation(input)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Variable(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Named values available to templates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values.insert(name.into(), value.to_string());
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Substitute every variable in `template`.
///
/// # Errors
///
/// Returns `ConfigValidationError` naming the first variable that has no
/// value.
///
/// # Example
///
/// ```
/// use provisor::config::{render_template, Variables};
///
/// let vars = Variables::new().with("ssid", "LearnLab");
/// let out = render_template("ssid=${ssid}\n# $${literal}\n", &vars).unwrap();
/// assert_eq!(out, "ssid=LearnLab\n# ${literal}\n");
/// ```
pub fn render_template(template: &str, vars: &Variables) -> Result<String> {
    let mut result = String::with_capacity(template.len());

    for segment in parse_interpolation(template) {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Variable(name) => {
                let value = vars
                    .get(&name)
                    .ok_or_else(|| ProvisorError::ConfigValidationError {
                        message: format!("Unresolved variable: ${{{}}}", name),
                    })?;
                result.push_str(value);
            }
        }
    }

    Ok(result)
}
