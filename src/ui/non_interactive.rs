//! Non-interactive UI for CI/headless environments.

use std::collections::HashMap;

use crate::error::{ProvisorError, Result};

use super::{
    OutputMode, Prompt, PromptResult, PromptType, ProvisorTheme, SpinnerHandle, UserInterface,
    PROMPT_ENV_PREFIX,
};

/// UI implementation for non-interactive mode.
///
/// Prompts are answered from `PROVISOR_PROMPT_<KEY>` variables, then from
/// the prompt's default. A prompt with neither is an error.
pub struct NonInteractiveUI {
    mode: OutputMode,
    env_overrides: HashMap<String, String>,
}

impl NonInteractiveUI {
    /// Create a new non-interactive UI, reading overrides from the environment.
    pub fn new(mode: OutputMode) -> Self {
        let env_overrides = std::env::vars()
            .filter(|(k, _)| k.starts_with(PROMPT_ENV_PREFIX))
            .collect();

        Self {
            mode,
            env_overrides,
        }
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(mode: OutputMode, overrides: HashMap<String, String>) -> Self {
        Self {
            mode,
            env_overrides: overrides,
        }
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("✓ {}", msg);
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_status() {
            eprintln!("⚠ {}", msg);
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let answer = self
            .env_overrides
            .get(&prompt.env_key())
            .or(prompt.default.as_ref())
            .cloned();

        match (answer, prompt.prompt_type) {
            (Some(value), PromptType::Confirm) => Ok(PromptResult::Bool(super::parse_yes(&value))),
            (Some(value), _) => Ok(PromptResult::String(value)),
            (None, _) => Err(ProvisorError::ConfigValidationError {
                message: format!(
                    "Cannot prompt for '{}' in non-interactive mode (set {} or add it to the config file)",
                    prompt.key,
                    prompt.env_key()
                ),
            }),
        }
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_spinners() {
            println!("  {}", message);
        }
        Box::new(LineSpinner { mode: self.mode })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("\n{}\n", title);
        }
    }

    fn theme(&self) -> ProvisorTheme {
        ProvisorTheme::plain()
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Spinner stand-in that prints one line per finish.
struct LineSpinner {
    mode: OutputMode,
}

impl SpinnerHandle for LineSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("✓ {}", msg);
        }
    }

    fn finish_error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn finish_skipped(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("○ {}", msg);
        }
    }
}
