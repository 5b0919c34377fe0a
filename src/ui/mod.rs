//! User interaction and terminal output.
//!
//! - [`UserInterface`] trait, so commands can be driven by [`MockUI`] in tests
//! - [`TerminalUI`] for interactive terminals, [`NonInteractiveUI`] for
//!   headless runs where prompt answers come from defaults or
//!   `PROVISOR_PROMPT_<KEY>` variables
//! - Spinners, theme and the shared status vocabulary
//!
//! # Example
//!
//! ```
//! use provisor::ui::{create_ui, OutputMode};
//!
//! let mut ui = create_ui(false, OutputMode::Quiet);
//! ui.show_header("LearnLab provisioning");
//! ui.success("Done");
//! ```

pub mod icons;
pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod progress;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use icons::StatusKind;
pub use mock::{MockSpinner, MockUI, SpinnerStatus};
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use progress::format_duration;
pub use prompts::prompt_user;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, ProvisorTheme};

use crate::error::Result;

/// Environment prefix for answering prompts without a terminal.
pub const PROMPT_ENV_PREFIX: &str = "PROVISOR_PROMPT_";

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Always shown.
    fn error(&mut self, msg: &str);

    /// Show a prompt and get user input.
    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult>;

    /// Start a spinner for an operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Theme matching this UI's color settings.
    fn theme(&self) -> ProvisorTheme;

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);

    /// Mark as skipped.
    fn finish_skipped(&mut self, msg: &str);
}

/// A prompt to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Lookup key, also used for `PROVISOR_PROMPT_<KEY>` overrides.
    pub key: String,
    /// The question to display.
    pub question: String,
    pub prompt_type: PromptType,
    /// Default value if the user just presses enter.
    pub default: Option<String>,
}

impl Prompt {
    pub fn input(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(key, question, PromptType::Input)
    }

    pub fn confirm(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(key, question, PromptType::Confirm)
    }

    /// Hidden input; never has a default.
    pub fn password(key: impl Into<String>, question: impl Into<String>) -> Self {
        Self::new(key, question, PromptType::Password)
    }

    fn new(key: impl Into<String>, question: impl Into<String>, prompt_type: PromptType) -> Self {
        Self {
            key: key.into(),
            question: question.into(),
            prompt_type,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Name of the environment variable that answers this prompt.
    pub fn env_key(&self) -> String {
        format!("{}{}", PROMPT_ENV_PREFIX, self.key.to_uppercase())
    }
}

/// The type of prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptType {
    /// Yes/no confirmation.
    Confirm,
    /// Free-form text input.
    Input,
    /// Free-form text input, not echoed.
    Password,
}

/// Result of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    /// Boolean result from confirm.
    Bool(bool),
    /// String result from input.
    String(String),
}

impl PromptResult {
    /// Get as string, suitable for interpolation.
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => s.clone(),
        }
    }

    /// Interpret as a yes/no answer.
    ///
    /// Strings such as `y`, `yes` and `true` (from env overrides or
    /// defaults) count as yes.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::String(s) => parse_yes(s),
        }
    }
}

/// Parse a yes/no answer.
pub(crate) fn parse_yes(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "y" | "yes" | "true" | "1" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_result_as_string() {
        assert_eq!(PromptResult::Bool(true).as_string(), "true");
        assert_eq!(PromptResult::String("hello".into()).as_string(), "hello");
    }

    #[test]
    fn prompt_result_as_bool_accepts_yes_forms() {
        assert!(PromptResult::Bool(true).as_bool());
        assert!(PromptResult::String("Y".into()).as_bool());
        assert!(PromptResult::String("yes".into()).as_bool());
        assert!(!PromptResult::String("n".into()).as_bool());
        assert!(!PromptResult::String("".into()).as_bool());
    }

    #[test]
    fn prompt_builders() {
        let prompt = Prompt::input("database_name", "Database name").with_default("learnlab");
        assert_eq!(prompt.prompt_type, PromptType::Input);
        assert_eq!(prompt.default.as_deref(), Some("learnlab"));
        assert_eq!(prompt.env_key(), "PROVISOR_PROMPT_DATABASE_NAME");

        let secret = Prompt::password("database_password", "Database password");
        assert_eq!(secret.prompt_type, PromptType::Password);
        assert!(secret.default.is_none());
    }
}
