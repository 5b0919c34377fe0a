//! Recording UI for tests.
//!
//! Every message, header, prompt key and spinner finish is captured so
//! provisioning commands can be asserted on without a terminal. Prompt
//! answers are scripted per key.
//!
//! # Example
//!
//! ```
//! use provisor::ui::{MockUI, Prompt, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_prompt_response("database_name", "lab_db");
//!
//! let answer = ui.prompt(&Prompt::input("database_name", "Database name")).unwrap();
//! assert_eq!(answer.as_string(), "lab_db");
//!
//! ui.success("Done!");
//! assert!(ui.has_success("Done"));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ProvisorError, Result};

use super::{
    parse_yes, OutputMode, Prompt, PromptResult, PromptType, ProvisorTheme, SpinnerHandle,
    UserInterface,
};

/// Status of a mock spinner when finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinnerStatus {
    Success,
    Error,
    Skipped,
}

type FinishLog = Rc<RefCell<Vec<(SpinnerStatus, String)>>>;

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    strict_prompts: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    spinners: Vec<String>,
    finishes: FinishLog,
    prompt_responses: HashMap<String, String>,
    prompts_shown: Vec<String>,
}

impl MockUI {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a response for a prompt key.
    pub fn set_prompt_response(&mut self, key: &str, response: &str) {
        self.prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    /// Make prompts without a configured response or default fail,
    /// like the non-interactive UI does.
    pub fn set_strict_prompts(&mut self, strict: bool) {
        self.strict_prompts = strict;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Messages spinners were started with.
    pub fn spinners(&self) -> Vec<String> {
        self.spinners.clone()
    }

    /// How each spinner finished, in finish order.
    pub fn spinner_finishes(&self) -> Vec<(SpinnerStatus, String)> {
        self.finishes.borrow().clone()
    }

    /// Prompt keys in the order they were asked.
    pub fn prompts_shown(&self) -> &[String] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        OutputMode::Normal
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        self.prompts_shown.push(prompt.key.clone());

        let answer = self
            .prompt_responses
            .get(&prompt.key)
            .or(prompt.default.as_ref())
            .cloned();

        let answer = match answer {
            Some(answer) => answer,
            None if self.strict_prompts => {
                return Err(ProvisorError::ConfigValidationError {
                    message: format!("No answer for prompt '{}'", prompt.key),
                })
            }
            None => String::new(),
        };

        Ok(match prompt.prompt_type {
            PromptType::Confirm => PromptResult::Bool(parse_yes(&answer)),
            PromptType::Input | PromptType::Password => PromptResult::String(answer),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            finishes: Rc::clone(&self.finishes),
        })
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn theme(&self) -> ProvisorTheme {
        ProvisorTheme::plain()
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Mock spinner that reports finish messages back to its [`MockUI`].
#[derive(Debug)]
pub struct MockSpinner {
    finishes: FinishLog,
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        self.finishes
            .borrow_mut()
            .push((SpinnerStatus::Success, msg.to_string()));
    }

    fn finish_error(&mut self, msg: &str) {
        self.finishes
            .borrow_mut()
            .push((SpinnerStatus::Error, msg.to_string()));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finishes
            .borrow_mut()
            .push((SpinnerStatus::Skipped, msg.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_response_beats_default() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("host_ip", "10.0.0.1");
        let prompt = Prompt::input("host_ip", "Host IP").with_default("192.168.4.1");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "10.0.0.1");
        assert_eq!(ui.prompts_shown(), ["host_ip".to_string()]);
    }

    #[test]
    fn confirm_response_is_parsed() {
        let mut ui = MockUI::new();
        ui.set_prompt_response("enable_hotspot", "no");
        let prompt = Prompt::confirm("enable_hotspot", "Hotspot?").with_default("y");
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::Bool(false));
    }

    #[test]
    fn strict_prompts_fail_without_answer() {
        let mut ui = MockUI::new();
        ui.set_strict_prompts(true);
        assert!(ui
            .prompt(&Prompt::password("database_password", "Password"))
            .is_err());
    }

    #[test]
    fn spinner_finishes_are_recorded() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("firewall");
        spinner.finish_error("firewall failed");

        assert_eq!(ui.spinners(), vec!["firewall".to_string()]);
        assert_eq!(
            ui.spinner_finishes(),
            vec![(SpinnerStatus::Error, "firewall failed".to_string())]
        );
    }
}
