//! User input and interaction handling.
//! Used by `medikit init` for missing project metadata and by pipeline steps that
//! need a human decision (next version number).

use dialoguer::Input;

use crate::error::{Error, Result};

/// Source of interactive answers.
pub trait Prompter {
    /// Asks a free text question.
    ///
    /// # Arguments
    /// * `prompt` - Question displayed to the user
    /// * `default` - Value used when the user just presses enter
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String>;
}

/// Terminal prompter based on dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(|e| Error::PromptError(e.to_string()))
    }
}
