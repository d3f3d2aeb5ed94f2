//! Test doubles for the external collaborators.
//! Used by the integration tests, and handy to dry-run a generation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::process::CommandRunner;
use crate::prompt::Prompter;

/// Records every command instead of running it.
///
/// Commands starting with a registered failing prefix exit with status 1, and `exec`
/// returns the canned output registered for the first matching prefix (empty otherwise).
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: RefCell<Vec<String>>,
    failing: Vec<String>,
    outputs: IndexMap<String, String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every command starting with `prefix` fail.
    pub fn failing<S: Into<String>>(mut self, prefix: S) -> Self {
        self.failing.push(prefix.into());
        self
    }

    /// Output returned by `exec` for commands starting with `prefix`.
    pub fn with_output<K: Into<String>, V: Into<String>>(mut self, prefix: K, output: V) -> Self {
        self.outputs.insert(prefix.into(), output.into());
        self
    }

    /// Commands run so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    fn record(&self, command: &str) -> Result<()> {
        self.commands.borrow_mut().push(command.to_string());
        if self.failing.iter().any(|prefix| command.starts_with(prefix.as_str())) {
            return Err(Error::CommandError {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

impl CommandRunner for RecordingRunner {
    fn exec(&self, _cwd: &Path, command: &str) -> Result<String> {
        self.record(command)?;
        Ok(self
            .outputs
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    fn system(&self, _cwd: &Path, command: &str) -> Result<()> {
        self.record(command)
    }
}

/// Answers prompts from a predefined list, then fails.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: RefCell::new(answers.into_iter().map(Into::into).collect()) }
    }

    fn next(&self, prompt: &str) -> Result<String> {
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::PromptError(format!("no answer left for {prompt:?}")))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next(prompt)?;
        match (answer.is_empty(), default) {
            (true, Some(default)) => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }
}
