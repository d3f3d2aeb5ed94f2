//! Pipeline steps.
//!
//! A step is one external, possibly failing operation of a [`Pipeline`](crate::pipeline::Pipeline).
//! Its state is persisted between invocations, and its identity (name and constructor
//! arguments) is used to match a state file against the configured pipeline.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::registry::ConfigurationRegistry;
use crate::error::Result;
use crate::process::CommandRunner;
use crate::prompt::Prompter;

mod exec;
mod install;
mod version;

pub use exec::{Commit, Make, System};
pub use install::Install;
pub use version::BumpVersion;

/// Pipeline metadata shared by every step (`created`, `updated`, `version`...).
pub type Meta = serde_json::Map<String, Value>;

/// Persisted state of a step: a JSON object with a `complete` flag, plus whatever
/// private keys the step needs to track partial progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepState(Meta);

impl StepState {
    pub fn complete(&self) -> bool {
        self.0.get("complete").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.0.insert("complete".to_string(), Value::Bool(complete));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.0.insert(key.to_string(), value.into());
    }
}

/// What a step may use while running.
pub struct StepContext<'a> {
    /// Project root, where commands run.
    pub root: &'a Path,
    pub runner: &'a dyn CommandRunner,
    pub prompter: &'a dyn Prompter,
    pub config: &'a ConfigurationRegistry,
}

impl StepContext<'_> {
    pub fn exec(&self, command: &str) -> Result<String> {
        self.runner.exec(self.root, command)
    }

    pub fn system(&self, command: &str) -> Result<()> {
        self.runner.system(self.root, command)
    }
}

/// Unit of work of a pipeline.
pub trait Step: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Constructor arguments, rendered with their `Debug` representation.
    fn args(&self) -> Vec<String> {
        Vec::new()
    }

    /// Stable identity, `Name(arg1, arg2)`.
    fn identity(&self) -> String {
        format!("{}({})", self.name(), self.args().join(", "))
    }

    fn state(&self) -> &StepState;

    fn state_mut(&mut self) -> &mut StepState;

    fn complete(&self) -> bool {
        self.state().complete()
    }

    fn set_complete(&mut self, complete: bool) {
        self.state_mut().set_complete(complete);
    }

    /// Resets the step to "not complete".
    fn init(&mut self) {
        *self.state_mut() = StepState::default();
    }

    /// Performs the side effect. Must only mark the step complete on success.
    fn run(&mut self, meta: &mut Meta, ctx: &StepContext<'_>) -> Result<()>;

    /// Cleans up after an aborted pipeline.
    fn abort(&mut self) -> Result<()> {
        Ok(())
    }
}
