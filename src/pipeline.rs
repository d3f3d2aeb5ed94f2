//! Pipelines describe simple step by step processes, the release process for example.
//!
//! A [`Pipeline`] is the static definition built from the Projectfile. A
//! [`ConfiguredPipeline`] binds it to a name and to the state persisted between runs.

use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::steps::{Meta, Step, StepContext, StepState};

/// Ordered list of steps.
#[derive(Debug, Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: Step + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn add_boxed(&mut self, step: Box<dyn Step>) -> &mut Self {
        self.steps.push(step);
        self
    }

    /// Inserts `step` right before the step identified by `identity`.
    ///
    /// # Errors
    /// * `Error::PipelineError` if no step has this identity
    pub fn add_before(&mut self, identity: &str, step: Box<dyn Step>) -> Result<&mut Self> {
        let index = self
            .steps
            .iter()
            .position(|s| s.identity() == identity)
            .ok_or_else(|| Error::PipelineError(format!("no step matches {identity}")))?;
        self.steps.insert(index, step);
        Ok(self)
    }

    /// Removes the first step identified by `identity`, returns whether one was found.
    pub fn remove(&mut self, identity: &str) -> bool {
        match self.steps.iter().position(|s| s.identity() == identity) {
            Some(index) => {
                self.steps.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn identities(&self) -> Vec<String> {
        self.steps.iter().map(|step| step.identity()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct PipelineState {
    #[serde(default)]
    meta: Meta,
    #[serde(default)]
    steps: Vec<(String, StepState)>,
}

/// Result of running the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A step ran and completed.
    Stepped,
    /// A step ran without completing, the pipeline waits for another `continue`.
    Halted,
    /// Every step is complete.
    Complete,
}

/// A named pipeline instance, with its persisted metadata and step states.
#[derive(Debug)]
pub struct ConfiguredPipeline {
    name: String,
    steps: Vec<Box<dyn Step>>,
    pub meta: Meta,
}

impl ConfiguredPipeline {
    pub fn new<S: Into<String>>(name: S, pipeline: Pipeline) -> Self {
        let mut meta = Meta::new();
        meta.insert("created".to_string(), Value::String(now()));
        Self { name: name.into(), steps: pipeline.steps, meta }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resets every step.
    pub fn init(&mut self) {
        for step in &mut self.steps {
            step.init();
        }
    }

    fn next_index(&self) -> Option<usize> {
        self.steps.iter().position(|step| !step.complete())
    }

    /// First incomplete step, `None` when the pipeline is complete.
    pub fn next(&mut self) -> Option<&mut dyn Step> {
        let index = self.next_index()?;
        Some(self.steps[index].as_mut())
    }

    /// 1-based index of the first incomplete step, or the length when complete.
    pub fn current(&self) -> usize {
        self.next_index().map(|index| index + 1).unwrap_or(self.steps.len())
    }

    /// Runs the first incomplete step.
    ///
    /// Errors of the step are returned as is; the step is then still incomplete.
    pub fn advance(&mut self, ctx: &StepContext<'_>) -> Result<Advance> {
        let Some(index) = self.next_index() else {
            return Ok(Advance::Complete);
        };

        let progress = format!("{} ({}/{})", self.name.to_uppercase(), index + 1, self.steps.len());
        let step = &mut self.steps[index];
        info!("{progress} \u{bb} \u{21e9} BEGIN \u{bb} {}", step.identity());

        step.run(&mut self.meta, ctx)?;

        if step.complete() {
            info!("{progress} \u{bb} SUCCESS\n");
            Ok(Advance::Stepped)
        } else {
            info!("{progress} \u{bb} FAILED\n");
            Ok(Advance::Halted)
        }
    }

    /// Calls `abort` on every step, returning the first error once all were called.
    pub fn abort(&mut self) -> Result<()> {
        let mut result = Ok(());
        for step in &mut self.steps {
            if let Err(err) = step.abort() {
                warn!("Abort of {} failed: {err}", step.identity());
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }
        result
    }

    /// JSON state, with an `updated` timestamp added to the metadata.
    pub fn serialize(&self) -> Result<String> {
        let mut meta = self.meta.clone();
        meta.insert("updated".to_string(), Value::String(now()));
        let state = PipelineState {
            meta,
            steps: self.steps.iter().map(|step| (step.identity(), step.state().clone())).collect(),
        };
        serde_json::to_string(&state).map_err(Error::JsonError)
    }

    /// Restores metadata and step states from a JSON state.
    ///
    /// # Errors
    /// * `Error::PipelineStateError` if the content is not a valid state, or if its steps do
    ///   not match the configured ones (nothing is modified then)
    pub fn unserialize(&mut self, serialized: &str) -> Result<()> {
        let state: PipelineState = serde_json::from_str(serialized).map_err(|e| {
            Error::PipelineStateError(format!("unreadable state for pipeline '{}': {e}", self.name))
        })?;

        if state.steps.len() != self.steps.len() {
            return Err(Error::PipelineStateError(format!(
                "expected {} steps, found {}",
                self.steps.len(),
                state.steps.len()
            )));
        }

        for ((identity, _), step) in state.steps.iter().zip(&self.steps) {
            if *identity != step.identity() {
                return Err(Error::PipelineStateError(format!(
                    "mismatch on step identity, expected {} but found {identity}",
                    step.identity()
                )));
            }
        }

        self.meta = state.meta;
        for ((_, step_state), step) in state.steps.into_iter().zip(&mut self.steps) {
            *step.state_mut() = step_state;
        }
        Ok(())
    }
}
