use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::Local;
use clap::ValueEnum;
use log::{debug, info};

use crate::commands::project_root;
use crate::config::read_configuration;
use crate::config::registry::ConfigurationRegistry;
use crate::constants::PIPELINES_DIR;
use crate::error::{Error, Result};
use crate::pipeline::{Advance, ConfiguredPipeline};
use crate::process::{CommandRunner, SystemRunner};
use crate::prompt::{DialoguerPrompter, Prompter};
use crate::steps::StepContext;

/// What to do with a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Starts the pipeline from scratch, then runs it.
    Start,
    /// Resumes a started pipeline.
    Continue,
    /// Aborts a started pipeline and removes its state.
    Abort,
    /// Archives the state of a finished pipeline.
    #[value(skip)]
    Complete,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub pipeline: Option<String>,
    pub action: Option<Action>,
    pub force: bool,
}

fn choices(registry: &ConfigurationRegistry) -> String {
    let mut names: Vec<&str> = registry.pipelines().keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

/// `medikit pipeline NAME ACTION`.
pub fn handle_pipeline<P: AsRef<Path>>(config_filename: P, options: PipelineOptions) -> Result<()> {
    let root = project_root(&config_filename);
    let registry = read_configuration(&config_filename)?.registry;

    let Some(name) = options.pipeline else {
        return Err(Error::PipelineError(format!(
            "you must choose a pipeline to run, available choices: {}",
            choices(&registry)
        )));
    };
    let mut runner = PipelineRunner::new(root, &name, registry)?;

    let Some(action) = options.action else {
        return Err(Error::PipelineError("choose a pipeline action: start, continue, abort".into()));
    };
    runner.run(action, options.force)
}

/// Drives a configured pipeline through its persisted state file.
pub struct PipelineRunner {
    pipeline: ConfiguredPipeline,
    registry: ConfigurationRegistry,
    root: PathBuf,
    state_file: PathBuf,
    runner: Rc<dyn CommandRunner>,
    prompter: Rc<dyn Prompter>,
}

impl PipelineRunner {
    /// Binds the pipeline `name` of `registry` to its state file under `root`.
    ///
    /// # Errors
    /// * `Error::PipelineError` if the pipeline is not defined
    /// * `Error::IoError` if the state directory cannot be created, or is not a directory
    pub fn new<P: Into<PathBuf>>(
        root: P,
        name: &str,
        mut registry: ConfigurationRegistry,
    ) -> Result<Self> {
        let Some(pipeline) = registry.take_pipeline(name) else {
            return Err(Error::PipelineError(format!(
                "undefined pipeline '{name}', valid choices are: {}",
                choices(&registry)
            )));
        };

        let root = root.into();
        let state_dir = root.join(PIPELINES_DIR);
        if !state_dir.exists() {
            fs::create_dir_all(&state_dir)?;
        } else if !state_dir.is_dir() {
            return Err(Error::PipelineError(format!(
                "the pipeline state path {} was found but is not a directory",
                state_dir.display()
            )));
        }

        Ok(Self {
            pipeline: ConfiguredPipeline::new(name, pipeline),
            registry,
            state_file: state_dir.join(format!("{name}.json")),
            root,
            runner: Rc::new(SystemRunner::new()),
            prompter: Rc::new(DialoguerPrompter::new()),
        })
    }

    pub fn with_runner(mut self, runner: Rc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_prompter(mut self, prompter: Rc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn pipeline(&self) -> &ConfiguredPipeline {
        &self.pipeline
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Runs `action` and the actions it leads to, until the pipeline halts.
    pub fn run(&mut self, action: Action, force: bool) -> Result<()> {
        let mut next = Some(action);
        let mut force = force;
        while let Some(action) = next {
            next = self.step(action, force)?;
            force = false;
        }
        Ok(())
    }

    /// Runs a single action and returns the one that should follow, if any.
    pub fn step(&mut self, action: Action, force: bool) -> Result<Option<Action>> {
        debug!("Pipeline {}: {action:?}", self.pipeline.name());
        match action {
            Action::Start => self.start(force),
            Action::Continue => self.resume(),
            Action::Abort => self.abort(),
            Action::Complete => self.complete(),
        }
    }

    fn start(&mut self, force: bool) -> Result<Option<Action>> {
        if self.state_file.exists() {
            if !force {
                let name = self.pipeline.name().to_string();
                return Err(Error::PipelineAlreadyStarted { name });
            }
            fs::remove_file(&self.state_file)?;
        }

        self.pipeline.init();
        fs::write(&self.state_file, self.pipeline.serialize()?)?;
        Ok(Some(Action::Continue))
    }

    fn load(&mut self) -> Result<()> {
        if !self.state_file.exists() {
            return Err(Error::PipelineNotStarted { name: self.pipeline.name().to_string() });
        }
        let content = fs::read_to_string(&self.state_file)?;
        self.pipeline.unserialize(&content)
    }

    fn resume(&mut self) -> Result<Option<Action>> {
        self.load()?;

        let ctx = StepContext {
            root: &self.root,
            runner: self.runner.as_ref(),
            prompter: self.prompter.as_ref(),
            config: &self.registry,
        };
        match self.pipeline.advance(&ctx)? {
            Advance::Complete => Ok(Some(Action::Complete)),
            Advance::Halted => Ok(None),
            Advance::Stepped => {
                fs::write(&self.state_file, self.pipeline.serialize()?)?;
                Ok(Some(Action::Continue))
            }
        }
    }

    fn abort(&mut self) -> Result<Option<Action>> {
        if !self.state_file.exists() {
            return Err(Error::PipelineNotStarted { name: self.pipeline.name().to_string() });
        }
        let result = self.load().and_then(|()| self.pipeline.abort());
        fs::remove_file(&self.state_file)?;
        result.map(|()| None)
    }

    fn complete(&mut self) -> Result<Option<Action>> {
        let timestamp = Local::now().format("%Y-%m-%d.%H.%M.%S.%6f");
        let target =
            Path::new(PIPELINES_DIR).join(format!("{}.{timestamp}.json", self.pipeline.name()));
        fs::rename(&self.state_file, self.root.join(&target))?;
        info!("Pipeline complete. State saved as \u{201c}{}\u{201d}.", target.display());
        Ok(None)
    }
}
