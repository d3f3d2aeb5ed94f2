//! Adds the pytest testing framework to your project.

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::Result;
use crate::events::{Dispatcher, ProjectEvent, ON_START};
use crate::feature::make::{MakefileEvent, TargetOptions, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::python::{PythonConfig, ON_GENERATE as ON_PYTHON_GENERATE};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, SUPPORT_PRIORITY,
};
use crate::file::WriteOptions;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PytestConfig {
    /// Pytest version specifier used in dev requirements.
    pub version: String,
    /// Additional dev requirements, package name to version specifier.
    pub addons: IndexMap<String, String>,
}

impl Default for PytestConfig {
    fn default() -> Self {
        let mut addons = IndexMap::new();
        addons.insert("coverage".to_string(), "~=4.5".to_string());
        addons.insert("pytest-cov".to_string(), "~=2.7".to_string());
        Self { version: "~=4.6".to_string(), addons }
    }
}

impl FeatureConfig for PytestConfig {
    fn apply(&mut self, settings: serde_yaml::Value) -> Result<()> {
        *self = parse_settings(Self::FEATURE, settings)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedConfig for PytestConfig {
    const FEATURE: FeatureName = FeatureName::Pytest;
}

pub struct PytestFeature {
    workspace: Rc<Workspace>,
}

impl PytestFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_python_generate(&self, _dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let config = event.config.require_config::<PytestConfig>().clone();
        let mut requirements = vec![format!("pytest {}", config.version)];
        requirements.extend(
            config.addons.iter().map(|(name, version)| format!("{name} {version}")),
        );

        event
            .config
            .get_mut::<PythonConfig>()?
            .add_requirements(Some("dev"), requirements.as_slice())?;
        Ok(())
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let makefile = &mut event.makefile;
        makefile.set("PYTEST", "$(PYTHON_DIRNAME)/pytest");
        makefile.set("PYTEST_OPTIONS", "--capture=no --cov=$(PACKAGE) --cov-report html");
        makefile.add_target(
            "test",
            "$(PYTEST) $(PYTEST_OPTIONS) tests",
            TargetOptions::new().deps(["install-dev"]).phony().doc("Runs the test suite."),
        )?;
        Ok(())
    }

    fn on_start(&self, dispatcher: &Dispatcher, _event: &mut ProjectEvent) -> Result<()> {
        let workspace = &self.workspace;
        let options = WriteOptions::default();
        workspace.create_dir_all("tests")?;
        workspace.render_empty_files(dispatcher, &["tests/.gitkeep"], options)?;
        workspace.render_file(dispatcher, ".coveragerc", "pytest/coveragerc.j2", (), options)?;
        workspace.render_file(dispatcher, ".travis.yml", "pytest/travis.yml.j2", (), options)?;
        Ok(())
    }
}

impl Feature for PytestFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Pytest
    }

    fn requires(&self) -> &'static [FeatureName] {
        &[FeatureName::Python]
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher)
            .on(ON_PYTHON_GENERATE, 0, Self::on_python_generate)
            .on(ON_MAKE_GENERATE, SUPPORT_PRIORITY, Self::on_make_generate)
            .on(ON_START, SUPPORT_PRIORITY, Self::on_start);
    }
}
