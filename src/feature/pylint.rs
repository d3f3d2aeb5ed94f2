//! Adds the pylint linter to your project.

use std::any::Any;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::Result;
use crate::events::{Dispatcher, ProjectEvent};
use crate::feature::make::{MakefileEvent, TargetOptions, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::python::{PythonConfig, ON_GENERATE as ON_PYTHON_GENERATE};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, SUPPORT_PRIORITY,
};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PylintConfig {
    /// Requirement line added to the dev extra.
    pub requirement: String,
}

impl Default for PylintConfig {
    fn default() -> Self {
        Self { requirement: "pylint ~=2.4".to_string() }
    }
}

impl FeatureConfig for PylintConfig {
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

impl TypedConfig for PylintConfig {
    const FEATURE: FeatureName = FeatureName::Pylint;
}

/// Only contributes to the Makefile and requirements, never writes files itself.
pub struct PylintFeature;

impl PylintFeature {
    pub fn new(_workspace: Rc<Workspace>) -> Self {
        Self
    }

    fn on_python_generate(&self, _dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let requirement = event.config.require_config::<PylintConfig>().requirement.clone();
        event.config.get_mut::<PythonConfig>()?.add_requirements(Some("dev"), &[requirement])?;
        Ok(())
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        event.makefile.add_target(
            "lint",
            "$(PYTHON_DIRNAME)/pylint --output-format=colorized $(PACKAGE)",
            TargetOptions::new().deps(["install-dev"]).phony().doc("Runs the linter."),
        )?;
        Ok(())
    }
}

impl Feature for PylintFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Pylint
    }

    fn requires(&self) -> &'static [FeatureName] {
        &[FeatureName::Python]
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher)
            .on(ON_PYTHON_GENERATE, 0, Self::on_python_generate)
            .on(ON_MAKE_GENERATE, SUPPORT_PRIORITY, Self::on_make_generate);
    }
}
