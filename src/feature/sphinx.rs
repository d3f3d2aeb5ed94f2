//! Builds the project documentation with sphinx.

use std::any::Any;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::Result;
use crate::events::{Dispatcher, ProjectEvent};
use crate::feature::make::{MakefileEvent, TargetOptions, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::python::{requirement_name, PythonConfig, ON_GENERATE as ON_PYTHON_GENERATE};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, SUPPORT_PRIORITY,
};
use crate::workspace::Workspace;

pub const SPHINX_REQUIREMENT: &str = "sphinx >=1.6,<2.0";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SphinxConfig {
    /// Requirement of the html theme, added to the dev extra.
    pub theme: Option<String>,
}

impl FeatureConfig for SphinxConfig {
    fn apply(&mut self, settings: serde_yaml::Value) -> Result<()> {
        let config: Self = parse_settings(Self::FEATURE, settings)?;
        if let Some(theme) = &config.theme {
            requirement_name(theme)?;
        }
        *self = config;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedConfig for SphinxConfig {
    const FEATURE: FeatureName = FeatureName::Sphinx;
}

pub struct SphinxFeature;

impl SphinxFeature {
    pub fn new(_workspace: Rc<Workspace>) -> Self {
        Self
    }

    fn on_python_generate(&self, _dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let mut requirements = vec![SPHINX_REQUIREMENT.to_string()];
        requirements.extend(event.config.require_config::<SphinxConfig>().theme.clone());
        event.config.get_mut::<PythonConfig>()?.add_requirements(Some("dev"), &requirements)?;
        Ok(())
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let makefile = &mut event.makefile;
        makefile.set("SPHINX_BUILD", "$(PYTHON_DIRNAME)/sphinx-build");
        makefile.set("SPHINX_OPTIONS", "");
        makefile.set("SPHINX_SOURCEDIR", "docs");
        makefile.set("SPHINX_BUILDDIR", "$(SPHINX_SOURCEDIR)/_build");

        makefile.add_target(
            "$(SPHINX_SOURCEDIR)",
            "$(SPHINX_BUILD) -b html -D latex_paper_size=a4 $(SPHINX_OPTIONS) \
             $(SPHINX_SOURCEDIR) $(SPHINX_BUILDDIR)/html",
            TargetOptions::new().deps(["install-dev"]).phony().doc("Update sphinx documentation."),
        )?;
        Ok(())
    }
}

impl Feature for SphinxFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Sphinx
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
