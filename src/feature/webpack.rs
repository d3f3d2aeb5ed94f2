//! Webpack support, on top of the nodejs feature. Experimental.

use std::any::Any;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::Result;
use crate::events::Dispatcher;
use crate::feature::make::{MakefileEvent, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::{parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig};
use crate::workspace::Workspace;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpackConfig {}

impl FeatureConfig for WebpackConfig {
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

impl TypedConfig for WebpackConfig {
    const FEATURE: FeatureName = FeatureName::Webpack;
}

pub struct WebpackFeature;

impl WebpackFeature {
    pub fn new(_workspace: Rc<Workspace>) -> Self {
        Self
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        event.makefile.install_script_mut("install")?.install.push("$(YARN) --version".into());
        Ok(())
    }
}

impl Feature for WebpackFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Webpack
    }

    fn requires(&self) -> &'static [FeatureName] {
        &[FeatureName::Nodejs]
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        // Same priority as nodejs, which attaches first.
        Subscriber::new(self, dispatcher).on(ON_MAKE_GENERATE, 0, Self::on_make_generate);
    }
}
