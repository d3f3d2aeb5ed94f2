//! NodeJS / yarn support alongside a python package.

use std::any::Any;
use std::rc::Rc;

use log::warn;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::events::{Dispatcher, ProjectEvent, ON_END, ON_START};
use crate::feature::make::{MakefileEvent, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::python::PythonConfig;
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, LAST_PRIORITY,
};
use crate::file::WriteOptions;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodejsConfig {}

impl FeatureConfig for NodejsConfig {
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

impl TypedConfig for NodejsConfig {
    const FEATURE: FeatureName = FeatureName::Nodejs;
}

pub struct NodejsFeature {
    workspace: Rc<Workspace>,
}

impl NodejsFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let makefile = &mut event.makefile;
        makefile.set("YARN", "$(shell which yarn)");
        makefile.set("NODE", "$(shell which node)");

        makefile.install_script_mut("install")?.install.push("$(YARN) install --production".into());
        if makefile.has_target("install-dev") {
            makefile.install_script_mut("install-dev")?.install.push("$(YARN) install".into());
        }
        Ok(())
    }

    /// Writes `package.json` from the python package metadata, unless it exists.
    fn on_start(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let setup = event.config.get::<PythonConfig>()?.get_setup();
        let field = |key: &str| setup.get(key).cloned().unwrap_or(Value::Null);
        let package = json!({
            "name": field("name"),
            "version": "0.0.0",
            "description": field("description"),
            "author": field("author"),
            "license": field("license"),
        });

        let content = format!("{}\n", serde_json::to_string_pretty(&package)?);
        self.workspace.write(dispatcher, "package.json", &content, WriteOptions::default())?;
        Ok(())
    }

    fn on_end(&self, _dispatcher: &Dispatcher, _event: &mut ProjectEvent) -> Result<()> {
        for command in ["yarn install", "git add yarn.lock"] {
            if let Err(err) = self.workspace.exec(command) {
                warn!("{err}");
            }
        }
        Ok(())
    }
}

impl Feature for NodejsFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Nodejs
    }

    fn requires(&self) -> &'static [FeatureName] {
        &[FeatureName::Make, FeatureName::Python]
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher)
            .on(ON_MAKE_GENERATE, 0, Self::on_make_generate)
            .on(ON_START, 0, Self::on_start)
            .on(ON_END, LAST_PRIORITY, Self::on_end);
    }
}
