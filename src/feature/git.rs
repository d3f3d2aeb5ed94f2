//! Git version control system support.

use std::any::Any;
use std::rc::Rc;

use log::{info, warn};
use serde::Deserialize;

use crate::error::Result;
use crate::events::{Dispatcher, FileEvent, ProjectEvent, ON_END, ON_FILE_CLOSED, ON_START};
use crate::feature::make::{MakefileEvent, ON_GENERATE};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, ABSOLUTE_PRIORITY,
};
use crate::file::WriteOptions;
use crate::workspace::Workspace;

const GITIGNORE: &str = "
    *.egg-info
    *.iml
    *.pyc
    *.swp
    /.cache
    /.coverage
    /.idea
    /.medikit
    /.python*-*
    /build
    /dist
    /htmlcov
    /pylint.html
";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    pub enabled: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FeatureConfig for GitConfig {
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

impl TypedConfig for GitConfig {
    const FEATURE: FeatureName = FeatureName::Git;
}

/// Git failures are reported but never abort the generation.
fn git(workspace: &Workspace, command: &str) {
    if let Err(err) = workspace.exec(command) {
        warn!("{err}");
    }
}

pub struct GitFeature {
    workspace: Rc<Workspace>,
}

impl GitFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_start(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        if !event.config.require_config::<GitConfig>().enabled {
            return Ok(());
        }

        if !self.workspace.exists(".git") {
            info!("Creating git repository...");
            git(&self.workspace, "git init");
            git(&self.workspace, "git add Projectfile");
            git(&self.workspace, "git commit -m \"Project initialized using Medikit.\"");
        }

        let workspace = Rc::clone(&self.workspace);
        dispatcher.add_listener(ON_FILE_CLOSED, -1, move |_, file: &mut FileEvent| {
            git(&workspace, &format!("git add {}", file.filename.display()));
            Ok(())
        });
        Ok(())
    }

    fn on_end(&self, dispatcher: &Dispatcher, _event: &mut ProjectEvent) -> Result<()> {
        let options = WriteOptions::default();
        self.workspace.render_file_inline(dispatcher, ".gitignore", GITIGNORE, (), options)?;
        Ok(())
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        event
            .makefile
            .set("VERSION", "$(shell git describe 2>/dev/null || git rev-parse --short HEAD)");
        Ok(())
    }
}

impl Feature for GitFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Git
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher)
            .on(ON_START, ABSOLUTE_PRIORITY, Self::on_start)
            .on(ON_END, 0, Self::on_end)
            .on(ON_GENERATE, ABSOLUTE_PRIORITY + 1, Self::on_make_generate);
    }
}
