//! GNU Make support.
//!
//! Builds the project Makefile. Other features contribute variables and targets by
//! listening to [`ON_GENERATE`].

use std::any::Any;
use std::rc::Rc;

use log::debug;
use serde::Deserialize;

use crate::config::registry::ConfigurationRegistry;
use crate::error::{Error, Result};
use crate::events::{Dispatcher, EventId, ProjectEvent, ON_START};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, HIGH_PRIORITY,
};
use crate::file::WriteOptions;
use crate::structs::Script;
use crate::utils::format_file_content;
use crate::workspace::Workspace;

mod makefile;

pub use makefile::{
    which, AssignmentOperator, CleanScript, InstallScript, Makefile, MakefileTarget, Rule,
    TargetOptions,
};

/// Happens during the makefile generation.
pub const ON_GENERATE: EventId<MakefileEvent> = EventId::new("medikit.feature.make.on_generate");

/// Payload of [`ON_GENERATE`].
#[derive(Debug)]
pub struct MakefileEvent {
    /// Package name, when one could be determined.
    pub package_name: Option<String>,
    pub makefile: Makefile,
    pub config: ConfigurationRegistry,
}

impl MakefileEvent {
    /// Package name, for features that cannot work without one.
    pub fn package_name(&self) -> Result<&str> {
        self.package_name.as_deref().ok_or_else(|| {
            Error::ConfigError(
                "define a package name in python.setup.name or the PACKAGE variable".into(),
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MakeConfig {
    /// Adds the `medikit`, `update` and `update-requirements` targets.
    pub include_medikit_targets: bool,
    /// An `install-<extra>` target is generated for each extra.
    pub extras: Vec<String>,
}

impl Default for MakeConfig {
    fn default() -> Self {
        Self { include_medikit_targets: true, extras: vec!["dev".to_string()] }
    }
}

impl FeatureConfig for MakeConfig {
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

impl TypedConfig for MakeConfig {
    const FEATURE: FeatureName = FeatureName::Make;
}

const HELP_SCRIPT: &str = concat!(
    r#"
    @echo "Available commands:"
    @echo
    @grep -E '^[a-zA-Z_-]+:.*?##[\s]?.*$$' $(MAKEFILE_LIST) | sort | awk "#,
    r#"'BEGIN {FS = ":.*?##"}; {printf "    make \033[36m%-30s\033[0m %s\n", $$1, $$2}'
    @echo
"#
);

pub struct MakeFeature {
    workspace: Rc<Workspace>,
}

impl MakeFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_start(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let mut makefile = Makefile::new();

        for (key, value) in &event.variables {
            makefile.set(key.to_uppercase(), value.as_str());
        }
        makefile.updateleft([("QUICK", "")]);

        makefile.add_install_target(None)?;
        let config = event.config.require_config::<MakeConfig>().clone();
        for extra in &config.extras {
            makefile.add_install_target(Some(extra))?;
        }

        makefile.add_target(
            "quick",
            Script::new("@printf \"\""),
            TargetOptions::new().phony().hidden(),
        )?;

        let mut make_event = MakefileEvent {
            package_name: event.config.package_name().ok(),
            makefile,
            config: std::mem::take(&mut event.config),
        };
        let result = dispatcher.dispatch(ON_GENERATE, &mut make_event);
        event.config = make_event.config;
        result?;
        let mut makefile = make_event.makefile;

        if config.include_medikit_targets {
            add_medikit_targets(&mut makefile)?;
        }

        makefile.add_target(
            "help",
            HELP_SCRIPT,
            TargetOptions::new().phony().doc("Shows available commands."),
        )?;

        debug!("Makefile has {} variables.", makefile.len());
        self.workspace.write(
            dispatcher,
            "Makefile",
            &format_file_content(&makefile.to_string()),
            WriteOptions::overwrite(),
        )?;
        Ok(())
    }
}

fn add_medikit_targets(makefile: &mut Makefile) -> Result<()> {
    makefile.set("MEDIKIT", which("medikit", &[]));
    makefile.set("MEDIKIT_UPDATE_OPTIONS", "");
    makefile.set("MEDIKIT_VERSION", env!("CARGO_PKG_VERSION"));

    makefile.add_target(
        "medikit",
        "@$(MEDIKIT) --version >/dev/null 2>&1 \
         || cargo install medikit --version \">=$(MEDIKIT_VERSION)\"",
        TargetOptions::new()
            .phony()
            .hidden()
            .doc("Checks medikit is installed and installs it otherwise."),
    )?;

    makefile.add_target(
        "update",
        "$(MEDIKIT) update $(MEDIKIT_UPDATE_OPTIONS)",
        TargetOptions::new()
            .deps(["medikit"])
            .phony()
            .doc("Update project artifacts using medikit."),
    )?;

    makefile.add_target(
        "update-requirements",
        "MEDIKIT_UPDATE_OPTIONS=\"--override-requirements\" $(MAKE) update",
        TargetOptions::new()
            .phony()
            .doc("Update project artifacts using medikit, including requirements files."),
    )?;
    Ok(())
}

impl Feature for MakeFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Make
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher).on(ON_START, HIGH_PRIORITY, Self::on_start);
    }
}
