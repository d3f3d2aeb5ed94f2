//! Code formatting, using third party tools.
//!
//! ```shell-session
//! $ make format
//! ```

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::events::{Dispatcher, ProjectEvent, ON_START};
use crate::feature::make::{which, MakefileEvent, TargetOptions, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::python::{PythonConfig, ON_GENERATE as ON_PYTHON_GENERATE};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, SUPPORT_PRIORITY,
};
use crate::file::WriteOptions;
use crate::resources::ConfigParserResource;
use crate::structs::Script;
use crate::workspace::Workspace;

pub const LINE_LENGTH: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTool {
    Black,
    Isort,
    Prettier,
    Yapf,
}

impl FormatTool {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTool::Black => "black",
            FormatTool::Isort => "isort",
            FormatTool::Prettier => "prettier",
            FormatTool::Yapf => "yapf",
        }
    }
}

impl fmt::Display for FormatTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    /// Tools to run, `black` and `isort` when empty.
    tools: BTreeSet<FormatTool>,
}

impl FormatConfig {
    pub fn active_tools(&self) -> BTreeSet<FormatTool> {
        if self.tools.is_empty() {
            [FormatTool::Black, FormatTool::Isort].into_iter().collect()
        } else {
            self.tools.clone()
        }
    }
}

impl FeatureConfig for FormatConfig {
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

impl TypedConfig for FormatConfig {
    const FEATURE: FeatureName = FeatureName::Format;
}

pub struct FormatFeature {
    workspace: Rc<Workspace>,
}

impl FormatFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_python_generate(&self, _dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let tools = event.config.require_config::<FormatConfig>().active_tools();
        // black is left to the user, it needs a recent python.
        let requirements: Vec<&str> = tools
            .iter()
            .filter(|tool| matches!(tool, FormatTool::Isort | FormatTool::Yapf))
            .map(FormatTool::as_str)
            .collect();
        event
            .config
            .get_mut::<PythonConfig>()?
            .add_requirements(Some("dev"), requirements.as_slice())?;
        Ok(())
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let tools = event.config.require_config::<FormatConfig>().active_tools();
        if tools.contains(&FormatTool::Black) && tools.contains(&FormatTool::Yapf) {
            return Err(Error::ConfigError(
                "using both \"black\" and \"yapf\" does not make sense, choose one".into(),
            ));
        }

        let makefile = &mut event.makefile;
        let mut script = Script::default();

        if tools.contains(&FormatTool::Black) {
            makefile.set("BLACK", which("black", &[]));
            makefile.set("BLACK_OPTIONS", format!("--line-length {LINE_LENGTH}"));
            script.append("$(BLACK) $(BLACK_OPTIONS) . Projectfile");
        }
        if tools.contains(&FormatTool::Yapf) {
            makefile.set("YAPF", "$(PYTHON) -m yapf");
            makefile.set("YAPF_OPTIONS", "-rip");
            script.append("$(YAPF) $(YAPF_OPTIONS) . Projectfile");
        }
        if tools.contains(&FormatTool::Isort) {
            makefile.set("ISORT", "$(PYTHON) -m isort");
            makefile.set("ISORT_OPTIONS", "--recursive --apply");
            script.append("$(ISORT) $(ISORT_OPTIONS) . Projectfile");
        }
        if tools.contains(&FormatTool::Prettier) {
            makefile.set("PRETTIER", which("prettier", &[]));
            makefile.set("PRETTIER_OPTIONS", "--write");
            makefile.set("PRETTIER_PATTERNS", r"**/*.\{j,t\}s **/*.\{j,t\}sx \!docs/**");
            script.append("$(PRETTIER) $(PRETTIER_OPTIONS) $(PRETTIER_PATTERNS)");
        }

        let names: Vec<&str> = tools.iter().map(FormatTool::as_str).collect();
        makefile.add_target(
            "format",
            script,
            TargetOptions::new()
                .deps(["install-dev"])
                .phony()
                .doc(format!("Reformats the codebase (with {}).", names.join(", "))),
        )?;
        Ok(())
    }

    fn on_start(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let tools = event.config.require_config::<FormatConfig>().active_tools();
        if tools.contains(&FormatTool::Isort) {
            let line_length = LINE_LENGTH.to_string();
            event
                .config
                .get_resource::<ConfigParserResource>("setup.cfg")?
                .set_managed_values([("isort", vec![("line_length", line_length)])]);
        }
        if tools.contains(&FormatTool::Yapf) {
            self.workspace.render_file(
                dispatcher,
                ".style.yapf",
                "yapf/style.yapf.j2",
                serde_json::json!({ "line_length": LINE_LENGTH }),
                WriteOptions::default(),
            )?;
        }
        Ok(())
    }
}

impl Feature for FormatFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Format
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
