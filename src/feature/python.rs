//! The «python» feature contains the base logic to manage a python package: setup
//! metadata, requirements per extra, package skeleton and install targets.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::events::{Dispatcher, EventId, ProjectEvent, ON_END, ON_START};
use crate::feature::make::{MakeConfig, MakefileEvent, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::{
    parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig, ABSOLUTE_PRIORITY,
};
use crate::file::WriteOptions;
use crate::resources::ConfigParserResource;
use crate::utils::{format_file_content, get_override_warning_banner, is_package_name};
use crate::workspace::Workspace;

/// Happens at the beginning of the python feature `on_start`, with the project event.
pub const ON_GENERATE: EventId<ProjectEvent> = EventId::new("medikit.feature.python.on_generate");

/// Name of a requirement line (`Django >=1.11,<2` is `Django`).
pub fn requirement_name(requirement: &str) -> Result<&str> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let re = NAME.get_or_init(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)").unwrap());
    re.captures(requirement)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
        .ok_or_else(|| Error::ConfigError(format!("invalid requirement '{requirement}'")))
}

type Requirements = BTreeMap<String, String>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PythonSettings {
    setup: IndexMap<String, Value>,
    requirements: Vec<String>,
    extras: IndexMap<String, Vec<String>>,
    constraints: Vec<String>,
    extras_constraints: IndexMap<String, Vec<String>>,
}

/// Configuration API for the «python» feature.
#[derive(Debug, Clone)]
pub struct PythonConfig {
    setup: IndexMap<String, Value>,
    /// Requirements by extra, `None` being the base requirements.
    requirements: BTreeMap<Option<String>, Requirements>,
    constraints: BTreeMap<Option<String>, Requirements>,
    /// Rewrite existing requirements files.
    pub override_requirements: bool,
}

impl Default for PythonConfig {
    fn default() -> Self {
        let mut requirements = BTreeMap::new();
        requirements.insert(None, Requirements::new());
        requirements.insert(Some("dev".to_string()), Requirements::new());
        Self {
            setup: IndexMap::new(),
            requirements,
            constraints: BTreeMap::new(),
            override_requirements: false,
        }
    }
}

fn add_to(target: &mut Requirements, requirements: &[String], kind: &str) -> Result<()> {
    for requirement in requirements {
        let name = requirement_name(requirement)?;
        if target.contains_key(name) {
            return Err(Error::ConfigError(format!("duplicate {kind} for {name}")));
        }
        target.insert(name.to_string(), requirement.trim().to_string());
    }
    Ok(())
}

impl PythonConfig {
    /// Updates setup metadata (`name`, `author`, ...).
    pub fn setup<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> &mut Self {
        self.setup.insert(key.into(), value.into());
        self
    }

    pub fn get_setup(&self) -> &IndexMap<String, Value> {
        &self.setup
    }

    pub fn name(&self) -> Option<&str> {
        self.setup.get("name").and_then(Value::as_str)
    }

    /// Setup name, validated as a dotted python package name.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the name is missing or is not a valid package name
    pub fn package_name(&self) -> Result<&str> {
        let name = self.name().ok_or_else(|| {
            Error::ConfigError(
                "python feature requires a package name, set it in python.setup.name".into(),
            )
        })?;
        if !is_package_name(name) {
            return Err(Error::ConfigError(format!("invalid python package name '{name}'")));
        }
        Ok(name)
    }

    /// Adds requirements to the base set (`extra` is `None`) or to an extra.
    ///
    /// # Errors
    /// * `Error::ConfigError` on duplicate or unparsable requirements
    pub fn add_requirements<S: AsRef<str>>(
        &mut self,
        extra: Option<&str>,
        requirements: &[S],
    ) -> Result<&mut Self> {
        let requirements: Vec<String> =
            requirements.iter().map(|r| r.as_ref().to_string()).collect();
        let target = self.requirements.entry(extra.map(str::to_string)).or_default();
        add_to(target, &requirements, "requirement")?;
        Ok(self)
    }

    pub fn add_constraints<S: AsRef<str>>(
        &mut self,
        extra: Option<&str>,
        constraints: &[S],
    ) -> Result<&mut Self> {
        let constraints: Vec<String> = constraints.iter().map(|r| r.as_ref().to_string()).collect();
        let target = self.constraints.entry(extra.map(str::to_string)).or_default();
        add_to(target, &constraints, "constraint")?;
        Ok(self)
    }

    /// Extras, sorted.
    pub fn get_extras(&self) -> Vec<&str> {
        self.requirements.keys().filter_map(|extra| extra.as_deref()).collect()
    }

    pub fn get_constraints(&self, extra: Option<&str>) -> Vec<String> {
        self.constraints
            .get(&extra.map(str::to_string))
            .map(|constraints| constraints.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Requirements of `extra`, sorted by name, optionally preceded by its constraints.
    pub fn get_requirements(&self, extra: Option<&str>, with_constraints: bool) -> Vec<String> {
        let mut requirements =
            if with_constraints { self.get_constraints(extra) } else { Vec::new() };
        if let Some(reqs) = self.requirements.get(&extra.map(str::to_string)) {
            requirements.extend(reqs.values().cloned());
        }
        requirements
    }
}

impl FeatureConfig for PythonConfig {
    fn apply(&mut self, settings: serde_yaml::Value) -> Result<()> {
        let settings: PythonSettings = parse_settings(Self::FEATURE, settings)?;
        let mut config = PythonConfig::default();
        config.setup = settings.setup;
        config.add_requirements(None, settings.requirements.as_slice())?;
        config.add_constraints(None, settings.constraints.as_slice())?;
        for (extra, requirements) in &settings.extras {
            config.add_requirements(Some(extra.as_str()), requirements.as_slice())?;
        }
        for (extra, constraints) in &settings.extras_constraints {
            config.add_constraints(Some(extra.as_str()), constraints.as_slice())?;
        }
        config.override_requirements = self.override_requirements;
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

impl TypedConfig for PythonConfig {
    const FEATURE: FeatureName = FeatureName::Python;
}

/// Turns loose requirements into the lines of a requirements file.
pub trait RequirementsResolver {
    fn resolve(&self, constraints: &[String]) -> Result<Vec<String>>;
}

/// Keeps requirements as declared, sorted case insensitively. Does not hit the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct LooseResolver;

impl RequirementsResolver for LooseResolver {
    fn resolve(&self, constraints: &[String]) -> Result<Vec<String>> {
        let mut resolved: Vec<String> = constraints.to_vec();
        resolved.sort_by_key(|requirement| requirement.to_lowercase());
        resolved.dedup();
        Ok(resolved)
    }
}

pub struct PythonFeature {
    workspace: Rc<Workspace>,
}

impl PythonFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let package_name = event.package_name()?.to_string();
        let makefile = &mut event.makefile;

        makefile.updateleft([
            ("PACKAGE", package_name.as_str()),
            ("PYTHON", "$(shell which python)"),
            ("PYTHON_BASENAME", "$(shell basename $(PYTHON))"),
            ("PYTHON_DIRNAME", "$(shell dirname $(PYTHON))"),
            ("PYTHON_REQUIREMENTS_FILE", "requirements.txt"),
            ("PYTHON_REQUIREMENTS_DEV_FILE", "requirements-dev.txt"),
        ]);

        makefile.set("PIP", "$(PYTHON_DIRNAME)/pip");
        makefile.set("PIP_INSTALL_OPTIONS", "");

        let install = makefile.add_install_target(None)?;
        let command = "$(PIP) install -U pip wheel $(PIP_INSTALL_OPTIONS) \
                       -r $(PYTHON_REQUIREMENTS_FILE)";
        install.install = vec![command.into()];
        install.deps = vec!["setup.py".into(), "requirements.txt".into()];

        let extras =
            event.config.config::<MakeConfig>().map(|make| make.extras.clone()).unwrap_or_default();
        for extra in extras {
            let (file, variable) = match extra.as_str() {
                "dev" => (
                    "requirements-dev.txt".to_string(),
                    "$(PYTHON_REQUIREMENTS_DEV_FILE)".to_string(),
                ),
                _ => {
                    let file = format!("requirements-{extra}.txt");
                    (file.clone(), file)
                }
            };
            let install = event.makefile.add_install_target(Some(&extra))?;
            install.install =
                vec![format!("$(PIP) install -U pip wheel $(PIP_INSTALL_OPTIONS) -r {variable}")];
            install.deps = vec!["setup.py".into(), file];
        }
        Ok(())
    }

    fn on_start(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        dispatcher.dispatch(ON_GENERATE, event)?;
        let name = event.config.require_config::<PythonConfig>().package_name()?.to_string();

        let workspace = &self.workspace;
        let options = WriteOptions::default();
        let classifiers = event
            .files
            .get("classifiers")
            .map(|content| format_file_content(content))
            .unwrap_or_default();
        workspace.write(dispatcher, "classifiers.txt", &classifiers, options)?;
        workspace.render_empty_files(dispatcher, &["README.rst"], options)?;
        workspace.render_file_inline(dispatcher, "MANIFEST.in", "include *.txt", (), options)?;

        let setup_cfg = event.config.define_resource("setup.cfg", ConfigParserResource::new())?;
        setup_cfg.set_initial_values([("metadata", vec![("description-file", "README.rst")])]);
        setup_cfg.set_managed_values([("bdist_wheel", vec![("universal", "1")])]);

        let python = event.config.require_config::<PythonConfig>();

        // Every parent of a dotted package is a namespace package.
        let bits: Vec<&str> = name.split('.').collect();
        if bits.len() > 1 {
            let namespaces: Vec<Value> =
                (1..bits.len()).map(|i| Value::from(bits[..i].join("."))).collect();
            python.setup("namespace_packages", namespaces);
        }

        let mut package_dir = PathBuf::new();
        for (i, bit) in bits.iter().enumerate() {
            package_dir.push(bit);
            workspace.create_dir_all(&package_dir)?;
            let is_namespace = i + 1 < bits.len();
            workspace.render_file(
                dispatcher,
                package_dir.join("__init__.py"),
                "python/package_init.py.j2",
                json!({ "is_namespace": is_namespace }),
                WriteOptions::default(),
            )?;
        }

        let version = match workspace.read_to_string("version.txt")? {
            Some(version) => version.trim().to_string(),
            None => {
                event.files.get("version").map_or("0.0.0", |version| version.trim()).to_string()
            }
        };
        workspace.render_file_inline(
            dispatcher,
            package_dir.join("_version.py"),
            "__version__ = '{{ version }}'",
            json!({ "version": version }),
            WriteOptions::default(),
        )?;

        let mut setup = python.get_setup().clone();
        let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        let mut expand = |key: &str| {
            let value = setup
                .shift_remove(key)
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_else(|| "http://example.com/".to_string());
            value.replace("{name}", &name).replace("{user}", &user)
        };
        let url = expand("url");
        let download_url = expand("download_url");
        let entry_points = setup.shift_remove("entry_points").unwrap_or_else(|| json!({}));

        let extras_require: IndexMap<String, Vec<String>> = python
            .get_extras()
            .into_iter()
            .map(|extra| (extra.to_string(), python.get_requirements(Some(extra), true)))
            .collect();

        let context = json!({
            "banner": get_override_warning_banner(),
            "url": url,
            "download_url": download_url,
            "entry_points": entry_points,
            "extras_require": extras_require,
            "install_requires": python.get_requirements(None, true),
            "setup": setup,
        });
        let options = WriteOptions::overwrite();
        workspace.render_file(dispatcher, "setup.py", "python/setup.py.j2", context, options)?;
        Ok(())
    }

    fn on_end(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let python = event.config.require_config::<PythonConfig>();
        let name = python.name().map(str::to_lowercase);
        let options = WriteOptions { overwrite: python.override_requirements, executable: false };

        let extras = std::iter::once(None).chain(python.get_extras().into_iter().map(Some));
        for extra in extras {
            let resolved = self.workspace.resolve(&python.get_requirements(extra, false))?;
            let mut lines = vec![match extra {
                Some(extra) => format!("-e .[{extra}]"),
                None => "-e .".to_string(),
            }];
            lines.extend(resolved.into_iter().filter(|requirement| {
                requirement_name(requirement).map(str::to_lowercase).ok() != name
            }));

            let target = match extra {
                Some(extra) => format!("requirements-{extra}.txt"),
                None => "requirements.txt".to_string(),
            };
            self.workspace.write(dispatcher, &target, &format!("{}\n", lines.join("\n")), options)?;
        }
        Ok(())
    }
}

impl Feature for PythonFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Python
    }

    fn requires(&self) -> &'static [FeatureName] {
        &[FeatureName::Make]
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher)
            .on(ON_MAKE_GENERATE, ABSOLUTE_PRIORITY, Self::on_make_generate)
            .on(ON_START, ABSOLUTE_PRIORITY, Self::on_start)
            .on(ON_END, ABSOLUTE_PRIORITY, Self::on_end);
    }
}
