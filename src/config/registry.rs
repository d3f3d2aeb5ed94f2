//! Configuration registry shared by every feature during a run.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::feature::python::PythonConfig;
use crate::feature::{FeatureConfig, FeatureName, TypedConfig};
use crate::pipeline::Pipeline;
use crate::resources::Resource;

/// Holds the per feature configurations, the pipelines, the Projectfile variables and
/// the shared resources of a project.
#[derive(Debug, Default)]
pub struct ConfigurationRegistry {
    configs: IndexMap<FeatureName, Box<dyn FeatureConfig>>,
    pipelines: IndexMap<String, Pipeline>,
    variables: IndexMap<String, String>,
    resources: IndexMap<String, Box<dyn Resource>>,
}

impl ConfigurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the configuration of `name`, creating it on first use.
    ///
    /// # Errors
    /// * `Error::UnknownFeature` if `name` is not a known feature (nothing is created)
    pub fn require(&mut self, name: &str) -> Result<&mut dyn FeatureConfig> {
        let feature: FeatureName = name.parse()?;
        Ok(self.require_feature(feature))
    }

    /// Requires several features at once, stopping at the first unknown one.
    pub fn require_all(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }

    pub fn require_feature(&mut self, feature: FeatureName) -> &mut dyn FeatureConfig {
        self.configs.entry(feature).or_insert_with(|| feature.default_config()).as_mut()
    }

    /// Typed version of [`require`](Self::require).
    pub fn require_config<C: TypedConfig>(&mut self) -> &mut C {
        let config = self
            .configs
            .entry(C::FEATURE)
            .or_insert_with(|| Box::new(C::default()) as Box<dyn FeatureConfig>);
        // Entries are always created from the feature's own config type.
        match config.as_any_mut().downcast_mut::<C>() {
            Some(config) => config,
            None => unreachable!("configuration type mismatch for feature '{}'", C::FEATURE),
        }
    }

    /// Configuration of a required feature, `None` if the feature was not required.
    pub fn config<C: TypedConfig>(&self) -> Option<&C> {
        self.configs.get(&C::FEATURE).and_then(|config| config.as_any().downcast_ref::<C>())
    }

    pub fn config_mut<C: TypedConfig>(&mut self) -> Option<&mut C> {
        self.configs
            .get_mut(&C::FEATURE)
            .and_then(|config| config.as_any_mut().downcast_mut::<C>())
    }

    /// Like [`config`](Self::config), but fails with a configuration error when the
    /// feature is not required.
    pub fn get<C: TypedConfig>(&self) -> Result<&C> {
        self.config::<C>().ok_or_else(|| {
            Error::ConfigError(format!("feature '{}' is not enabled", C::FEATURE))
        })
    }

    pub fn get_mut<C: TypedConfig>(&mut self) -> Result<&mut C> {
        self.config_mut::<C>().ok_or_else(|| {
            Error::ConfigError(format!("feature '{}' is not enabled", C::FEATURE))
        })
    }

    pub fn contains(&self, feature: FeatureName) -> bool {
        self.configs.contains_key(&feature)
    }

    /// Required features, in requirement order.
    pub fn keys(&self) -> impl Iterator<Item = FeatureName> + '_ {
        self.configs.keys().copied()
    }

    /// Returns the pipeline `name`, creating an empty one on first use.
    pub fn pipeline(&mut self, name: &str) -> &mut Pipeline {
        self.pipelines.entry(name.to_string()).or_default()
    }

    pub fn pipelines(&self) -> &IndexMap<String, Pipeline> {
        &self.pipelines
    }

    pub fn take_pipeline(&mut self, name: &str) -> Option<Pipeline> {
        self.pipelines.shift_remove(name)
    }

    pub fn set_var<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn variables(&self) -> &IndexMap<String, String> {
        &self.variables
    }

    /// Name of the package: python setup name if python is required, `PACKAGE` variable
    /// otherwise.
    pub fn package_name(&self) -> Result<String> {
        if let Some(python) = self.config::<PythonConfig>() {
            return python.package_name().map(str::to_string);
        }

        match self.get_var("PACKAGE") {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(Error::ConfigError(
                "define a package name in python.setup.name or the PACKAGE variable".into(),
            )),
        }
    }

    /// Project relative path of the file holding the current version: `version.txt` for
    /// python projects, the `VERSION_FILE` variable otherwise.
    pub fn get_version_file(&self) -> Result<String> {
        if self.contains(FeatureName::Python) {
            return Ok("version.txt".to_string());
        }
        match self.get_var("VERSION_FILE") {
            Some(file) => Ok(file.to_string()),
            None => Err(Error::ConfigError(
                "unable to find the version file, require the python feature or set the \
                 VERSION_FILE variable"
                    .into(),
            )),
        }
    }

    /// Reads the current version from the version file of the project at `root`.
    pub fn get_version(&self, root: &Path) -> Result<String> {
        let version_file = self.get_version_file()?;
        let content = fs::read_to_string(root.join(&version_file)).map_err(Error::IoError)?;

        if version_file.ends_with(".py") {
            static VERSION: OnceLock<Regex> = OnceLock::new();
            let re = VERSION.get_or_init(|| {
                Regex::new(r#"(?m)^__version__\s*=\s*['"]([^'"]*)['"]"#).unwrap()
            });
            return re
                .captures(&content)
                .map(|captures| captures[1].to_string())
                .ok_or_else(|| {
                    Error::ConfigError(format!("no __version__ found in '{version_file}'"))
                });
        }

        Ok(content.trim().to_string())
    }

    /// Registers a shared resource.
    ///
    /// # Errors
    /// * `Error::ResourceRedefined` if `target` already has a resource
    pub fn define_resource<R: Resource>(&mut self, target: &str, resource: R) -> Result<&mut R> {
        if self.resources.contains_key(target) {
            return Err(Error::ResourceRedefined { target: target.to_string() });
        }
        self.resources.insert(target.to_string(), Box::new(resource));
        self.get_resource::<R>(target)
    }

    /// Returns the resource defined for `target`, to merge more values into it.
    ///
    /// # Errors
    /// * `Error::UnknownResource` if nothing (or a resource of another type) is defined
    pub fn get_resource<R: Resource>(&mut self, target: &str) -> Result<&mut R> {
        self.resources
            .get_mut(target)
            .and_then(|resource| resource.as_any_mut().downcast_mut::<R>())
            .ok_or_else(|| Error::UnknownResource { target: target.to_string() })
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &dyn Resource)> {
        self.resources.iter().map(|(target, resource)| (target.as_str(), resource.as_ref()))
    }
}
