//! Projectfile loading.
//! The Projectfile is a declarative JSON or YAML document describing variables, enabled
//! features with their settings, and pipeline customizations.
//!
//! ```yaml
//! variables: { PACKAGE: foo }
//! features:
//!   python:
//!     setup: { name: foo, author: Jane }
//!     requirements: [requests]
//!   pytest: {}
//! pipelines:
//!   release:
//!     remove: ['Install()']
//!     steps:
//!       - { type: make, target: docs, before: 'Commit("Release: {version}", true)' }
//! ```

pub mod defaults;
pub mod registry;

use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::constants::DEFAULT_FEATURES;
use crate::error::{Error, Result};
use crate::feature::FeatureName;
use crate::steps::{BumpVersion, Commit, Install, Make, Step, System};

use self::defaults::setup_default_pipelines;
use self::registry::ConfigurationRegistry;

/// Features section, either a plain list of names or a map of name to settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeatureDeclarations {
    List(Vec<String>),
    Map(IndexMap<String, serde_yaml::Value>),
}

impl Default for FeatureDeclarations {
    fn default() -> Self {
        FeatureDeclarations::Map(IndexMap::new())
    }
}

impl FeatureDeclarations {
    pub fn into_settings(self) -> Vec<(String, serde_yaml::Value)> {
        match self {
            FeatureDeclarations::List(names) => {
                names.into_iter().map(|name| (name, serde_yaml::Value::Null)).collect()
            }
            FeatureDeclarations::Map(map) => map.into_iter().collect(),
        }
    }
}

/// Step kinds that can be declared in a Projectfile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum StepKind {
    Install,
    BumpVersion,
    Make {
        target: String,
    },
    System {
        command: String,
        #[serde(default)]
        interactive: bool,
    },
    Commit {
        message: String,
        #[serde(default)]
        tag: bool,
    },
}

impl StepKind {
    pub fn build(&self) -> Box<dyn Step> {
        match self {
            StepKind::Install => Box::new(Install::new()),
            StepKind::BumpVersion => Box::new(BumpVersion::new()),
            StepKind::Make { target } => Box::new(Make::new(target.as_str())),
            StepKind::System { command, interactive } => {
                Box::new(System::new(command.as_str(), *interactive))
            }
            StepKind::Commit { message, tag } => Box::new(Commit::new(message.as_str(), *tag)),
        }
    }
}

/// A step added to a pipeline, appended or inserted before an existing step identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_yaml::Value")]
pub struct StepDeclaration {
    pub step: StepKind,
    pub before: Option<String>,
}

impl TryFrom<serde_yaml::Value> for StepDeclaration {
    type Error = String;

    fn try_from(value: serde_yaml::Value) -> std::result::Result<Self, Self::Error> {
        let serde_yaml::Value::Mapping(mut mapping) = value else {
            return Err("a step must be a mapping with a \"type\" key".to_string());
        };
        let before = match mapping.remove("before") {
            None | Some(serde_yaml::Value::Null) => None,
            Some(serde_yaml::Value::String(identity)) => Some(identity),
            Some(_) => return Err("\"before\" must be a step identity string".to_string()),
        };
        let step = serde_yaml::from_value(serde_yaml::Value::Mapping(mapping))
            .map_err(|e| e.to_string())?;
        Ok(Self { step, before })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineDeclaration {
    /// Identities of the steps to remove, `Install()` for example.
    pub remove: Vec<String>,
    pub steps: Vec<StepDeclaration>,
}

/// Raw content of a Projectfile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Projectfile {
    pub variables: IndexMap<String, String>,
    pub features: FeatureDeclarations,
    pub files: IndexMap<String, String>,
    pub pipelines: IndexMap<String, PipelineDeclaration>,
}

/// Parses a document, trying JSON first and YAML as fallback.
pub fn parse_document<T: DeserializeOwned>(content: &str) -> Result<T> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("invalid Projectfile format: {e}"))),
    }
}

/// Everything the update command needs from a Projectfile.
#[derive(Debug)]
pub struct Configuration {
    /// Enabled features, defaults included.
    pub features: Vec<FeatureName>,
    pub files: IndexMap<String, String>,
    pub registry: ConfigurationRegistry,
}

impl Configuration {
    /// Builds the configuration from an already parsed Projectfile.
    pub fn from_projectfile(projectfile: Projectfile) -> Result<Self> {
        let mut registry = ConfigurationRegistry::new();

        for (name, value) in projectfile.variables {
            registry.set_var(name, value);
        }

        for feature in DEFAULT_FEATURES {
            registry.require_feature(feature);
        }
        for (name, settings) in projectfile.features.into_settings() {
            registry.require(&name)?.apply(settings)?;
        }

        setup_default_pipelines(&mut registry);
        for (name, declaration) in projectfile.pipelines {
            apply_pipeline_declaration(&mut registry, &name, declaration)?;
        }

        let features = registry.keys().collect();
        Ok(Self { features, files: projectfile.files, registry })
    }
}

fn apply_pipeline_declaration(
    registry: &mut ConfigurationRegistry,
    name: &str,
    declaration: PipelineDeclaration,
) -> Result<()> {
    let pipeline = registry.pipeline(name);
    for identity in &declaration.remove {
        if !pipeline.remove(identity) {
            return Err(Error::PipelineError(format!(
                "cannot remove {identity} from pipeline '{name}', no such step"
            )));
        }
    }
    for declared in declaration.steps {
        let step = declared.step.build();
        match declared.before {
            Some(identity) => {
                pipeline.add_before(&identity, step)?;
            }
            None => {
                pipeline.add_boxed(step);
            }
        }
    }
    Ok(())
}

/// Reads and evaluates the Projectfile at `path`.
///
/// # Errors
/// * `Error::IoError` if the file cannot be read
/// * `Error::ConfigError` if it is neither valid JSON nor valid YAML, or has invalid settings
/// * `Error::UnknownFeature` if it enables a feature that does not exist
pub fn read_configuration<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
    let projectfile: Projectfile = parse_document(&content)?;
    Configuration::from_projectfile(projectfile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_declaration() {
        let declaration: StepDeclaration =
            serde_yaml::from_str("{ type: make, target: docs, before: 'Install()' }").unwrap();
        assert_eq!(declaration.step, StepKind::Make { target: "docs".to_string() });
        assert_eq!(declaration.before.as_deref(), Some("Install()"));

        let declaration: StepDeclaration = serde_yaml::from_str("{ type: bump_version }").unwrap();
        assert_eq!(declaration.step, StepKind::BumpVersion);
        assert_eq!(declaration.before, None);

        assert!(serde_yaml::from_str::<StepDeclaration>("{ type: rm_rf }").is_err());
    }

    #[test]
    fn test_features_as_list() {
        let projectfile: Projectfile = parse_document("features: [python, pytest]").unwrap();
        let names: Vec<String> =
            projectfile.features.into_settings().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["python", "pytest"]);
    }
}
