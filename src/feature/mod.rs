//! Features are the units of generation logic.
//!
//! Each feature owns a typed configuration stored in the
//! [`ConfigurationRegistry`](crate::config::registry::ConfigurationRegistry), declares the
//! features it requires or conflicts with, and attaches listeners to the event
//! [`Dispatcher`]. The set of features is closed: [`FeatureName::ALL`].

use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use log::debug;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::events::{Dispatcher, EventId};
use crate::workspace::Workspace;

pub mod docker;
pub mod format;
pub mod git;
pub mod kube;
pub mod make;
pub mod nodejs;
pub mod pylint;
pub mod pytest;
pub mod python;
pub mod sphinx;
pub mod webpack;

pub const ABSOLUTE_PRIORITY: i32 = -100;
pub const HIGH_PRIORITY: i32 = -80;
pub const MEDIUM_PRIORITY: i32 = -60;
pub const LOW_PRIORITY: i32 = -40;
pub const SUPPORT_PRIORITY: i32 = -20;
pub const LAST_PRIORITY: i32 = 100;

/// Name of a known feature. Ordered alphabetically, which is also the order in which
/// features attach their listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureName {
    Docker,
    Format,
    Git,
    Kube,
    Make,
    Nodejs,
    Pylint,
    Pytest,
    Python,
    Sphinx,
    Webpack,
}

impl FeatureName {
    pub const ALL: [FeatureName; 11] = [
        FeatureName::Docker,
        FeatureName::Format,
        FeatureName::Git,
        FeatureName::Kube,
        FeatureName::Make,
        FeatureName::Nodejs,
        FeatureName::Pylint,
        FeatureName::Pytest,
        FeatureName::Python,
        FeatureName::Sphinx,
        FeatureName::Webpack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Docker => "docker",
            FeatureName::Format => "format",
            FeatureName::Git => "git",
            FeatureName::Kube => "kube",
            FeatureName::Make => "make",
            FeatureName::Nodejs => "nodejs",
            FeatureName::Pylint => "pylint",
            FeatureName::Pytest => "pytest",
            FeatureName::Python => "python",
            FeatureName::Sphinx => "sphinx",
            FeatureName::Webpack => "webpack",
        }
    }

    /// Fresh configuration object for this feature.
    pub fn default_config(&self) -> Box<dyn FeatureConfig> {
        match self {
            FeatureName::Docker => Box::<docker::DockerConfig>::default(),
            FeatureName::Format => Box::<format::FormatConfig>::default(),
            FeatureName::Git => Box::<git::GitConfig>::default(),
            FeatureName::Kube => Box::<kube::KubeConfig>::default(),
            FeatureName::Make => Box::<make::MakeConfig>::default(),
            FeatureName::Nodejs => Box::<nodejs::NodejsConfig>::default(),
            FeatureName::Pylint => Box::<pylint::PylintConfig>::default(),
            FeatureName::Pytest => Box::<pytest::PytestConfig>::default(),
            FeatureName::Python => Box::<python::PythonConfig>::default(),
            FeatureName::Sphinx => Box::<sphinx::SphinxConfig>::default(),
            FeatureName::Webpack => Box::<webpack::WebpackConfig>::default(),
        }
    }

    /// Instantiates the feature, bound to `workspace`.
    pub fn create(&self, workspace: Rc<Workspace>) -> Rc<dyn Feature> {
        match self {
            FeatureName::Docker => Rc::new(docker::DockerFeature::new(workspace)),
            FeatureName::Format => Rc::new(format::FormatFeature::new(workspace)),
            FeatureName::Git => Rc::new(git::GitFeature::new(workspace)),
            FeatureName::Kube => Rc::new(kube::KubeFeature::new(workspace)),
            FeatureName::Make => Rc::new(make::MakeFeature::new(workspace)),
            FeatureName::Nodejs => Rc::new(nodejs::NodejsFeature::new(workspace)),
            FeatureName::Pylint => Rc::new(pylint::PylintFeature::new(workspace)),
            FeatureName::Pytest => Rc::new(pytest::PytestFeature::new(workspace)),
            FeatureName::Python => Rc::new(python::PythonFeature::new(workspace)),
            FeatureName::Sphinx => Rc::new(sphinx::SphinxFeature::new(workspace)),
            FeatureName::Webpack => Rc::new(webpack::WebpackFeature::new(workspace)),
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        FeatureName::ALL
            .iter()
            .copied()
            .find(|feature| feature.as_str() == name)
            .ok_or_else(|| Error::UnknownFeature { name: name.to_string() })
    }
}

/// Per project configuration of a feature.
pub trait FeatureConfig: Any + fmt::Debug {
    /// Applies the settings found under this feature in the Projectfile.
    fn apply(&mut self, settings: serde_yaml::Value) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A configuration type statically bound to its feature.
pub trait TypedConfig: FeatureConfig + Default {
    const FEATURE: FeatureName;
}

/// Deserializes Projectfile settings for `feature`; a null value yields the defaults.
pub fn parse_settings<T>(feature: FeatureName, settings: serde_yaml::Value) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if settings.is_null() {
        return Ok(T::default());
    }
    serde_yaml::from_value(settings)
        .map_err(|e| Error::ConfigError(format!("invalid settings for feature '{feature}': {e}")))
}

/// A unit of generation logic, alive for the duration of one run.
pub trait Feature {
    fn name(&self) -> FeatureName;

    /// Features that must be enabled alongside this one.
    fn requires(&self) -> &'static [FeatureName] {
        &[]
    }

    /// Features that cannot be enabled alongside this one.
    fn conflicts(&self) -> &'static [FeatureName] {
        &[]
    }

    /// Attaches the feature listeners to `dispatcher`.
    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher);
}

/// Attaches the handlers of a feature, keeping the feature alive as long as the
/// dispatcher holds its listeners.
pub struct Subscriber<'a, F> {
    feature: Rc<F>,
    dispatcher: &'a Dispatcher,
}

impl<'a, F: 'static> Subscriber<'a, F> {
    pub fn new(feature: Rc<F>, dispatcher: &'a Dispatcher) -> Self {
        Self { feature, dispatcher }
    }

    pub fn on<E: 'static>(
        self,
        event: EventId<E>,
        priority: i32,
        handler: fn(&F, &Dispatcher, &mut E) -> Result<()>,
    ) -> Self {
        let feature = Rc::clone(&self.feature);
        self.dispatcher.add_listener(event, priority, move |dispatcher, payload| {
            handler(&feature, dispatcher, payload)
        });
        self
    }
}

/// Validates the flat requires / conflicts relations of a feature set.
///
/// # Errors
/// * `Error::UnmetDependency` if a required feature is missing
/// * `Error::ConflictingDependency` if two conflicting features are both enabled
pub fn check_dependencies(features: &[Rc<dyn Feature>]) -> Result<()> {
    let names: BTreeSet<FeatureName> = features.iter().map(|feature| feature.name()).collect();
    for feature in features {
        if let Some(missing) = feature.requires().iter().find(|name| !names.contains(*name)) {
            return Err(Error::UnmetDependency { feature: feature.name(), requires: *missing });
        }
        if let Some(conflict) = feature.conflicts().iter().find(|name| names.contains(*name)) {
            return Err(Error::ConflictingDependency {
                feature: feature.name(),
                conflicts: *conflict,
            });
        }
    }
    Ok(())
}

/// Instantiates `names`, validates their dependencies and attaches their listeners.
///
/// Nothing is attached when validation fails, so no file gets written.
pub fn load_features<I>(
    names: I,
    workspace: &Rc<Workspace>,
    dispatcher: &Dispatcher,
) -> Result<Vec<Rc<dyn Feature>>>
where
    I: IntoIterator<Item = FeatureName>,
{
    let names: BTreeSet<FeatureName> = names.into_iter().collect();
    let features: Vec<Rc<dyn Feature>> =
        names.iter().map(|name| name.create(Rc::clone(workspace))).collect();

    check_dependencies(&features)?;

    for feature in &features {
        debug!("Attaching feature '{}'.", feature.name());
        Rc::clone(feature).subscribe(dispatcher);
    }
    Ok(features)
}
