use std::fs;

use medikit::config::registry::ConfigurationRegistry;
use medikit::error::Error;
use medikit::feature::python::PythonConfig;
use medikit::feature::{FeatureConfig, FeatureName};
use medikit::resources::ConfigParserResource;
use medikit::steps::Make;
use tempfile::TempDir;

fn address(config: &mut dyn FeatureConfig) -> *const () {
    config as *mut dyn FeatureConfig as *const ()
}

#[test]
fn test_require_is_idempotent() {
    let mut registry = ConfigurationRegistry::new();

    let first = address(registry.require("python").unwrap());
    registry.require_config::<PythonConfig>().setup("name", "acme");
    let second = address(registry.require("python").unwrap());

    assert_eq!(first, second);
    assert_eq!(registry.get::<PythonConfig>().unwrap().name(), Some("acme"));
    assert_eq!(registry.keys().collect::<Vec<_>>(), [FeatureName::Python]);
}

#[test]
fn test_unknown_feature_creates_nothing() {
    let mut registry = ConfigurationRegistry::new();
    registry.require("make").unwrap();

    let result = registry.require("cobol");

    assert!(matches!(result, Err(Error::UnknownFeature { ref name }) if name == "cobol"));
    assert_eq!(registry.keys().collect::<Vec<_>>(), [FeatureName::Make]);
}

#[test]
fn test_require_all_stops_at_unknown_feature() {
    let mut registry = ConfigurationRegistry::new();

    assert!(registry.require_all(&["git", "nope", "docker"]).is_err());

    assert!(registry.contains(FeatureName::Git));
    assert!(!registry.contains(FeatureName::Docker));
}

#[test]
fn test_pipeline_is_get_or_create() {
    let mut registry = ConfigurationRegistry::new();
    registry.pipeline("deploy").add(Make::new("deploy"));
    registry.pipeline("deploy").add(Make::new("notify"));

    assert_eq!(registry.pipelines().len(), 1);
    assert_eq!(
        registry.pipelines()["deploy"].identities(),
        [r#"Make("deploy")"#, r#"Make("notify")"#]
    );
}

#[test]
fn test_package_name() {
    let mut registry = ConfigurationRegistry::new();
    assert!(matches!(registry.package_name(), Err(Error::ConfigError(_))));

    registry.set_var("PACKAGE", "tool");
    assert_eq!(registry.package_name().unwrap(), "tool");

    // The python setup name wins as soon as python is required.
    registry.require_config::<PythonConfig>().setup("name", "acme.tool");
    assert_eq!(registry.package_name().unwrap(), "acme.tool");
}

#[test]
fn test_version_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = ConfigurationRegistry::new();
    assert!(registry.get_version_file().is_err());

    registry.require("python").unwrap();
    fs::write(temp_dir.path().join("version.txt"), "1.2.3\n").unwrap();
    assert_eq!(registry.get_version_file().unwrap(), "version.txt");
    assert_eq!(registry.get_version(temp_dir.path()).unwrap(), "1.2.3");

    // The python config is asked before the variable.
    registry.set_var("VERSION_FILE", "acme/_version.py");
    assert_eq!(registry.get_version_file().unwrap(), "version.txt");

    let mut registry = ConfigurationRegistry::new();
    registry.set_var("VERSION_FILE", "acme/_version.py");
    fs::create_dir(temp_dir.path().join("acme")).unwrap();
    fs::write(temp_dir.path().join("acme/_version.py"), "__version__ = '0.4.0'\n").unwrap();
    assert_eq!(registry.get_version_file().unwrap(), "acme/_version.py");
    assert_eq!(registry.get_version(temp_dir.path()).unwrap(), "0.4.0");
}

#[test]
fn test_resources() {
    let mut registry = ConfigurationRegistry::new();
    registry.define_resource("setup.cfg", ConfigParserResource::new()).unwrap();

    assert!(matches!(
        registry.define_resource("setup.cfg", ConfigParserResource::new()),
        Err(Error::ResourceRedefined { .. })
    ));
    assert!(matches!(
        registry.get_resource::<ConfigParserResource>("tox.ini"),
        Err(Error::UnknownResource { .. })
    ));

    registry
        .get_resource::<ConfigParserResource>("setup.cfg")
        .unwrap()
        .set_managed_values([("isort", vec![("line_length", "120")])]);
    let (target, resource) = registry.resources().next().unwrap();
    assert_eq!(target, "setup.cfg");
    assert!(resource.render(None).unwrap().contains("line_length = 120"));
}
