use std::fs;

use medikit::config::defaults::RELEASE_PIPELINE;
use medikit::config::{parse_document, read_configuration, Configuration, Projectfile};
use medikit::error::Error;
use medikit::feature::git::GitConfig;
use medikit::feature::kube::KubeConfig;
use medikit::feature::sphinx::SphinxConfig;
use medikit::feature::FeatureName;
use tempfile::TempDir;

const RELEASE_STEPS: [&str; 6] = [
    "Install()",
    "BumpVersion()",
    r#"Make("update-requirements")"#,
    r#"Make("clean install")"#,
    r#"System("git add -p .", true)"#,
    r#"Commit("Release: {version}", true)"#,
];

fn configuration(content: &str) -> Result<Configuration, Error> {
    Configuration::from_projectfile(parse_document::<Projectfile>(content)?)
}

#[test]
fn test_json_and_yaml_are_equivalent() {
    let from_json = configuration(concat!(
        r#"{"variables": {"PACKAGE": "acme"}, "#,
        r#""features": {"python": {"setup": {"name": "acme"}}}}"#,
    ))
    .unwrap();
    let from_yaml = configuration(
        "variables:\n  PACKAGE: acme\nfeatures:\n  python:\n    setup:\n      name: acme\n",
    )
    .unwrap();

    assert_eq!(from_json.features, from_yaml.features);
    assert_eq!(from_json.registry.get_var("PACKAGE"), Some("acme"));
    assert_eq!(from_yaml.registry.get_var("PACKAGE"), Some("acme"));
    assert_eq!(from_json.registry.package_name().unwrap(), "acme");
}

#[test]
fn test_default_features_are_enabled() {
    let config = configuration("{}").unwrap();
    assert_eq!(config.features, [FeatureName::Git, FeatureName::Make]);

    let config = configuration("features: [pytest, python]\n").unwrap();
    assert_eq!(
        config.features,
        [FeatureName::Git, FeatureName::Make, FeatureName::Pytest, FeatureName::Python]
    );
}

#[test]
fn test_feature_settings() {
    let config = configuration("features:\n  git:\n    enabled: false\n").unwrap();
    assert!(!config.registry.get::<GitConfig>().unwrap().enabled);

    let result = configuration("features:\n  git:\n    enable: false\n");
    assert!(matches!(result, Err(Error::ConfigError(ref message)) if message.contains("git")));
}

#[test]
fn test_invalid_document() {
    assert!(matches!(configuration("features: [python"), Err(Error::ConfigError(_))));
    assert!(matches!(configuration("plugins: [python]\n"), Err(Error::ConfigError(_))));
}

#[test]
fn test_default_release_pipeline() {
    let config = configuration("{}").unwrap();
    let release = &config.registry.pipelines()[RELEASE_PIPELINE];
    assert_eq!(release.identities(), RELEASE_STEPS);
}

#[test]
fn test_pipeline_declarations() {
    let config = configuration(
        r#"
pipelines:
  release:
    remove: ['Install()', 'System("git add -p .", true)']
    steps:
      - { type: make, target: docs, before: 'Commit("Release: {version}", true)' }
      - { type: system, command: twine upload dist/* }
  docs:
    steps:
      - { type: make, target: docs }
"#,
    )
    .unwrap();

    let pipelines = config.registry.pipelines();
    assert_eq!(
        pipelines[RELEASE_PIPELINE].identities(),
        [
            "BumpVersion()",
            r#"Make("update-requirements")"#,
            r#"Make("clean install")"#,
            r#"Make("docs")"#,
            r#"Commit("Release: {version}", true)"#,
            r#"System("twine upload dist/*", false)"#,
        ]
    );
    assert_eq!(pipelines["docs"].identities(), [r#"Make("docs")"#]);
}

#[test]
fn test_pipeline_declaration_with_unknown_step() {
    let result = configuration("pipelines:\n  release:\n    remove: ['Make(\"docs\")']\n");
    assert!(matches!(result, Err(Error::PipelineError(_))));

    let result = configuration(
        "pipelines:\n  release:\n    steps:\n      - { type: install, before: 'Nope()' }\n",
    );
    assert!(matches!(result, Err(Error::PipelineError(_))));
}

#[test]
fn test_read_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Projectfile");

    assert!(matches!(read_configuration(&path), Err(Error::IoError(_))));

    fs::write(&path, "features:\n  docker: {}\nfiles:\n  README.md: '# acme'\n").unwrap();
    let config = read_configuration(&path).unwrap();
    assert!(config.features.contains(&FeatureName::Docker));
    assert_eq!(config.files["README.md"], "# acme");
}

#[test]
fn test_kube_targets_are_unique_per_variant() {
    let config = configuration(
        r#"
features:
  kube:
    targets:
      - { name: deployment/acme, patch: {} }
      - { name: deployment/acme, variant: staging, patch: {} }
"#,
    )
    .unwrap();
    let kube = config.registry.get::<KubeConfig>().unwrap();
    assert_eq!(kube.variants().collect::<Vec<_>>(), [None, Some("staging")]);

    let result = configuration(
        r#"
features:
  kube:
    targets:
      - { name: deployment/acme, patch: {} }
      - { name: deployment/acme, patch: {} }
"#,
    );
    assert!(matches!(
        result,
        Err(Error::ConfigError(ref message)) if message.contains("deployment/acme")
    ));
}

#[test]
fn test_sphinx_theme_must_be_a_requirement() {
    let config = configuration("features:\n  sphinx:\n    theme: sphinx_rtd_theme\n").unwrap();
    let sphinx = config.registry.get::<SphinxConfig>().unwrap();
    assert_eq!(sphinx.theme.as_deref(), Some("sphinx_rtd_theme"));

    let result = configuration("features:\n  sphinx:\n    theme: '>=1.0'\n");
    assert!(matches!(result, Err(Error::ConfigError(_))));
}
