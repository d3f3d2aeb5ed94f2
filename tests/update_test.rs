use std::fs;
use std::path::Path;
use std::rc::Rc;

use medikit::commands::{init, update, InitOptions, UpdateOptions};
use medikit::error::{Error, Result};
use medikit::feature::python::{requirement_name, RequirementsResolver};
use medikit::feature::FeatureName;
use medikit::file::FileMode;
use medikit::testing::{RecordingRunner, ScriptedPrompter};
use medikit::workspace::Workspace;
use tempfile::TempDir;

fn write_projectfile(root: &Path, content: &str) -> std::path::PathBuf {
    let path = root.join("Projectfile");
    fs::write(&path, content).unwrap();
    path
}

fn workspace(root: &Path, runner: &Rc<RecordingRunner>) -> Workspace {
    Workspace::new(root).unwrap().with_runner(runner.clone())
}

fn read(root: &Path, target: &str) -> String {
    fs::read_to_string(root.join(target)).unwrap_or_else(|e| panic!("cannot read {target}: {e}"))
}

#[test]
fn test_make_and_git_only() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(root, "variables:\n  PACKAGE: acme\n");
    let runner = Rc::new(RecordingRunner::new());

    let event = update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();

    let makefile = read(root, "Makefile");
    assert!(makefile.contains("\ninstall: .medikit/install"));
    assert!(makefile.contains("\ninstall-dev: .medikit/install-dev"));
    assert!(makefile.contains("\nclean:"));
    assert!(makefile.contains("\nhelp:"));
    assert!(makefile.contains("PACKAGE ?= acme"));
    assert!(read(root, ".gitignore").contains("/.medikit"));

    let commands = runner.commands();
    assert_eq!(
        &commands[..3],
        [
            "git init",
            "git add Projectfile",
            "git commit -m \"Project initialized using Medikit.\""
        ]
    );
    assert!(commands.contains(&"git add Makefile".to_string()));
    assert!(commands.contains(&"git add .gitignore".to_string()));

    let features: Vec<FeatureName> = event.config.keys().collect();
    assert_eq!(features, [FeatureName::Git, FeatureName::Make]);
}

#[test]
fn test_unmet_dependency_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(root, "features:\n  pytest: {}\n");
    let runner = Rc::new(RecordingRunner::new());

    let result = update(&projectfile, UpdateOptions::default(), workspace(root, &runner));

    assert!(matches!(
        result,
        Err(Error::UnmetDependency { feature: FeatureName::Pytest, requires: FeatureName::Python })
    ));
    let entries: Vec<_> = fs::read_dir(root).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert!(runner.commands().is_empty());
}

#[test]
fn test_unknown_feature() {
    let temp_dir = TempDir::new().unwrap();
    let projectfile = write_projectfile(temp_dir.path(), "features: [python, cobol]\n");
    let runner = Rc::new(RecordingRunner::new());

    let workspace = workspace(temp_dir.path(), &runner);

    let result = update(&projectfile, UpdateOptions::default(), workspace);

    assert!(matches!(result, Err(Error::UnknownFeature { ref name }) if name == "cobol"));
}

const PYTHON_PROJECT: &str = r#"
features:
  python:
    setup:
      name: acme.tools
      description: Tools for Acme.
    requirements:
      - requests >=2.20
      - acme.tools
    extras:
      dev: [pytest-mock]
  pytest: {}
  format:
    tools: [isort, yapf]
  git:
    enabled: false
"#;

#[test]
fn test_python_project() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(root, PYTHON_PROJECT);
    let runner = Rc::new(RecordingRunner::new());

    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();

    assert!(read(root, "acme/__init__.py").contains("declare_namespace"));
    assert!(!read(root, "acme/tools/__init__.py").contains("declare_namespace"));
    assert_eq!(read(root, "acme/tools/_version.py"), "__version__ = '0.0.0'\n");

    let setup = read(root, "setup.py");
    assert!(setup.starts_with("# Generated by Medikit"));
    assert!(setup.contains(r#"name="acme.tools","#));
    assert!(setup.contains(r#"namespace_packages=["acme"],"#));
    assert!(setup.contains("install_requires=["));

    assert_eq!(read(root, "requirements.txt"), "-e .\nrequests >=2.20\n");
    let dev = read(root, "requirements-dev.txt");
    assert!(dev.starts_with("-e .[dev]\n"));
    let requirements =
        ["coverage ~=4.5", "isort", "pytest ~=4.6", "pytest-cov ~=2.7", "pytest-mock", "yapf"];
    for requirement in requirements {
        assert!(dev.lines().any(|line| line == requirement), "missing {requirement} in {dev}");
    }

    let setup_cfg = read(root, "setup.cfg");
    assert!(setup_cfg.contains("[bdist_wheel]\nuniversal = 1\n"));
    assert!(setup_cfg.contains("[isort]\nline_length = 120\n"));
    assert!(setup_cfg.contains("description-file = README.rst"));
    assert!(read(root, ".style.yapf").contains("column_limit = 120"));
    assert!(root.join(".coveragerc").exists());
    assert!(root.join("tests/.gitkeep").exists());

    let makefile = read(root, "Makefile");
    assert!(makefile.contains("PACKAGE ?= acme.tools"));
    assert!(makefile.contains("\ntest: install-dev  ## Runs the test suite."));
    assert!(
        makefile.contains("\nformat: install-dev  ## Reformats the codebase (with isort, yapf).")
    );
    assert!(makefile.contains(".medikit/install: requirements.txt setup.py"));

    // Disabled git still gets its ignore file, but no command runs.
    assert!(root.join(".gitignore").exists());
    assert!(runner.commands().is_empty());
}

#[test]
fn test_requirements_are_kept_unless_overridden() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(root, "features:\n  python:\n    setup: { name: acme }\n");
    let runner = Rc::new(RecordingRunner::new());
    fs::write(root.join("requirements.txt"), "-e .\nfrozen ==1.0\n").unwrap();
    fs::write(root.join("setup.cfg"), "[metadata]\nauthor = Jane\n").unwrap();

    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();
    assert_eq!(read(root, "requirements.txt"), "-e .\nfrozen ==1.0\n");
    // Existing values are kept, and initial values are not applied to existing files.
    let setup_cfg = read(root, "setup.cfg");
    assert!(setup_cfg.contains("author = Jane"));
    assert!(!setup_cfg.contains("description-file"));

    let options = UpdateOptions { override_requirements: true };
    update(&projectfile, options, workspace(root, &runner)).unwrap();
    assert_eq!(read(root, "requirements.txt"), "-e .\n");
}

#[test]
fn test_null_mode_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile =
        write_projectfile(root, "features:\n  python:\n    setup: { name: acme }\n  docker: {}\n");
    let runner = Rc::new(RecordingRunner::new());
    let workspace = workspace(root, &runner).with_mode(FileMode::Null);

    update(&projectfile, UpdateOptions::default(), workspace).unwrap();

    let entries: Vec<_> = fs::read_dir(root).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_init_then_update() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("acme");
    let runner = Rc::new(RecordingRunner::new());
    let options = InitOptions { features: vec!["python".to_string()], ..InitOptions::default() };
    let prompter = ScriptedPrompter::new(["not-valid", "acme", "Acme things", ""]);

    let event =
        init(root.join("Projectfile"), &options, &prompter, workspace(&root, &runner)).unwrap();

    let projectfile = read(&root, "Projectfile");
    assert!(projectfile.contains("name: \"acme\""));
    assert!(projectfile.contains("description: \"Acme things\""));
    assert!(projectfile.contains("license: \"Apache License, Version 2.0\""));
    assert!(event.config.contains(FeatureName::Python));
    assert!(root.join("setup.py").exists());
    assert!(root.join("Makefile").exists());

    let result = init(root.join("Projectfile"), &options, &prompter, workspace(&root, &runner));
    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_init_rejects_invalid_name_option() {
    let temp_dir = TempDir::new().unwrap();
    let runner = Rc::new(RecordingRunner::new());
    let options = InitOptions { name: Some("acme-tools".to_string()), ..InitOptions::default() };

    let result = init(
        temp_dir.path().join("Projectfile"),
        &options,
        &ScriptedPrompter::default(),
        workspace(temp_dir.path(), &runner),
    );

    assert!(matches!(result, Err(Error::ValidationError(_))));
    assert!(!temp_dir.path().join("Projectfile").exists());
}

#[test]
fn test_python_without_package_name_writes_nothing() {
    let contents = [
        "features:\n  python: {}\n",
        "features:\n  python:\n    setup: { name: acme-tools }\n",
    ];
    for content in contents {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let projectfile = write_projectfile(root, content);
        let runner = Rc::new(RecordingRunner::new());

        let result = update(&projectfile, UpdateOptions::default(), workspace(root, &runner));

        assert!(matches!(result, Err(Error::ConfigError(_))), "{content}");
        let entries: Vec<_> = fs::read_dir(root).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(runner.commands().is_empty());
    }
}

/// Pins every requirement to a fixed version.
struct PinningResolver;

impl RequirementsResolver for PinningResolver {
    fn resolve(&self, constraints: &[String]) -> Result<Vec<String>> {
        constraints
            .iter()
            .map(|constraint| Ok(format!("{} ==1.0", requirement_name(constraint)?)))
            .collect()
    }
}

#[test]
fn test_requirements_use_the_workspace_resolver() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(
        root,
        "features:\n  python:\n    setup: { name: acme }\n    requirements: [requests >=2.20]\n",
    );
    let runner = Rc::new(RecordingRunner::new());
    let workspace = workspace(root, &runner).with_resolver(Rc::new(PinningResolver));

    update(&projectfile, UpdateOptions::default(), workspace).unwrap();

    assert_eq!(read(root, "requirements.txt"), "-e .\nrequests ==1.0\n");
}

#[test]
fn test_files_provide_version_and_classifiers() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(
        root,
        r#"
features:
  python:
    setup: { name: acme }
files:
  version: "1.2.0"
  classifiers: "Programming Language :: Python :: 3"
"#,
    );
    let runner = Rc::new(RecordingRunner::new());

    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();

    assert_eq!(read(root, "acme/_version.py"), "__version__ = '1.2.0'\n");
    assert!(read(root, "classifiers.txt").contains("Programming Language :: Python :: 3"));

    // An existing version.txt wins.
    fs::write(root.join("version.txt"), "2.0.0\n").unwrap();
    fs::remove_file(root.join("acme/_version.py")).unwrap();
    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();
    assert_eq!(read(root, "acme/_version.py"), "__version__ = '2.0.0'\n");
}

const FRONTEND_PROJECT: &str = r#"
features:
  python:
    setup: { name: acme, description: Acme things, license: MIT }
  sphinx:
    theme: sphinx_rtd_theme
  nodejs: {}
  webpack: {}
  git:
    enabled: false
"#;

#[test]
fn test_sphinx_and_nodejs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(root, FRONTEND_PROJECT);
    let runner = Rc::new(RecordingRunner::new());

    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();

    let makefile = read(root, "Makefile");
    assert!(makefile.contains("SPHINX_SOURCEDIR ?= docs"));
    assert!(makefile.contains("SPHINX_BUILDDIR ?= $(SPHINX_SOURCEDIR)/_build"));
    assert!(
        makefile.contains("\n$(SPHINX_SOURCEDIR): install-dev  ## Update sphinx documentation.")
    );
    assert!(makefile.contains("YARN ?= $(shell which yarn)"));
    assert!(makefile.contains("\t$(YARN) install --production\n\t$(YARN) --version\n"));
    assert!(makefile.contains("\t$(YARN) install\n"));

    let dev = read(root, "requirements-dev.txt");
    assert!(dev.lines().any(|line| line == "sphinx >=1.6,<2.0"), "{dev}");
    assert!(dev.lines().any(|line| line == "sphinx_rtd_theme"), "{dev}");

    let package: serde_json::Value = serde_json::from_str(&read(root, "package.json")).unwrap();
    assert_eq!(package["name"], "acme");
    assert_eq!(package["version"], "0.0.0");
    assert_eq!(package["license"], "MIT");
    assert!(package["author"].is_null());

    assert_eq!(runner.commands(), ["yarn install", "git add yarn.lock"]);
}

#[test]
fn test_webpack_requires_nodejs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile =
        write_projectfile(root, "features:\n  python:\n    setup: { name: acme }\n  webpack: {}\n");
    let runner = Rc::new(RecordingRunner::new());

    let result = update(&projectfile, UpdateOptions::default(), workspace(root, &runner));

    assert!(matches!(
        result,
        Err(Error::UnmetDependency { feature: FeatureName::Webpack, requires: FeatureName::Nodejs })
    ));
}

const KUBE_PROJECT: &str = r#"
features:
  python:
    setup: { name: acme }
  docker: {}
  kube:
    helm: true
    targets:
      - name: deployment/acme
        patch_path: spec.template.spec
        patch: { replicas: 2 }
      - name: deployment/acme
        variant: staging
        patch: { replicas: 1 }
  git:
    enabled: false
"#;

#[test]
fn test_kube_targets() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(root, KUBE_PROJECT);
    let runner = Rc::new(RecordingRunner::new());

    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();

    let makefile = read(root, "Makefile");
    assert!(makefile.contains("KUBE_NAMESPACE ?= default"));
    assert!(makefile.contains("HELM_RELEASE ?= acme"));
    assert!(makefile.contains("\nkube-rollout:"));
    assert!(makefile.contains("\nkube-rollback:"));
    assert!(makefile.contains("\nkube-rollout-staging:"));
    assert!(makefile.contains(concat!(
        "\t$(KUBECTL) $(KUBECTL_OPTIONS) --namespace=$(KUBE_NAMESPACE) patch deployment/acme ",
        r#"-p'{"spec":{"template":{"spec":{"replicas":2}}}}'"#,
    )));
    assert!(makefile.contains(r#"-p'{"replicas":1}'"#));
    assert!(makefile.contains("\t$(KUBECTL) rollout undo deployment/acme\n"));
}

#[test]
fn test_docker_rocker_builder() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let projectfile = write_projectfile(
        root,
        "features:\n  python:\n    setup: { name: acme }\n  docker:\n    builder: rocker\n",
    );
    let runner = Rc::new(RecordingRunner::new());

    update(&projectfile, UpdateOptions::default(), workspace(root, &runner)).unwrap();

    let makefile = read(root, "Makefile");
    assert!(makefile.contains(
        "## Build a docker image.\n\
         \t$(ROCKER_BUILD) $(ROCKER_BUILD_OPTIONS) $(ROCKER_BUILD_VARIABLES) .\n"
    ));
    assert!(!makefile.contains("\t$(DOCKER_PUSH)"));
    assert!(makefile.contains(
        "\tROCKER_BUILD_OPTIONS=\"$(ROCKER_BUILD_OPTIONS) --push\" $(MAKE) docker-build\n"
    ));
    assert!(root.join("Rockerfile").exists());
    assert!(!root.join("Dockerfile").exists());
}
