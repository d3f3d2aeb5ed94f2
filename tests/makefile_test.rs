use medikit::error::Error;
use medikit::feature::make::{AssignmentOperator, Makefile, Rule, TargetOptions};
use medikit::structs::Script;

#[test]
fn test_duplicate_target_leaves_makefile_unchanged() {
    let mut makefile = Makefile::new();
    makefile
        .add_target("test", "pytest tests", TargetOptions::new().phony().doc("Runs tests."))
        .unwrap();

    let result = makefile.add_target("test", "nosetests", TargetOptions::new().doc("Other."));

    assert!(matches!(result, Err(Error::DuplicateTarget { ref target }) if target == "test"));
    let target = makefile.target("test").unwrap();
    assert_eq!(target.rule, Rule::Script(Script::new("pytest tests")));
    assert_eq!(target.doc, "Runs tests.");
    assert_eq!(makefile.targets().count(), 1);
}

#[test]
fn test_unknown_target() {
    let mut makefile = Makefile::new();
    assert!(matches!(makefile.target("nope"), Err(Error::UnknownTarget { .. })));
    assert!(matches!(makefile.set_deps("nope", ["a"]), Err(Error::UnknownTarget { .. })));
}

#[test]
fn test_variables_order() {
    let mut makefile = Makefile::new();
    makefile.set("B", "2");
    makefile.set("C", "3");
    makefile.setleft("A", "1");
    makefile.updateleft([("X", "x"), ("Y", "y")]);
    makefile.set("B", "two");

    assert_eq!(makefile.keys().collect::<Vec<_>>(), ["X", "Y", "A", "B", "C"]);
    assert_eq!(makefile.get("B"), Some("two"));
}

#[test]
fn test_first_and_hidden_targets() {
    let mut makefile = Makefile::new();
    makefile.add_target("build", "cargo build", TargetOptions::new().phony()).unwrap();
    makefile.add_target("help", "@echo help", TargetOptions::new().first().phony()).unwrap();
    makefile.add_target("quick", "@printf \"\"", TargetOptions::new().hidden().phony()).unwrap();

    let names: Vec<&str> = makefile.targets().map(|(name, _)| name).collect();
    assert_eq!(names, ["help", "build", "quick"]);

    let content = makefile.to_string();
    assert!(content.contains(".PHONY: build help quick"));
    assert!(content.contains("quick:   #"));
    assert!(content.contains("build:   ##"));
}

#[test]
fn test_render() {
    let mut makefile = Makefile::new();
    makefile.set("PACKAGE", "acme");
    makefile.set("QUICK", "");
    makefile.set_assignment_operator("PACKAGE", AssignmentOperator::Simple);
    makefile.add_install_target(None).unwrap().install.push("$(PIP) install -e .".to_string());
    let options = TargetOptions::new().deps(["install-dev"]).phony().doc("Runs tests.");
    makefile.add_target("test", "$(PYTEST) tests", options).unwrap();

    let content = makefile.to_string();

    assert!(content.starts_with("# Generated by Medikit"));
    assert!(content.contains("PACKAGE := acme\nQUICK ?= \n"));
    assert!(content.contains("install: .medikit/install   ## Installs the project."));
    assert!(content.contains("\t$(PIP) install -e .\n\t@mkdir -p .medikit; touch $@\nendif"));
    assert!(content.contains("test: install-dev  ## Runs tests.\n\t$(PYTEST) tests\n"));
    assert!(content.contains("\trm -rf build dist *.egg-info .medikit/install\n"));

    // Rendering is deterministic.
    assert_eq!(content, makefile.to_string());
}

#[test]
fn test_multiline_variables() {
    let mut makefile = Makefile::new();
    makefile.set("FILES", "a\nb");

    assert!(makefile.to_string().contains("FILES ?= a \\\n         b\n"));
}

#[test]
fn test_scripts_are_amended_in_place() {
    let mut makefile = Makefile::new();
    makefile.add_target("release", "python setup.py sdist", TargetOptions::new().phony()).unwrap();
    makefile.add_install_target(None).unwrap();

    let script = makefile.script_mut("release").unwrap();
    script.append("twine upload dist/*");
    script.prepend("make clean");
    script.append("git push --tags");

    let content = makefile.to_string();
    assert!(content.contains(
        "release:   ##\n\tmake clean\n\tpython setup.py sdist\n\ttwine upload dist/*\n\
         \tgit push --tags\n"
    ));
    assert!(matches!(makefile.script_mut("install"), Err(Error::ConfigError(_))));
    assert!(matches!(makefile.script_mut("nope"), Err(Error::UnknownTarget { .. })));
}

#[test]
fn test_set_deps_replaces_deps() {
    let mut makefile = Makefile::new();
    let options = TargetOptions::new().deps(["install"]).doc("Runs tests.");
    makefile.add_target("test", "pytest", options).unwrap();

    makefile.set_deps("test", ["install-dev", "lint"]).unwrap();

    assert_eq!(makefile.target("test").unwrap().deps, ["install-dev", "lint"]);
    assert!(makefile.to_string().contains("\ntest: install-dev lint  ## Runs tests.\n\tpytest\n"));
}
