//! In-memory model of a GNU Makefile.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::structs::Script;
use crate::utils::{dedent, get_override_warning_banner};

/// Variable assignment flavours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// `?=`
    #[default]
    Default,
    /// `=`
    Recursive,
    /// `+=`
    Append,
    /// `:=`
    Simple,
    /// `::=`
    PosixSimple,
    /// `!=`
    Shell,
}

impl AssignmentOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentOperator::Default => "?=",
            AssignmentOperator::Recursive => "=",
            AssignmentOperator::Append => "+=",
            AssignmentOperator::Simple => ":=",
            AssignmentOperator::PosixSimple => "::=",
            AssignmentOperator::Shell => "!=",
        }
    }
}

impl std::str::FromStr for AssignmentOperator {
    type Err = Error;

    fn from_str(op: &str) -> Result<Self> {
        match op {
            "?=" => Ok(AssignmentOperator::Default),
            "=" => Ok(AssignmentOperator::Recursive),
            "+=" => Ok(AssignmentOperator::Append),
            ":=" => Ok(AssignmentOperator::Simple),
            "::=" => Ok(AssignmentOperator::PosixSimple),
            "!=" => Ok(AssignmentOperator::Shell),
            _ => Err(Error::ConfigError(format!("invalid make assignment operator '{op}'"))),
        }
    }
}

/// Install recipe, guarded by a marker file under `.medikit/` and bypassed when
/// `QUICK` is set or the `quick` goal is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallScript {
    pub before_install: Vec<String>,
    pub install: Vec<String>,
    pub after_install: Vec<String>,
    /// Prerequisites of the marker file (requirement files...).
    pub deps: Vec<String>,
}

impl InstallScript {
    fn lines(&self) -> impl Iterator<Item = &String> {
        self.before_install.iter().chain(&self.install).chain(&self.after_install)
    }

    fn render(&self, name: &str, deps: &[String], doc: &str, out: &mut Vec<String>) {
        let marker_deps: BTreeSet<&str> = self.deps.iter().map(String::as_str).collect();
        out.push(format!("{name}: .medikit/{name} {}  ## {doc}", deps.join(" ")));
        out.push(format!(
            ".medikit/{name}: {}",
            marker_deps.into_iter().collect::<Vec<_>>().join(" ")
        ));
        out.push("\t$(eval target := $(shell echo $@ | rev | cut -d/ -f1 | rev))".to_string());
        out.push("ifeq ($(filter quick,$(MAKECMDGOALS)),quick)".to_string());
        out.push(
            concat!(
                r#"	@printf "Skipping \033[36m%s\033[0m "#,
                r#"because of \033[36mquick\033[0m target.\n" $(target)"#,
            )
            .to_string(),
        );
        out.push("else ifneq ($(QUICK),)".to_string());
        out.push(
            concat!(
                r#"	@printf "Skipping \033[36m%s\033[0m "#,
                r#"because \033[36m$$QUICK\033[0m is not empty.\n" $(target)"#,
            )
            .to_string(),
        );
        out.push("else".to_string());
        out.push(r#"	@printf "Applying \033[36m%s\033[0m target...\n" $(target)"#.to_string());
        for line in self.lines() {
            out.push(format!("\t{line}"));
        }
        out.push("\t@mkdir -p .medikit; touch $@".to_string());
        out.push("endif".to_string());
    }
}

/// Removes build artifacts and install markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanScript {
    pub remove: Vec<String>,
}

impl Default for CleanScript {
    fn default() -> Self {
        Self { remove: vec!["build".into(), "dist".into(), "*.egg-info".into()] }
    }
}

impl CleanScript {
    fn lines(&self) -> Vec<String> {
        vec![
            format!("rm -rf {}", self.remove.join(" ")),
            "find . -name __pycache__ -type d | xargs rm -rf".to_string(),
        ]
    }
}

/// Body of a make target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Script(Script),
    Install(InstallScript),
    Clean(CleanScript),
}

impl From<Script> for Rule {
    fn from(script: Script) -> Self {
        Rule::Script(script)
    }
}

impl From<&str> for Rule {
    fn from(script: &str) -> Self {
        Rule::Script(Script::new(script))
    }
}

impl From<String> for Rule {
    fn from(script: String) -> Self {
        Rule::Script(Script::new(&script))
    }
}

impl From<InstallScript> for Rule {
    fn from(script: InstallScript) -> Self {
        Rule::Install(script)
    }
}

impl From<CleanScript> for Rule {
    fn from(script: CleanScript) -> Self {
        Rule::Clean(script)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakefileTarget {
    pub deps: Vec<String>,
    pub rule: Rule,
    pub doc: String,
}

/// Options of [`Makefile::add_target`].
#[derive(Debug, Clone, Default)]
pub struct TargetOptions {
    pub deps: Vec<String>,
    pub phony: bool,
    pub first: bool,
    pub doc: Option<String>,
    pub hidden: bool,
}

impl TargetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn phony(mut self) -> Self {
        self.phony = true;
        self
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn doc<S: Into<String>>(mut self, doc: S) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Makefile under construction: variables, targets and their flags.
#[derive(Debug, Clone, Default)]
pub struct Makefile {
    env: IndexMap<String, String>,
    operators: IndexMap<String, AssignmentOperator>,
    targets: IndexMap<String, MakefileTarget>,
    pub phony: BTreeSet<String>,
    pub hidden: BTreeSet<String>,
}

impl Makefile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, keeping its position if it already exists.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.env.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.env.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.operators.shift_remove(key);
        self.env.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.env.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.env.len()
    }

    pub fn is_empty(&self) -> bool {
        self.env.is_empty()
    }

    pub fn set_assignment_operator(&mut self, key: &str, operator: AssignmentOperator) {
        self.operators.insert(key.to_string(), operator);
    }

    /// Sets a variable and moves it to the front.
    pub fn setleft<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        self.env.shift_remove(&key);
        self.env.shift_insert(0, key, value.into());
    }

    /// Moves `pairs` to the front of the variables, in the given order.
    pub fn updateleft<K, V, I>(&mut self, pairs: I)
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        I::IntoIter: DoubleEndedIterator,
    {
        for (key, value) in pairs.into_iter().rev() {
            self.setleft(key, value);
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = (&str, &MakefileTarget)> {
        self.targets.iter().map(|(name, target)| (name.as_str(), target))
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.targets.contains_key(target)
    }

    /// Adds a target.
    ///
    /// # Errors
    /// * `Error::DuplicateTarget` if `name` is already defined (the makefile is left unchanged)
    pub fn add_target<R: Into<Rule>>(
        &mut self,
        name: &str,
        rule: R,
        options: TargetOptions,
    ) -> Result<()> {
        if self.targets.contains_key(name) {
            return Err(Error::DuplicateTarget { target: name.to_string() });
        }

        let target = MakefileTarget {
            deps: options.deps,
            rule: rule.into(),
            doc: options.doc.map(|doc| dedent(&doc).trim().to_string()).unwrap_or_default(),
        };

        if options.first {
            self.targets.shift_insert(0, name.to_string(), target);
        } else {
            self.targets.insert(name.to_string(), target);
        }

        if options.phony {
            self.phony.insert(name.to_string());
        }
        if options.hidden {
            self.hidden.insert(name.to_string());
        }
        Ok(())
    }

    pub fn target(&self, name: &str) -> Result<&MakefileTarget> {
        self.targets.get(name).ok_or_else(|| Error::UnknownTarget { target: name.to_string() })
    }

    pub fn target_mut(&mut self, name: &str) -> Result<&mut MakefileTarget> {
        self.targets
            .get_mut(name)
            .ok_or_else(|| Error::UnknownTarget { target: name.to_string() })
    }

    pub fn set_deps<I, S>(&mut self, name: &str, deps: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_mut(name)?.deps = deps.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Script body of a plain target.
    pub fn script_mut(&mut self, name: &str) -> Result<&mut Script> {
        match &mut self.target_mut(name)?.rule {
            Rule::Script(script) => Ok(script),
            _ => Err(Error::ConfigError(format!("make target '{name}' is not a script target"))),
        }
    }

    pub fn install_script_mut(&mut self, name: &str) -> Result<&mut InstallScript> {
        match &mut self.target_mut(name)?.rule {
            Rule::Install(script) => Ok(script),
            _ => Err(Error::ConfigError(format!("make target '{name}' is not an install target"))),
        }
    }

    /// The `clean` target, created on first use.
    pub fn clean_script_mut(&mut self) -> Result<&mut CleanScript> {
        if !self.has_target("clean") {
            self.add_target(
                "clean",
                CleanScript::default(),
                TargetOptions::new().phony().doc("Cleans up the working copy."),
            )?;
        }
        match &mut self.target_mut("clean")?.rule {
            Rule::Clean(script) => Ok(script),
            _ => Err(Error::ConfigError("make target 'clean' is not a clean target".to_string())),
        }
    }

    /// Adds `install` (or `install-<extra>`) and registers its marker for cleanup.
    pub fn add_install_target(&mut self, extra: Option<&str>) -> Result<&mut InstallScript> {
        let (target, doc) = match extra {
            Some(extra) => (
                format!("install-{extra}"),
                format!("Installs the project (with {extra} dependencies)."),
            ),
            None => ("install".to_string(), "Installs the project.".to_string()),
        };

        if !self.has_target(&target) {
            let options = TargetOptions::new().phony().doc(doc);
            self.add_target(&target, InstallScript::default(), options)?;
        }

        let marker = format!(".medikit/{target}");
        let clean = self.clean_script_mut()?;
        if !clean.remove.contains(&marker) {
            clean.remove.push(marker);
        }

        self.install_script_mut(&target)
    }
}

/// Make expression resolving the first available command, falling back to the first name.
pub fn which(cmd: &str, more: &[&str]) -> String {
    let candidates: Vec<String> = std::iter::once(cmd)
        .chain(more.iter().copied())
        .map(|c| format!("which {c}"))
        .chain(std::iter::once(format!("echo {cmd}")))
        .collect();
    format!("$(shell {})", candidates.join(" || "))
}

impl fmt::Display for Makefile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut content = vec![get_override_warning_banner(), String::new()];

        if !self.env.is_empty() {
            for (key, value) in &self.env {
                let value = dedent(value);
                let indent = " ".repeat(key.len() + 4);
                let value = value.trim().replace('\n', &format!(" \\\n{indent}"));
                let operator = self.operators.get(key).copied().unwrap_or_default();
                content.push(format!("{key} {} {value}", operator.as_str()));
            }
            content.push(String::new());
        }

        if !self.phony.is_empty() {
            let phony: Vec<&str> = self.phony.iter().map(String::as_str).collect();
            content.push(format!(".PHONY: {}", phony.join(" ")));
            content.push(String::new());
        }

        for (name, target) in &self.targets {
            match &target.rule {
                Rule::Install(script) => {
                    script.render(name, &target.deps, &target.doc, &mut content)
                }
                rule => {
                    let marker = if self.hidden.contains(name) { "#" } else { "##" };
                    let deps = target.deps.join(" ");
                    let doc = target.doc.replace('\n', " ");
                    content.push(format!("{name}: {deps}  {marker} {doc}").trim().to_string());
                    let lines = match rule {
                        Rule::Clean(script) => script.lines(),
                        Rule::Script(script) => script.lines().to_vec(),
                        Rule::Install(_) => Vec::new(),
                    };
                    if lines.is_empty() {
                        content.push("\t".to_string());
                    }
                    for line in lines {
                        content.push(format!("\t{line}"));
                    }
                }
            }
            content.push(String::new());
        }

        f.write_str(&content.join("\n"))
    }
}
