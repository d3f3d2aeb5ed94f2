use std::fs;
use std::sync::OnceLock;

use git2::Repository;
use log::{error, info};
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::steps::{Meta, Step, StepContext, StepState};

/// Asks for the next version and writes it to the version file.
#[derive(Debug, Default)]
pub struct BumpVersion {
    state: StepState,
}

impl BumpVersion {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Accepts `1`, `1.2`, `1.2.3`, with optional pre-release and local parts
/// (`1.0.0a1`, `1.0.0.dev3`, `1.0.0+build.5`).
pub fn parse_version(input: &str) -> Result<String> {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let re = VERSION.get_or_init(|| {
        Regex::new(concat!(
            r"^v?(\d+(?:\.\d+){0,2}",
            r"(?:(?:a|b|rc|\.dev|\.post)\d+)*",
            r"(?:\+[0-9A-Za-z.]+)?)$",
        ))
        .unwrap()
    });
    let input = input.trim();
    re.captures(input)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| Error::ValidationError(format!("{input:?} is not a valid version")))
}

fn fetch_tags(ctx: &StepContext<'_>) -> Result<()> {
    let repo = Repository::open(ctx.root)?;
    for remote in repo.remotes()?.iter().flatten() {
        info!("git fetch {remote}...");
        ctx.exec(&format!("git fetch {remote} --tags"))?;
    }
    Ok(())
}

impl Step for BumpVersion {
    fn name(&self) -> &'static str {
        "BumpVersion"
    }

    fn state(&self) -> &StepState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StepState {
        &mut self.state
    }

    fn run(&mut self, meta: &mut Meta, ctx: &StepContext<'_>) -> Result<()> {
        let version_file = ctx.config.get_version_file()?;
        let path = ctx.root.join(&version_file);
        if !path.exists() {
            return Err(Error::ConfigError(format!(
                "cannot find version file (searched in {version_file:?})"
            )));
        }

        fetch_tags(ctx)?;

        let git_version = ctx.exec("git describe --tags --abbrev=0").ok();
        let current_version = ctx.config.get_version(ctx.root)?;
        let described = git_version.as_deref().unwrap_or("none");
        info!("Current version: {current_version} Git version: {described}");

        let next_version = loop {
            let answer = ctx.prompter.input("Next version?", None)?;
            match parse_version(&answer) {
                Ok(version) => break version,
                Err(err) => error!("{err}"),
            }
        };

        let content = if version_file.ends_with(".py") {
            format!("__version__ = '{next_version}'\n")
        } else {
            next_version.clone()
        };
        fs::write(&path, content)?;

        ctx.exec(&format!("git add {version_file}"))?;

        meta.insert("version".to_string(), Value::String(next_version));
        self.set_complete(true);
        Ok(())
    }
}
