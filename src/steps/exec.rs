use git2::Repository;
use log::info;

use crate::error::{Error, Result};
use crate::steps::{Meta, Step, StepContext, StepState};
use crate::utils::format_with;

/// Runs `make <target>`.
#[derive(Debug)]
pub struct Make {
    target: String,
    state: StepState,
}

impl Make {
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self { target: target.into(), state: StepState::default() }
    }
}

impl Step for Make {
    fn name(&self) -> &'static str {
        "Make"
    }

    fn args(&self) -> Vec<String> {
        vec![format!("{:?}", self.target)]
    }

    fn state(&self) -> &StepState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StepState {
        &mut self.state
    }

    fn run(&mut self, _meta: &mut Meta, ctx: &StepContext<'_>) -> Result<()> {
        ctx.system(&format!("make {}", self.target))?;
        self.set_complete(true);
        Ok(())
    }
}

/// Runs an arbitrary shell command. Interactive commands are attached to the terminal,
/// the others have their output captured and logged.
#[derive(Debug)]
pub struct System {
    command: String,
    interactive: bool,
    state: StepState,
}

impl System {
    pub fn new<S: Into<String>>(command: S, interactive: bool) -> Self {
        Self { command: command.into(), interactive, state: StepState::default() }
    }
}

impl Step for System {
    fn name(&self) -> &'static str {
        "System"
    }

    fn args(&self) -> Vec<String> {
        vec![format!("{:?}", self.command), format!("{:?}", self.interactive)]
    }

    fn state(&self) -> &StepState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StepState {
        &mut self.state
    }

    fn run(&mut self, _meta: &mut Meta, ctx: &StepContext<'_>) -> Result<()> {
        info!("$ {}", self.command);
        if self.interactive {
            ctx.system(&self.command)?;
        } else {
            for line in ctx.exec(&self.command)?.lines() {
                info!("\u{2502} {line}");
            }
        }
        self.set_complete(true);
        Ok(())
    }
}

/// Commits the release, optionally tags it, and pushes to the `origin` and `upstream`
/// remotes.
#[derive(Debug)]
pub struct Commit {
    message: String,
    tag: bool,
    state: StepState,
}

impl Commit {
    pub fn new<S: Into<String>>(message: S, tag: bool) -> Self {
        Self { message: message.into(), tag, state: StepState::default() }
    }
}

fn push_remotes(ctx: &StepContext<'_>) -> Result<Vec<String>> {
    let repo = Repository::open(ctx.root)?;
    let remotes = repo.remotes()?;
    Ok(remotes
        .iter()
        .flatten()
        .filter(|remote| matches!(*remote, "origin" | "upstream"))
        .map(str::to_string)
        .collect())
}

impl Step for Commit {
    fn name(&self) -> &'static str {
        "Commit"
    }

    fn args(&self) -> Vec<String> {
        vec![format!("{:?}", self.message), format!("{:?}", self.tag)]
    }

    fn state(&self) -> &StepState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StepState {
        &mut self.state
    }

    fn run(&mut self, meta: &mut Meta, ctx: &StepContext<'_>) -> Result<()> {
        let expected = meta.get("version").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let version = ctx.config.get_version(ctx.root)?;
        if version != expected {
            return Err(Error::ValidationError(format!(
                "version file contains {version:?} but the pipeline bumped to {expected:?}"
            )));
        }

        let branch = ctx.exec("git rev-parse --abbrev-ref HEAD")?;
        let message = serde_json::to_string(&format_with(&self.message, meta))?;
        ctx.system(&format!("git commit -m {message}"))?;
        if self.tag {
            ctx.system(&format!("git tag -am {version} {version}"))?;
        }

        for remote in push_remotes(ctx)? {
            info!("git push {remote} {branch}...");
            ctx.system(&format!("git push {remote} {branch} --tags"))?;
        }

        self.set_complete(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities() {
        assert_eq!(Make::new("clean install").identity(), r#"Make("clean install")"#);
        assert_eq!(
            System::new("git add -p .", true).identity(),
            r#"System("git add -p .", true)"#
        );
        assert_eq!(
            Commit::new("Release: {version}", true).identity(),
            r#"Commit("Release: {version}", true)"#
        );
    }
}
