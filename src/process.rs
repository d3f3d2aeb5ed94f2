//! External command execution.
//! Every call to git, make, pip or docker goes through a [`CommandRunner`], so the
//! generation and pipeline code can be exercised without touching the system.

use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;

use crate::error::{Error, Result};

/// Runs shell command lines in a given working directory.
pub trait CommandRunner {
    /// Runs `command` and returns its trimmed standard output.
    ///
    /// # Errors
    /// * `Error::CommandError` if the command exits with a non-zero status
    fn exec(&self, cwd: &Path, command: &str) -> Result<String>;

    /// Runs `command` attached to the current terminal.
    ///
    /// # Errors
    /// * `Error::CommandError` if the command exits with a non-zero status
    fn system(&self, cwd: &Path, command: &str) -> Result<()>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn command(cwd: &Path, command: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(cwd);
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn exec(&self, cwd: &Path, command: &str) -> Result<String> {
        debug!("$ {command}");
        let output = Self::command(cwd, command)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(Error::IoError)?;

        if !output.status.success() {
            return Err(Error::CommandError {
                command: command.to_string(),
                status: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn system(&self, cwd: &Path, command: &str) -> Result<()> {
        debug!("$ {command}");
        let status = Self::command(cwd, command)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(Error::IoError)?;

        if !status.success() {
            return Err(Error::CommandError {
                command: command.to_string(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}
