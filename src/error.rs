//! Error handling for medikit.
//! Defines the error type and result alias used throughout the application.

use std::io;
use thiserror::Error;

use crate::feature::FeatureName;

/// Errors that can happen while loading a Projectfile, generating a project or
/// running a pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents JSON (de)serialization failures
    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    /// Represents YAML deserialization failures
    #[error("YAML error: {0}.")]
    YamlError(#[from] serde_yaml::Error),

    /// Represents errors raised by the template engine
    #[error("Template error: {0}.")]
    MinijinjaError(#[from] minijinja::Error),

    /// Represents errors raised by libgit2
    #[error("Git error: {0}.")]
    Git2Error(#[from] git2::Error),

    /// Represents errors in the project description or derived settings
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error("Unknown feature '{name}'.")]
    UnknownFeature { name: String },

    #[error("Unmet dependency: {feature} requires {requires}.")]
    UnmetDependency { feature: FeatureName, requires: FeatureName },

    #[error("Conflicting dependency: {conflicts} conflicts with {feature}.")]
    ConflictingDependency { feature: FeatureName, conflicts: FeatureName },

    #[error("Duplicate definition for make target '{target}'.")]
    DuplicateTarget { target: String },

    #[error("Undefined make target '{target}'.")]
    UnknownTarget { target: String },

    #[error("Resource '{target}' is already defined.")]
    ResourceRedefined { target: String },

    #[error("Resource '{target}' is not defined.")]
    UnknownResource { target: String },

    /// Represents invalid pipeline names or definitions
    #[error("Pipeline error: {0}.")]
    PipelineError(String),

    /// Represents a state file that does not match the configured pipeline
    #[error("Invalid pipeline state: {0}.")]
    PipelineStateError(String),

    #[error(
        "Pipeline '{name}' already started, use `medikit pipeline {name} start --force` \
         to force a restart, or use `medikit pipeline {name} continue`."
    )]
    PipelineAlreadyStarted { name: String },

    #[error(
        "Pipeline '{name}' not started, hence you cannot continue it. \
         Are you looking for `medikit pipeline {name} start`?"
    )]
    PipelineNotStarted { name: String },

    /// Represents an external command that exited with a non-zero status
    #[error("\"{command}\" exited with status {status}.")]
    CommandError { command: String, status: String },

    /// Represents failures while interacting with the user
    #[error("Prompt error: {0}.")]
    PromptError(String),

    /// Represents validation failures in user input or data
    #[error("Validation error: {0}.")]
    ValidationError(String),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to report
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
