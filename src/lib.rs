//! medikit generates and maintains project boilerplate (Makefile, setup.py, requirements,
//! CI and docker files) from a declarative Projectfile, and runs resumable step by step
//! pipelines such as releases.

/// Command-line interface module for the medikit application
pub mod cli;

/// Handlers of the `init`, `update` and `pipeline` commands
pub mod commands;

/// Projectfile loading and the configuration registry
pub mod config;

pub mod constants;

/// Error types and handling for the medikit application
pub mod error;

/// Typed events and the priority ordered dispatcher
pub mod events;

/// Feature plugins (make, git, python, pytest, pylint, sphinx, format, docker, kube, nodejs...)
pub mod feature;

pub mod file;

pub mod logger;

/// Pipelines and their persisted state
pub mod pipeline;

/// External command execution
pub mod process;

/// User input and interaction handling
pub mod prompt;

/// Shared files merged from several features (`setup.cfg`)
pub mod resources;

pub mod steps;

pub mod structs;

/// Test doubles for commands and prompts
pub mod testing;

pub mod utils;

pub mod workspace;
