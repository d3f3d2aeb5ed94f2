//! Command handlers behind the `medikit` subcommands.
//! Every handler takes the Projectfile path and its own options, so it can be driven
//! from tests as well as from the command line.

mod init;
mod pipeline;
mod update;

use std::path::{Path, PathBuf};

pub use init::{handle_init, init, InitOptions};
pub use pipeline::{handle_pipeline, Action, PipelineOptions, PipelineRunner};
pub use update::{handle_update, update, UpdateOptions};

/// Directory holding the Projectfile, which is the root of the generated project.
pub fn project_root<P: AsRef<Path>>(config_filename: P) -> PathBuf {
    match config_filename.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
