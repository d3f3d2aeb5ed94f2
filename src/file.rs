//! Generated file writing.
//!
//! A file is only (re)written when it does not exist yet or when the caller asks to
//! overwrite it. Every write goes through the dispatcher: `on_file_opened` fires once
//! the file is open, `on_file_closed` once it is flushed and closed, so features can
//! react to generated files (the git feature stages them).

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::events::{Dispatcher, FileEvent, ON_FILE_CLOSED, ON_FILE_OPENED};

/// Where written content ends up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileMode {
    /// Files are written to disk.
    #[default]
    Disk,
    /// Content is discarded, events are still dispatched.
    Null,
}

/// Options for a single file write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace the file if it already exists.
    pub overwrite: bool,
    /// Mark the file as executable (unix only).
    pub executable: bool,
}

impl WriteOptions {
    pub fn overwrite() -> Self {
        Self { overwrite: true, executable: false }
    }

    pub fn executable(mut self) -> Self {
        self.executable = true;
        self
    }
}

fn open_sink(mode: FileMode, path: &Path) -> Result<Box<dyn Write>> {
    match mode {
        FileMode::Disk => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(Error::IoError)?;
            }
            Ok(Box::new(fs::File::create(path).map_err(Error::IoError)?))
        }
        FileMode::Null => Ok(Box::new(io::sink())),
    }
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions).map_err(Error::IoError)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Writes `content` to `path` (whose project relative name is `target`).
///
/// # Returns
/// * `Result<bool>` - `false` if the file existed and was left untouched
pub fn write_file(
    dispatcher: &Dispatcher,
    mode: FileMode,
    path: &Path,
    target: &Path,
    content: &str,
    options: WriteOptions,
) -> Result<bool> {
    if !options.overwrite && path.exists() {
        debug!("Keeping existing file '{}'.", target.display());
        return Ok(false);
    }

    let mut event = FileEvent::new(target, options.overwrite);
    {
        let mut sink = open_sink(mode, path)?;
        dispatcher.dispatch(ON_FILE_OPENED, &mut event)?;
        sink.write_all(content.as_bytes()).map_err(Error::IoError)?;
        sink.flush().map_err(Error::IoError)?;
    }

    if options.executable && mode == FileMode::Disk {
        set_executable(path)?;
    }

    info!(
        "{} {} ({} bytes)",
        if options.overwrite { "W!" } else { "W?" },
        target.display(),
        content.len()
    );

    dispatcher.dispatch(ON_FILE_CLOSED, &mut event)?;
    Ok(true)
}
