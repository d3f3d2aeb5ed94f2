//! Project workspace: root directory, built-in templates and external collaborators
//! (commands, requirements resolution).
//!
//! Features never touch the filesystem or spawn processes directly, they go through
//! the [`Workspace`] they were created with.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use minijinja::Environment;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::Dispatcher;
use crate::feature::python::{LooseResolver, RequirementsResolver};
use crate::file::{write_file, FileMode, WriteOptions};
use crate::process::{CommandRunner, SystemRunner};
use crate::utils::format_file_content;

/// Templates shipped with medikit, by name.
const TEMPLATES: &[(&str, &str)] = &[
    ("Projectfile.j2", include_str!("templates/Projectfile.j2")),
    ("python/setup.py.j2", include_str!("templates/python/setup.py.j2")),
    ("python/package_init.py.j2", include_str!("templates/python/package_init.py.j2")),
    ("pytest/coveragerc.j2", include_str!("templates/pytest/coveragerc.j2")),
    ("pytest/travis.yml.j2", include_str!("templates/pytest/travis.yml.j2")),
    ("yapf/style.yapf.j2", include_str!("templates/yapf/style.yapf.j2")),
];

/// The project being generated.
pub struct Workspace {
    root: PathBuf,
    mode: FileMode,
    templates: Environment<'static>,
    runner: Rc<dyn CommandRunner>,
    resolver: Rc<dyn RequirementsResolver>,
}

impl Workspace {
    /// Creates a workspace rooted at `root`, writing to disk and running real commands.
    ///
    /// # Errors
    /// * `Error::MinijinjaError` if a built-in template does not parse
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let mut templates = Environment::new();
        templates.set_keep_trailing_newline(true);
        for &(name, source) in TEMPLATES {
            templates.add_template(name, source).map_err(Error::MinijinjaError)?;
        }

        Ok(Self {
            root: root.into(),
            mode: FileMode::Disk,
            templates,
            runner: Rc::new(SystemRunner::new()),
            resolver: Rc::new(LooseResolver),
        })
    }

    pub fn with_runner(mut self, runner: Rc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_resolver(mut self, resolver: Rc<dyn RequirementsResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Absolute path of a project relative `target`.
    pub fn path<P: AsRef<Path>>(&self, target: P) -> PathBuf {
        self.root.join(target)
    }

    pub fn exists<P: AsRef<Path>>(&self, target: P) -> bool {
        self.path(target).exists()
    }

    /// Reads a project file, `None` if it does not exist.
    pub fn read_to_string<P: AsRef<Path>>(&self, target: P) -> Result<Option<String>> {
        let path = self.path(target);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(path).map(Some).map_err(Error::IoError)
    }

    pub fn create_dir_all<P: AsRef<Path>>(&self, target: P) -> Result<()> {
        if self.mode == FileMode::Null {
            return Ok(());
        }
        fs::create_dir_all(self.path(target)).map_err(Error::IoError)
    }

    /// Runs `command` in the project root and returns its output.
    pub fn exec(&self, command: &str) -> Result<String> {
        self.runner.exec(&self.root, command)
    }

    /// Turns loose requirements into the lines of a requirements file.
    pub fn resolve(&self, constraints: &[String]) -> Result<Vec<String>> {
        self.resolver.resolve(constraints)
    }

    /// Renders the built-in template `name`.
    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self.templates.get_template(name).map_err(Error::MinijinjaError)?;
        template.render(context).map_err(Error::MinijinjaError)
    }

    /// Renders an inline template string.
    pub fn render_str<S: Serialize>(&self, source: &str, context: S) -> Result<String> {
        self.templates.render_str(source, context).map_err(Error::MinijinjaError)
    }

    /// Writes `content` to `target`, honoring the overwrite semantics of [`write_file`].
    pub fn write<P: AsRef<Path>>(
        &self,
        dispatcher: &Dispatcher,
        target: P,
        content: &str,
        options: WriteOptions,
    ) -> Result<bool> {
        let target = target.as_ref();
        write_file(dispatcher, self.mode, &self.path(target), target, content, options)
    }

    /// Renders the built-in template `template` into `target`.
    pub fn render_file<P: AsRef<Path>, S: Serialize>(
        &self,
        dispatcher: &Dispatcher,
        target: P,
        template: &str,
        context: S,
        options: WriteOptions,
    ) -> Result<bool> {
        let target = target.as_ref();
        if !options.overwrite && self.exists(target) {
            return Ok(false);
        }
        let content = format_file_content(&self.render(template, context)?);
        self.write(dispatcher, target, &content, options)
    }

    /// Renders an inline template string into `target`.
    pub fn render_file_inline<P: AsRef<Path>, S: Serialize>(
        &self,
        dispatcher: &Dispatcher,
        target: P,
        source: &str,
        context: S,
        options: WriteOptions,
    ) -> Result<bool> {
        let target = target.as_ref();
        if !options.overwrite && self.exists(target) {
            return Ok(false);
        }
        let content = format_file_content(&self.render_str(source, context)?);
        self.write(dispatcher, target, &content, options)
    }

    /// Creates empty files (`.gitkeep` and friends).
    pub fn render_empty_files<P: AsRef<Path>>(
        &self,
        dispatcher: &Dispatcher,
        targets: &[P],
        options: WriteOptions,
    ) -> Result<()> {
        for target in targets {
            self.write(dispatcher, target, "", options)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
