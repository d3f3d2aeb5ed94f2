use std::path::Path;
use std::rc::Rc;

use log::{debug, info};

use crate::commands::project_root;
use crate::config::read_configuration;
use crate::error::Result;
use crate::events::{Dispatcher, ProjectEvent, ON_END, ON_START};
use crate::feature::python::PythonConfig;
use crate::feature::{load_features, LAST_PRIORITY};
use crate::file::WriteOptions;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Rewrite the requirements files even if they exist.
    pub override_requirements: bool,
}

/// `medikit update`: regenerates the project described by `config_filename`.
pub fn handle_update<P: AsRef<Path>>(config_filename: P, options: UpdateOptions) -> Result<()> {
    let workspace = Workspace::new(project_root(&config_filename))?;
    update(config_filename, options, workspace)?;
    Ok(())
}

/// Writes the merged shared resources (`setup.cfg`...) once every feature contributed.
fn flush_resources(
    workspace: &Workspace,
    dispatcher: &Dispatcher,
    event: &mut ProjectEvent,
) -> Result<()> {
    for (target, resource) in event.config.resources() {
        let existing = workspace.read_to_string(target)?;
        let content = resource.render(existing.as_deref())?;
        workspace.write(dispatcher, target, &content, WriteOptions::overwrite())?;
    }
    Ok(())
}

/// Runs a full generation in `workspace` and returns the final event, with the
/// configuration as every feature left it.
///
/// # Errors
/// * Any configuration error (unknown or incompatible features, missing python package
///   name), before a single file is written
/// * The first error raised by a feature listener
pub fn update<P: AsRef<Path>>(
    config_filename: P,
    options: UpdateOptions,
    workspace: Workspace,
) -> Result<ProjectEvent> {
    let configuration = read_configuration(config_filename)?;
    let workspace = Rc::new(workspace);
    let dispatcher = Dispatcher::new();

    let mut features = configuration.features.clone();
    features.sort();
    let names: Vec<&str> = features.iter().map(|feature| feature.as_str()).collect();
    match configuration.registry.package_name() {
        Ok(name) => info!("Updating {name} with {} features", names.join(", ")),
        Err(_) => info!("Updating project with {} features", names.join(", ")),
    }

    load_features(features, &workspace, &dispatcher)?;
    // Checked before any listener runs, so nothing is written or committed.
    if let Some(python) = configuration.registry.config::<PythonConfig>() {
        python.package_name()?;
    }

    let flush_workspace = Rc::clone(&workspace);
    dispatcher.add_listener(ON_END, LAST_PRIORITY, move |dispatcher, event: &mut ProjectEvent| {
        flush_resources(&flush_workspace, dispatcher, event)
    });

    let mut event = ProjectEvent::new(configuration.registry);
    event.variables = event.config.variables().clone();
    event.files = configuration.files;
    if options.override_requirements {
        if let Some(python) = event.config.config_mut::<PythonConfig>() {
            python.override_requirements = true;
        }
    }

    debug!("Listeners: {dispatcher:?}");
    dispatcher.dispatch(ON_START, &mut event)?;
    dispatcher.dispatch(ON_END, &mut event)?;

    info!("Done.");
    Ok(event)
}
