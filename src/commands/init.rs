use std::collections::BTreeSet;
use std::path::Path;

use log::{error, info};
use serde_json::json;

use crate::commands::update::{update, UpdateOptions};
use crate::constants::{CONFIG_FILE, DEFAULT_FEATURES, DEFAULT_LICENSE};
use crate::error::{Error, Result};
use crate::events::{Dispatcher, ProjectEvent};
use crate::feature::FeatureName;
use crate::file::WriteOptions;
use crate::prompt::{DialoguerPrompter, Prompter};
use crate::utils::is_identifier;
use crate::workspace::Workspace;

/// Values given on the command line; the missing ones are asked interactively.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub name: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    /// Features enabled on top of the default ones.
    pub features: Vec<String>,
}

/// `medikit init TARGET`: creates a Projectfile in `target` then generates the project.
pub fn handle_init<P: AsRef<Path>>(target: P, options: InitOptions) -> Result<()> {
    let target = target.as_ref();
    let workspace = Workspace::new(target)?;
    init(target.join(CONFIG_FILE), &options, &DialoguerPrompter::new(), workspace)?;
    Ok(())
}

fn ask_name(options: &InitOptions, prompter: &dyn Prompter) -> Result<String> {
    if let Some(name) = &options.name {
        if !is_identifier(name) {
            return Err(Error::ValidationError(format!("invalid package name {name:?}")));
        }
        info!("name = {name}");
        return Ok(name.clone());
    }

    loop {
        let name = prompter.input("Name", None)?;
        if is_identifier(&name) {
            return Ok(name);
        }
        error!("Invalid name. Please only use valid python identifiers.");
    }
}

/// Writes the Projectfile for a new project at `config_filename`, then runs [`update`].
///
/// # Errors
/// * `Error::ConfigError` if a Projectfile already exists
/// * `Error::UnknownFeature` if an option names an unknown feature
/// * `Error::ValidationError` if the name given as option is not an identifier
pub fn init<P: AsRef<Path>>(
    config_filename: P,
    options: &InitOptions,
    prompter: &dyn Prompter,
    workspace: Workspace,
) -> Result<ProjectEvent> {
    let config_filename = config_filename.as_ref();
    if config_filename.exists() {
        return Err(Error::ConfigError(format!(
            "no config should be present in the target directory to initialize (found {})",
            config_filename.display()
        )));
    }

    let mut features: BTreeSet<FeatureName> = DEFAULT_FEATURES.into_iter().collect();
    for name in &options.features {
        features.insert(name.parse()?);
    }

    let name = ask_name(options, prompter)?;
    let description = match &options.description {
        Some(description) => description.clone(),
        None => prompter.input("Description", Some(""))?,
    };
    let license = match &options.license {
        Some(license) => license.clone(),
        None => prompter.input("License", Some(DEFAULT_LICENSE))?,
    };

    let context = json!({
        "name": name,
        "description": description,
        "license": license,
        "url": "",
        "download_url": "",
        "author": "",
        "author_email": "",
        "features": features.iter().map(FeatureName::as_str).collect::<Vec<_>>(),
        "requirements": Vec::<String>::new(),
    });

    workspace.create_dir_all("")?;
    let target = config_filename.file_name().map(Path::new).unwrap_or(Path::new(CONFIG_FILE));
    let options = WriteOptions::overwrite();
    workspace.render_file(&Dispatcher::new(), target, "Projectfile.j2", context, options)?;

    update(config_filename, UpdateOptions::default(), workspace)
}
