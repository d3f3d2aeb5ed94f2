//! Adds docker capabilities to your package, using either `docker build` or
//! `rocker build` to create an image containing your code.
//!
//! Targets: `docker-build`, `docker-push`, `docker-run` and `docker-shell`.
//!
//! The image name defaults to the lowercased package name. Registry, user and name can
//! be overridden:
//!
//! ```yaml
//! features:
//!   docker:
//!     registry: eu.gcr.io
//!     user: sergey
//!     builder: rocker
//!     compose_file: config/docker/compose.yml
//! ```

use std::any::Any;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::Result;
use crate::events::{Dispatcher, ProjectEvent, ON_END};
use crate::feature::make::{which, MakefileEvent, TargetOptions, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::{parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig};
use crate::file::WriteOptions;
use crate::utils::format_file_content;
use crate::workspace::Workspace;

pub const DEFAULT_NAME: &str = "$(shell echo $(PACKAGE) | tr A-Z a-z)";

const DOCKERIGNORE: &str = "
    **/__pycache__
    *.egg-info
    .cache
    .git
    .idea
    /Dockerfile
    /Projectfile
    /Rockerfile
    node_modules
    static
";

const COMPOSE: &str = "
    version: '3'

    volumes:

    #   postgres_data: {}

    services:

    #   postgres:
    #     image: postgres:10
    #     ports:
    #       - 5432:5432
    #     volumes:
    #       - postgres_data:/var/lib/postgresql/data
";

const DOCKERFILE: &str = "
    FROM python:3
";

const ROCKERFILE: &str = "
    FROM python:3

    # Mount cache volume to keep cache persistent from one build to another
    MOUNT /app/.cache
    WORKDIR /app

    # Create application user
    RUN useradd --home-dir /app --group www-data app \\
     && pip install -U pip wheel virtualenv \\
     && mkdir /env \\
     && chown app:www-data -R /app /env

    # Add and install python requirements in a virtualenv
    USER app
    RUN virtualenv -p python3 /env/
    ADD setup.py *.txt /app/
    RUN /env/bin/pip install -r {{ .PYTHON_REQUIREMENTS_FILE }}

    # Add everything else
    USER root
    ADD . /app
    RUN chown app:www-data -R /app

    # Entrypoint
    USER app
    CMD /env/bin/gunicorn config.wsgi --bind 0.0.0.0:8000 --workers 4

    PUSH {{ .DOCKER_IMAGE }}:{{ .DOCKER_TAG }}
";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builder {
    #[default]
    Docker,
    Rocker,
}

fn default_compose_file() -> Option<String> {
    Some("docker-compose.yml".to_string())
}

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerConfig {
    pub builder: Builder,
    pub registry: Option<String>,
    pub user: Option<String>,
    #[serde(default = "default_name")]
    pub name: String,
    /// Defaults to `Dockerfile` or `Rockerfile`, depending on the builder.
    pub build_file: Option<String>,
    /// Set to null to skip the compose file.
    #[serde(default = "default_compose_file")]
    pub compose_file: Option<String>,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            builder: Builder::Docker,
            registry: None,
            user: None,
            name: default_name(),
            build_file: None,
            compose_file: default_compose_file(),
        }
    }
}

impl DockerConfig {
    pub fn use_rocker_builder(&mut self) {
        self.builder = Builder::Rocker;
    }

    pub fn set_remote(&mut self, registry: Option<&str>, user: Option<&str>, name: Option<&str>) {
        self.registry = registry.map(str::to_string);
        self.user = user.map(str::to_string);
        self.name = name.unwrap_or(DEFAULT_NAME).to_string();
    }

    pub fn build_file(&self) -> String {
        match (&self.build_file, self.builder) {
            (Some(file), _) => file.clone(),
            (None, Builder::Docker) => "Dockerfile".to_string(),
            (None, Builder::Rocker) => "Rockerfile".to_string(),
        }
    }

    /// Full image name: `registry/user/name`, skipping the unset parts.
    pub fn image(&self) -> String {
        [self.registry.as_deref(), self.user.as_deref(), Some(self.name.as_str())]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Makefile variables, in rendering order.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        let mut base = vec![
            ("DOCKER", which("docker", &[])),
            ("DOCKER_BUILD", "$(DOCKER) image build".to_string()),
            (
                "DOCKER_BUILD_OPTIONS",
                "--build-arg IMAGE=$(DOCKER_IMAGE) --build-arg TAG=$(DOCKER_TAG)".to_string(),
            ),
            ("DOCKER_PUSH", "$(DOCKER) image push".to_string()),
            ("DOCKER_PUSH_OPTIONS", String::new()),
            ("DOCKER_RUN", "$(DOCKER) run".to_string()),
            ("DOCKER_RUN_COMMAND", String::new()),
            ("DOCKER_RUN_OPTIONS", String::new()),
        ];
        base.sort_by_key(|(key, _)| *key);

        let mut variables = base;
        variables.extend([
            ("DOCKER_BUILD_FILE", self.build_file()),
            ("DOCKER_IMAGE", self.image()),
            ("DOCKER_TAG", "$(VERSION)".to_string()),
        ]);

        if self.builder == Builder::Rocker {
            variables.extend([
                ("ROCKER", which("rocker", &[])),
                ("ROCKER_BUILD", "$(ROCKER) build".to_string()),
                ("ROCKER_BUILD_OPTIONS", String::new()),
                (
                    "ROCKER_BUILD_VARIABLES",
                    "--var DOCKER_IMAGE=$(DOCKER_IMAGE) --var DOCKER_TAG=$(DOCKER_TAG) \
                     --var PYTHON_REQUIREMENTS_FILE=requirements-prod.txt"
                        .to_string(),
                ),
            ]);
        }
        variables
    }
}

impl FeatureConfig for DockerConfig {
    fn apply(&mut self, settings: serde_yaml::Value) -> Result<()> {
        *self = parse_settings(Self::FEATURE, settings)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedConfig for DockerConfig {
    const FEATURE: FeatureName = FeatureName::Docker;
}

pub struct DockerFeature {
    workspace: Rc<Workspace>,
}

impl DockerFeature {
    pub fn new(workspace: Rc<Workspace>) -> Self {
        Self { workspace }
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let config = event.config.require_config::<DockerConfig>().clone();
        let makefile = &mut event.makefile;

        for (key, value) in config.variables() {
            makefile.set(key, value);
        }

        makefile.add_target(
            "docker-build",
            "$(DOCKER_BUILD) -f $(DOCKER_BUILD_FILE) $(DOCKER_BUILD_OPTIONS) \
             -t $(DOCKER_IMAGE):$(DOCKER_TAG) .",
            TargetOptions::new().phony().doc("Build a docker image."),
        )?;
        makefile.add_target(
            "docker-push",
            "$(DOCKER_PUSH) $(DOCKER_PUSH_OPTIONS) $(DOCKER_IMAGE):$(DOCKER_TAG)",
            TargetOptions::new().phony().doc("Push docker image to remote registry."),
        )?;
        makefile.add_target(
            "docker-run",
            "$(DOCKER_RUN) $(DOCKER_RUN_OPTIONS) --interactive --tty --rm \
             --name=$(PACKAGE)_run -p 8000:8000 $(DOCKER_IMAGE):$(DOCKER_TAG) \
             $(DOCKER_RUN_COMMAND)",
            TargetOptions::new()
                .phony()
                .doc("Run the default entry point in a container based on our docker image."),
        )?;
        makefile.add_target(
            "docker-shell",
            "DOCKER_RUN_COMMAND=\"/bin/bash\" $(MAKE) docker-run",
            TargetOptions::new().phony().doc("Run bash in a container based on our docker image."),
        )?;

        // rocker builds and pushes in one go.
        if config.builder == Builder::Rocker {
            makefile
                .script_mut("docker-build")?
                .set("$(ROCKER_BUILD) $(ROCKER_BUILD_OPTIONS) $(ROCKER_BUILD_VARIABLES) .");
            makefile.script_mut("docker-push")?.set(
                "ROCKER_BUILD_OPTIONS=\"$(ROCKER_BUILD_OPTIONS) --push\" $(MAKE) docker-build",
            );
        }
        Ok(())
    }

    fn on_end(&self, dispatcher: &Dispatcher, event: &mut ProjectEvent) -> Result<()> {
        let config = event.config.require_config::<DockerConfig>().clone();
        let workspace = &self.workspace;
        let options = WriteOptions::default();

        workspace.write(dispatcher, ".dockerignore", &format_file_content(DOCKERIGNORE), options)?;

        if let Some(compose_file) = &config.compose_file {
            workspace.write(dispatcher, compose_file, &format_file_content(COMPOSE), options)?;
        }

        let build_file = match config.builder {
            Builder::Docker => DOCKERFILE,
            Builder::Rocker => ROCKERFILE,
        };
        let content = format_file_content(build_file);
        workspace.write(dispatcher, config.build_file(), &content, options)?;
        Ok(())
    }
}

impl Feature for DockerFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Docker
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher)
            .on(ON_MAKE_GENERATE, -1, Self::on_make_generate)
            .on(ON_END, 0, Self::on_end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_name() {
        let mut config = DockerConfig::default();
        assert_eq!(config.image(), DEFAULT_NAME);

        config.set_remote(Some("eu.gcr.io"), Some("sergey"), None);
        assert_eq!(config.image(), format!("eu.gcr.io/sergey/{DEFAULT_NAME}"));

        config.set_remote(None, None, Some("acme"));
        assert_eq!(config.image(), "acme");
        assert_eq!(config.build_file(), "Dockerfile");

        config.use_rocker_builder();
        assert_eq!(config.build_file(), "Rockerfile");
        let variables = config.variables();
        assert!(variables.iter().any(|(key, _)| *key == "ROCKER_BUILD"));
        assert!(variables.contains(&("DOCKER_IMAGE", "acme".to_string())));
        assert!(variables.contains(&("DOCKER_BUILD_FILE", "Rockerfile".to_string())));
        assert_eq!(variables.iter().filter(|(key, _)| *key == "DOCKER_IMAGE").count(), 1);
    }
}
