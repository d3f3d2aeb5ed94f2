//! Make targets to rollout and rollback the project as a deployment onto a kubernetes cluster.
//!
//! ```yaml
//! kube:
//!   helm: true
//!   targets:
//!     - name: deployment/acme
//!       variant: staging
//!       patch_path: spec.template.spec
//!       patch: { containers: [{ name: acme, image: "$(DOCKER_IMAGE):$(DOCKER_TAG)" }] }
//! ```

use std::any::Any;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::events::Dispatcher;
use crate::feature::make::{which, MakefileEvent, TargetOptions, ON_GENERATE as ON_MAKE_GENERATE};
use crate::feature::{parse_settings, Feature, FeatureConfig, FeatureName, Subscriber, TypedConfig};
use crate::workspace::Workspace;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct KubeSettings {
    helm: bool,
    targets: Vec<KubeTargetSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KubeTargetSettings {
    name: String,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    patch_path: String,
    patch: Value,
}

/// A kubernetes object to patch on rollout.
#[derive(Debug, Clone, PartialEq)]
pub struct KubePatch {
    /// Dotted path under which `patch` is nested.
    pub path: String,
    pub patch: Value,
}

impl KubePatch {
    /// The patch, wrapped in one object per `path` segment.
    pub fn nested(&self) -> Value {
        self.path
            .split('.')
            .filter(|bit| !bit.is_empty())
            .rev()
            .fold(self.patch.clone(), |patch, bit| {
                let mut wrapper = serde_json::Map::new();
                wrapper.insert(bit.to_string(), patch);
                Value::Object(wrapper)
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct KubeConfig {
    pub use_helm: bool,
    targets: IndexMap<Option<String>, IndexMap<String, KubePatch>>,
}

impl KubeConfig {
    /// Registers `name` (`deployment/acme`...) to be patched by the rollout of `variant`.
    ///
    /// # Errors
    /// * `Error::ConfigError` if the target is already defined for this variant
    pub fn add_target(
        &mut self,
        name: &str,
        variant: Option<&str>,
        patch: KubePatch,
    ) -> Result<()> {
        let targets = self.targets.entry(variant.map(str::to_string)).or_default();
        if targets.contains_key(name) {
            return Err(Error::ConfigError(format!("kubernetes target {name} already defined")));
        }
        targets.insert(name.to_string(), patch);
        Ok(())
    }

    pub fn variants(&self) -> impl Iterator<Item = Option<&str>> {
        self.targets.keys().map(Option::as_deref)
    }

    pub fn targets(&self, variant: Option<&str>) -> impl Iterator<Item = (&str, &KubePatch)> {
        self.targets
            .get(&variant.map(str::to_string))
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(name, patch)| (name.as_str(), patch)))
    }
}

impl FeatureConfig for KubeConfig {
    fn apply(&mut self, settings: serde_yaml::Value) -> Result<()> {
        let settings: KubeSettings = parse_settings(Self::FEATURE, settings)?;
        let mut config = KubeConfig { use_helm: settings.helm, ..Default::default() };
        for target in settings.targets {
            let patch = KubePatch { path: target.patch_path, patch: target.patch };
            config.add_target(&target.name, target.variant.as_deref(), patch)?;
        }
        *self = config;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl TypedConfig for KubeConfig {
    const FEATURE: FeatureName = FeatureName::Kube;
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn target_name(prefix: &str, variant: Option<&str>) -> String {
    match variant {
        Some(variant) => format!("{prefix}-{variant}"),
        None => prefix.to_string(),
    }
}

pub struct KubeFeature;

impl KubeFeature {
    pub fn new(_workspace: Rc<Workspace>) -> Self {
        Self
    }

    fn on_make_generate(&self, _dispatcher: &Dispatcher, event: &mut MakefileEvent) -> Result<()> {
        let kube = event.config.require_config::<KubeConfig>().clone();
        let release = if kube.use_helm { Some(event.package_name()?.to_string()) } else { None };
        let makefile = &mut event.makefile;

        makefile.set("KUBECTL", which("kubectl", &[]));
        makefile.set("KUBECTL_OPTIONS", "");
        makefile.set("KUBECONFIG", "");
        makefile.set("KUBE_NAMESPACE", "default");

        if let Some(release) = release {
            makefile.set("HELM", which("helm", &[]));
            makefile.set("HELM_RELEASE", release);
        }

        for variant in kube.variants() {
            let mut rollout = Vec::new();
            let mut rollback = Vec::new();
            for (target, patch) in kube.targets(variant) {
                let patch = serde_json::to_string(&patch.nested())?;
                rollout.push(format!(
                    "$(KUBECTL) $(KUBECTL_OPTIONS) --namespace=$(KUBE_NAMESPACE) \
                     patch {target} -p{}",
                    shell_quote(&patch)
                ));
                rollback.push(format!("$(KUBECTL) rollout undo {target}"));
            }
            if rollout.is_empty() {
                continue;
            }

            makefile.add_target(
                &target_name("kube-rollout", variant),
                rollout.join("\n"),
                TargetOptions::new().phony().doc("Rollout docker image onto kubernetes cluster."),
            )?;
            makefile.add_target(
                &target_name("kube-rollback", variant),
                rollback.join("\n"),
                TargetOptions::new().phony().doc("Rollbacks last kubernetes patch operation."),
            )?;
        }
        Ok(())
    }
}

impl Feature for KubeFeature {
    fn name(&self) -> FeatureName {
        FeatureName::Kube
    }

    fn requires(&self) -> &'static [FeatureName] {
        &[FeatureName::Docker]
    }

    fn subscribe(self: Rc<Self>, dispatcher: &Dispatcher) {
        Subscriber::new(self, dispatcher).on(ON_MAKE_GENERATE, -1, Self::on_make_generate);
    }
}
