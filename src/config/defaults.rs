use crate::config::registry::ConfigurationRegistry;
use crate::steps::{BumpVersion, Commit, Install, Make, System};

/// Name of the pipeline every project gets.
pub const RELEASE_PIPELINE: &str = "release";

/// Registers the built-in pipelines. Projectfile declarations are applied on top.
pub fn setup_default_pipelines(config: &mut ConfigurationRegistry) {
    config
        .pipeline(RELEASE_PIPELINE)
        .add(Install::new())
        .add(BumpVersion::new())
        .add(Make::new("update-requirements"))
        .add(Make::new("clean install"))
        .add(System::new("git add -p .", true))
        .add(Commit::new("Release: {version}", true));
}
