//! Common constants used throughout medikit.

use crate::feature::FeatureName;

/// Default project description file name.
pub const CONFIG_FILE: &str = "Projectfile";

/// Directory holding pipeline state files, relative to the project root.
pub const PIPELINES_DIR: &str = ".medikit/pipelines";

/// Features every project gets, whatever the Projectfile says.
pub const DEFAULT_FEATURES: [FeatureName; 2] = [FeatureName::Git, FeatureName::Make];

/// License proposed by `medikit init`.
pub const DEFAULT_LICENSE: &str = "Apache License, Version 2.0";
