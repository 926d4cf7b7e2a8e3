//! Manifest data model.

use std::path::PathBuf;

use baseline_common::types::TestSpec;
use baseline_image::BuildChain;
use serde::{Deserialize, Serialize};

/// Contents of an `app.json` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Setup test whose successful run is committed as the checkpoint.
    pub committer: TestSpec,
    /// Tests run concurrently against the checkpoint.
    #[serde(rename = "testers", default)]
    pub tests: Vec<TestSpec>,
    /// Build steps in build order.
    pub builds: BuildChain,
}

/// A located, parsed, and validated application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    /// Application name (directory name under the apps directory).
    pub name: String,
    /// Application directory holding the manifest and build contexts.
    pub dir: PathBuf,
    /// Parsed manifest.
    pub manifest: AppManifest,
}

impl App {
    /// Tag of the final, fully built image.
    #[must_use]
    pub fn final_image(&self) -> String {
        format!("{}-{}", self.name, self.manifest.builds.last())
    }
}
