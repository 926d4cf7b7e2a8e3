//! Locating and reading application manifests.

use std::path::{Path, PathBuf};

use baseline_common::config::BaselineConfig;
use baseline_common::constants::APP_MANIFEST;
use baseline_common::error::{BaselineError, Result};

use crate::manifest::{App, AppManifest};
use crate::validator;

/// Finds the directory of application `name` under `apps_dir`.
///
/// # Errors
///
/// Returns `BaselineError::Io` if `apps_dir` cannot be read and
/// `BaselineError::NotFound` if no directory is named `name`.
pub fn locate(apps_dir: &Path, name: &str) -> Result<PathBuf> {
    let entries = std::fs::read_dir(apps_dir).map_err(|e| BaselineError::Io {
        path: apps_dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| BaselineError::Io {
            path: apps_dir.to_path_buf(),
            source: e,
        })?;
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        if is_dir && entry.file_name().to_str() == Some(name) {
            return Ok(entry.path());
        }
    }

    Err(BaselineError::NotFound {
        kind: "application",
        id: format!("{name} in {}", apps_dir.display()),
    })
}

/// Parses and validates manifest text.
///
/// # Errors
///
/// Returns `BaselineError::Serialization` for malformed JSON and
/// `BaselineError::Config` if validation fails.
pub fn parse_manifest(content: &str) -> Result<AppManifest> {
    let manifest: AppManifest = serde_json::from_str(content)?;
    validator::validate(&manifest)?;
    Ok(manifest)
}

/// Locates, reads, and validates application `name`.
///
/// # Errors
///
/// Returns an error if the application cannot be found, read, parsed, or
/// validated.
pub fn load(config: &BaselineConfig, name: &str) -> Result<App> {
    let dir = locate(&config.apps_dir, name)?;
    let path = dir.join(APP_MANIFEST);
    let content = std::fs::read_to_string(&path).map_err(|e| BaselineError::Io {
        path: path.clone(),
        source: e,
    })?;
    let manifest = parse_manifest(&content)?;
    tracing::info!(
        app = name,
        steps = manifest.builds.len(),
        tests = manifest.tests.len(),
        "loaded application manifest"
    );
    Ok(App {
        name: name.to_string(),
        dir,
        manifest,
    })
}
