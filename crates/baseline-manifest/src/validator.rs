//! Static validation of a parsed manifest.
//!
//! Catches manifest mistakes before any engine call is made.

use std::collections::HashSet;

use baseline_common::error::{BaselineError, Result};
use baseline_common::types::TestSpec;

use crate::manifest::AppManifest;

/// Validates a parsed manifest for semantic correctness.
///
/// # Checks performed
///
/// 1. Build step names are valid image name components.
/// 2. Every test (committer included) has a valid name and a command.
/// 3. Test names are unique, since they name containers and log files.
///
/// Repeated build steps are tolerated and only logged.
///
/// # Errors
///
/// Returns `BaselineError::Config` if any check fails.
pub fn validate(manifest: &AppManifest) -> Result<()> {
    check_build_steps(manifest)?;
    check_tests(manifest)?;
    check_duplicate_tests(manifest)?;
    Ok(())
}

/// Validates an application name for use in image tags.
///
/// # Errors
///
/// Returns `BaselineError::Config` if the name is not a valid image name
/// component.
pub fn validate_app_name(name: &str) -> Result<()> {
    if is_image_component(name) {
        Ok(())
    } else {
        Err(BaselineError::config(format!(
            "application name \"{name}\" must be lowercase alphanumerics separated by '.', '_' or '-'"
        )))
    }
}

fn check_build_steps(manifest: &AppManifest) -> Result<()> {
    for step in manifest.builds.iter() {
        if !is_image_component(step) {
            return Err(BaselineError::config(format!(
                "build step \"{step}\" must be lowercase alphanumerics separated by '.', '_' or '-'"
            )));
        }
    }
    for step in manifest.builds.duplicates() {
        tracing::warn!(step, "build step listed more than once");
    }
    Ok(())
}

fn check_tests(manifest: &AppManifest) -> Result<()> {
    std::iter::once(&manifest.committer)
        .chain(&manifest.tests)
        .try_for_each(check_test)
}

fn check_test(test: &TestSpec) -> Result<()> {
    if !is_container_name(&test.name) {
        return Err(BaselineError::config(format!(
            "test name \"{}\" must start with an alphanumeric and contain only [a-zA-Z0-9_.-]",
            test.name
        )));
    }
    if test.cmd.is_empty() {
        return Err(BaselineError::config(format!(
            "test \"{}\" has an empty command",
            test.name
        )));
    }
    Ok(())
}

fn check_duplicate_tests(manifest: &AppManifest) -> Result<()> {
    let mut seen = HashSet::new();
    for test in std::iter::once(&manifest.committer).chain(&manifest.tests) {
        if !seen.insert(test.name.as_str()) {
            return Err(BaselineError::config(format!(
                "duplicate test name: \"{}\"",
                test.name
            )));
        }
    }
    Ok(())
}

fn is_container_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_image_component(name: &str) -> bool {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'));
    let alnum_edges = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    valid_chars && alnum_edges
}
