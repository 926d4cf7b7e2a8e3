//! # baseline-manifest
//!
//! Application manifests for the baseline pipeline.
//!
//! An application lives in `<apps_dir>/<app>/` and declares, in `app.json`:
//! - **builds**: the ordered build chain; each step has a build context
//!   directory next to the manifest.
//! - **committer**: the setup test whose successful container becomes the
//!   checkpoint image.
//! - **testers**: the tests run concurrently against the checkpoint.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod loader;
pub mod manifest;
pub mod validator;

pub use loader::{load, locate, parse_manifest};
pub use manifest::{App, AppManifest};
