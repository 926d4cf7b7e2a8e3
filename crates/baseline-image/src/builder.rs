//! Sequential image builds for an application's chain.
//!
//! Every step's image is tagged `{app}-{step}` and built from the context
//! directory `{apps_dir}/{app}/{step}`, so tags are stable across runs.

use std::path::PathBuf;
use std::sync::Arc;

use baseline_common::config::BaselineConfig;
use baseline_common::error::{BaselineError, Result};
use baseline_engine::{BuildRequest, ContainerEngine, OutputSink};

use crate::chain::BuildChain;
use crate::registry;

/// Drives image builds and removals for one application.
#[derive(Clone)]
pub struct ImageBuilder {
    engine: Arc<dyn ContainerEngine>,
    app: String,
    app_dir: PathBuf,
    no_cache: bool,
    quiet: bool,
}

impl ImageBuilder {
    /// Creates a builder for `app` using the given configuration.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, app: impl Into<String>, config: &BaselineConfig) -> Self {
        let app = app.into();
        Self {
            engine,
            app_dir: config.app_dir(&app),
            app,
            no_cache: config.no_cache,
            quiet: config.quiet,
        }
    }

    /// Image tag for a build step.
    #[must_use]
    pub fn tag(&self, step: &str) -> String {
        format!("{}-{step}", self.app)
    }

    /// Build context directory for a build step.
    #[must_use]
    pub fn context_dir(&self, step: &str) -> PathBuf {
        self.app_dir.join(step)
    }

    /// Builds the image for one step.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::BuildFailed` wrapping any engine failure.
    pub async fn build(&self, step: &str) -> Result<()> {
        let request = BuildRequest {
            name: self.tag(step),
            context_dir: self.context_dir(step),
            no_cache: self.no_cache,
            output: if self.quiet {
                OutputSink::Discard
            } else {
                OutputSink::Inherit
            },
        };
        tracing::info!(
            image = %request.name,
            context = %request.context_dir.display(),
            no_cache = request.no_cache,
            "building image"
        );
        self.engine
            .build_image(&request)
            .await
            .map_err(|e| BaselineError::BuildFailed {
                image: request.name.clone(),
                message: e.to_string(),
            })?;
        tracing::info!(image = %request.name, "image built");
        Ok(())
    }

    /// Returns whether an image with the given tag exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot list images.
    pub async fn image_exists(&self, tag: &str) -> Result<bool> {
        registry::image_exists(self.engine.as_ref(), tag).await
    }

    /// Removes the image with the given tag, if present.
    ///
    /// Removing a missing image is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check fails or the engine refuses
    /// to delete an existing image.
    pub async fn remove(&self, tag: &str) -> Result<()> {
        if !self.image_exists(tag).await? {
            tracing::debug!(image = tag, "image absent, nothing to remove");
            return Ok(());
        }
        self.engine.remove_image(tag).await?;
        tracing::info!(image = tag, "image removed");
        Ok(())
    }

    /// Builds every step of `chain` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first step's `BuildFailed`; later steps are not attempted.
    pub async fn build_chain(&self, chain: &BuildChain) -> Result<()> {
        for step in chain.iter() {
            self.build(step).await?;
        }
        Ok(())
    }

    /// Removes the image of every step of `chain`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first removal failure.
    pub async fn flush_chain(&self, chain: &BuildChain) -> Result<()> {
        for step in chain.iter() {
            self.remove(&self.tag(step)).await?;
        }
        Ok(())
    }

    /// Builds only the steps of `chain` whose image is missing, in order.
    ///
    /// Returns the number of steps built.
    ///
    /// # Errors
    ///
    /// Returns the first existence-check or build failure.
    pub async fn build_missing(&self, chain: &BuildChain) -> Result<usize> {
        let mut built = 0;
        for step in chain.iter() {
            if self.image_exists(&self.tag(step)).await? {
                tracing::debug!(step, "image present, skipping");
                continue;
            }
            self.build(step).await?;
            built += 1;
        }
        Ok(built)
    }

    /// Application name.
    #[must_use]
    pub fn app(&self) -> &str {
        &self.app
    }
}

impl std::fmt::Debug for ImageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBuilder")
            .field("app", &self.app)
            .field("app_dir", &self.app_dir)
            .field("no_cache", &self.no_cache)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}
