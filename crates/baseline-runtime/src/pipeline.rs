//! High-level pipeline commands for one application.
//!
//! [`Pipeline`] ties a loaded application to an engine and exposes the four
//! user-facing operations: `init`, `fix`, `flush`, and `test`.

use std::sync::Arc;

use baseline_common::config::BaselineConfig;
use baseline_common::error::{BaselineError, Result};
use baseline_common::types::RunStamp;
use baseline_engine::ContainerEngine;
use baseline_image::{BuildChain, ImageBuilder};
use baseline_manifest::App;
use baseline_manifest::validator::validate_app_name;

use crate::commit::CommitStep;
use crate::context::RunContext;
use crate::orchestrator::{RunOutcome, TestOrchestrator};

/// Coordinates builds and test runs for one application.
pub struct Pipeline {
    engine: Arc<dyn ContainerEngine>,
    config: BaselineConfig,
    app: App,
    builder: ImageBuilder,
}

impl Pipeline {
    /// Creates a pipeline for a loaded application.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::Config` if the application name cannot be
    /// used in image tags.
    pub fn new(engine: Arc<dyn ContainerEngine>, config: BaselineConfig, app: App) -> Result<Self> {
        validate_app_name(&app.name)?;
        let builder = ImageBuilder::new(Arc::clone(&engine), app.name.clone(), &config);
        Ok(Self {
            engine,
            config,
            app,
            builder,
        })
    }

    /// The application this pipeline drives.
    #[must_use]
    pub const fn app(&self) -> &App {
        &self.app
    }

    /// Removes every image of the chain, then rebuilds it from the first
    /// step.
    ///
    /// Running `init` twice leaves the same final tag in place.
    ///
    /// # Errors
    ///
    /// Returns the first removal or build failure.
    pub async fn init(&self) -> Result<()> {
        let chain = &self.app.manifest.builds;
        tracing::info!(app = %self.app.name, steps = chain.len(), "initializing build chain");
        self.builder.flush_chain(chain).await?;
        self.builder.build_chain(chain).await?;
        tracing::info!(image = %self.app.final_image(), "build chain ready");
        Ok(())
    }

    /// Builds only the steps whose image is missing.
    ///
    /// Returns the number of steps built.
    ///
    /// # Errors
    ///
    /// Returns the first existence-check or build failure.
    pub async fn fix(&self) -> Result<usize> {
        let built = self.builder.build_missing(&self.app.manifest.builds).await?;
        tracing::info!(app = %self.app.name, built, "missing images rebuilt");
        Ok(built)
    }

    /// Removes the images of the chain from step `from` onwards, or only
    /// the final step's image when `from` is `None`.
    ///
    /// Returns the steps whose images were targeted.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::NotFound` if `from` is not a step of the
    /// chain, or the first removal failure.
    pub async fn flush(&self, from: Option<&str>) -> Result<BuildChain> {
        let chain = match from {
            Some(step) => self.app.manifest.builds.get(step)?,
            None => self.app.manifest.builds.final_step(),
        };
        tracing::info!(app = %self.app.name, from = %chain.head(), steps = chain.len(), "flushing images");
        self.builder.flush_chain(&chain).await?;
        Ok(chain)
    }

    /// Runs the committer and then every tester against the checkpoint.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::test_with_stamp`].
    pub async fn test(&self) -> Result<RunOutcome> {
        self.test_with_stamp(RunStamp::now()).await
    }

    /// Runs the committer and testers using a caller-chosen run stamp.
    ///
    /// The final image must already exist; nothing is built implicitly.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::MissingCheckpoint` if the final image is
    /// absent, `BaselineError::CommitFailed` if the committer exits
    /// non-zero, or any engine failure of the commit step. Tester failures
    /// are reported inside the returned [`RunOutcome`].
    pub async fn test_with_stamp(&self, stamp: RunStamp) -> Result<RunOutcome> {
        let final_step = self.app.manifest.builds.last();
        let image = self.builder.tag(final_step);
        if !self.builder.image_exists(&image).await? {
            return Err(BaselineError::MissingCheckpoint { image });
        }

        let ctx = Arc::new(RunContext::with_stamp(
            Arc::clone(&self.engine),
            &self.app.name,
            final_step,
            &self.config,
            stamp,
        )?);
        let _ = CommitStep::new(&ctx).run(&self.app.manifest.committer).await?;
        TestOrchestrator::new(ctx).run(&self.app.manifest.tests).await
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("app", &self.app.name)
            .field("config", &self.config)
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use baseline_common::types::TestSpec;
    use baseline_engine::fake::{Call, FakeEngine, Script};
    use baseline_manifest::AppManifest;

    fn app(testers: &[&str]) -> App {
        App {
            name: "shop".to_string(),
            dir: "apps/shop".into(),
            manifest: AppManifest {
                committer: TestSpec::new("setup", ["./migrate.sh"]),
                tests: testers.iter().map(|n| TestSpec::new(*n, ["run"])).collect(),
                builds: BuildChain::new(["os", "deps", "app"]).unwrap(),
            },
        }
    }

    fn pipeline(engine: &Arc<FakeEngine>, root: &Path, testers: &[&str]) -> Pipeline {
        let config = BaselineConfig {
            log_dir: root.to_path_buf(),
            inspect_frequency_ms: 1,
            ..BaselineConfig::default()
        };
        let engine: Arc<dyn ContainerEngine> = engine.clone();
        Pipeline::new(engine, config, app(testers)).unwrap()
    }

    fn builds(engine: &FakeEngine) -> Vec<String> {
        engine
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Build { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn init_flushes_then_builds_in_order() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new().with_image("shop-deps"));
        pipeline(&engine, root.path(), &[]).init().await.unwrap();

        assert_eq!(builds(&engine), vec!["shop-os", "shop-deps", "shop-app"]);
        assert_eq!(engine.count(|c| matches!(c, Call::RemoveImage(_))), 1);
    }

    #[tokio::test]
    async fn fix_builds_only_missing_steps() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new().with_image("shop-os").with_image("shop-app"));
        let built = pipeline(&engine, root.path(), &[]).fix().await.unwrap();
        assert_eq!(built, 1);
        assert_eq!(builds(&engine), vec!["shop-deps"]);
    }

    #[tokio::test]
    async fn flush_from_step_keeps_earlier_images() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            FakeEngine::new()
                .with_image("shop-os")
                .with_image("shop-deps")
                .with_image("shop-app"),
        );
        let chain = pipeline(&engine, root.path(), &[])
            .flush(Some("deps"))
            .await
            .unwrap();
        assert_eq!(chain.head(), "deps");
        assert!(engine.has_image("shop-os"));
        assert!(!engine.has_image("shop-deps"));
        assert!(!engine.has_image("shop-app"));
    }

    #[tokio::test]
    async fn flush_without_step_removes_only_final_image() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            FakeEngine::new()
                .with_image("shop-os")
                .with_image("shop-deps")
                .with_image("shop-app"),
        );
        let chain = pipeline(&engine, root.path(), &[]).flush(None).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert!(engine.has_image("shop-deps"));
        assert!(!engine.has_image("shop-app"));
    }

    #[tokio::test]
    async fn flush_unknown_step_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new());
        let err = pipeline(&engine, root.path(), &[])
            .flush(Some("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BaselineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_without_final_image_is_missing_checkpoint() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new().with_image("shop-os"));
        let err = pipeline(&engine, root.path(), &["unit"]).test().await.unwrap_err();
        assert!(matches!(err, BaselineError::MissingCheckpoint { ref image } if image == "shop-app"));
        assert!(engine.container_names().is_empty());
        assert!(builds(&engine).is_empty());
    }

    #[tokio::test]
    async fn test_commits_before_testers_run() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(FakeEngine::new().with_image("shop-app"));
        let outcome = pipeline(&engine, root.path(), &["unit", "lint"])
            .test_with_stamp(RunStamp::new("r1"))
            .await
            .unwrap();
        assert!(outcome.is_success());

        let calls = engine.calls();
        let commit = calls
            .iter()
            .position(|c| matches!(c, Call::Commit { .. }))
            .unwrap();
        let first_tester = calls
            .iter()
            .position(|c| matches!(c, Call::Create { name, .. } if name != "setup-r1"))
            .unwrap();
        assert!(commit < first_tester);
        assert_eq!(
            engine.container_names(),
            vec!["lint-r1", "setup-r1", "unit-r1"]
        );
    }

    #[tokio::test]
    async fn failing_committer_runs_no_testers() {
        let root = tempfile::tempdir().unwrap();
        let engine = Arc::new(
            FakeEngine::new()
                .with_image("shop-app")
                .with_script("setup", Script::exits(1)),
        );
        let err = pipeline(&engine, root.path(), &["unit"])
            .test_with_stamp(RunStamp::new("r1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BaselineError::CommitFailed { .. }));
        assert_eq!(engine.container_names(), vec!["setup-r1"]);
    }

    #[test]
    fn uppercase_app_name_is_rejected() {
        let mut bad = app(&[]);
        bad.name = "Shop".to_string();
        let engine: Arc<dyn ContainerEngine> = Arc::new(FakeEngine::new());
        assert!(Pipeline::new(engine, BaselineConfig::default(), bad).is_err());
    }
}
