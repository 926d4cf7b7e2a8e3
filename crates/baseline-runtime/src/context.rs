//! Shared state of one `test` invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use baseline_common::config::BaselineConfig;
use baseline_common::error::{BaselineError, Result};
use baseline_common::types::{RunStamp, TestSpec};
use baseline_engine::{ContainerEngine, ContainerSpec};

use crate::container::RuntimeTest;
use crate::logs::RunLogs;
use crate::poll::{Cancellation, PollOutcome, Poller};

/// Everything a worker needs to run a test container.
///
/// Built once per run and shared read-only between the committer and all
/// tester workers.
pub struct RunContext {
    engine: Arc<dyn ContainerEngine>,
    app: String,
    build: String,
    stamp: RunStamp,
    logs: RunLogs,
    poller: Poller,
    timeout_ms: Option<u64>,
    volume: Option<PathBuf>,
}

impl RunContext {
    /// Creates a context for testing `{app}-{build}` with a fresh stamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the run's log directory cannot be created.
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        app: &str,
        build: &str,
        config: &BaselineConfig,
    ) -> Result<Self> {
        Self::with_stamp(engine, app, build, config, RunStamp::now())
    }

    /// Creates a context with a caller-chosen stamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the run's log directory cannot be created.
    pub fn with_stamp(
        engine: Arc<dyn ContainerEngine>,
        app: &str,
        build: &str,
        config: &BaselineConfig,
        stamp: RunStamp,
    ) -> Result<Self> {
        let logs = RunLogs::create(config.log_dir(), app, &stamp)?;
        let ctx = Self {
            engine,
            app: app.to_string(),
            build: build.to_string(),
            stamp,
            logs,
            poller: Poller::new(config.inspect_interval()),
            timeout_ms: config.test_timeout_ms,
            volume: config.volume_dir.clone(),
        };
        tracing::info!(
            image = %ctx.image(),
            build = %ctx.build,
            stamp = %ctx.stamp,
            log_dir = %ctx.logs.dir().display(),
            "testing begun"
        );
        Ok(ctx)
    }

    /// Tag of the image under test.
    #[must_use]
    pub fn image(&self) -> String {
        format!("{}-{}", self.app, self.build)
    }

    /// Application name.
    #[must_use]
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Run stamp.
    #[must_use]
    pub const fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    /// Directory holding this run's logs.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        self.logs.dir()
    }

    /// The engine shared by every worker.
    #[must_use]
    pub fn engine(&self) -> &dyn ContainerEngine {
        self.engine.as_ref()
    }

    /// Container configuration for `test` in this run.
    #[must_use]
    pub fn container_spec(&self, test: &TestSpec) -> ContainerSpec {
        ContainerSpec {
            name: test.container_name(&self.stamp),
            image: self.image(),
            command: test.cmd.clone(),
            tty: true,
            volume: self.volume.clone(),
        }
    }

    /// Creates the container for `test`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create the container.
    pub async fn create(&self, test: &mut RuntimeTest) -> Result<()> {
        let spec = self.container_spec(&test.spec);
        let id = self.engine.create_container(&spec).await?;
        tracing::debug!(test = test.name(), container = %id, name = %spec.name, "container created");
        test.mark_created(id);
        Ok(())
    }

    /// Starts the container bound to `test`.
    ///
    /// # Errors
    ///
    /// Returns an error if no container exists or the engine cannot start it.
    pub async fn start(&self, test: &mut RuntimeTest) -> Result<()> {
        self.engine.start_container(test.container_id()?).await?;
        test.mark_started();
        Ok(())
    }

    /// Waits for `test` to exit, honoring cancellation and the optional
    /// per-test deadline.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::Timeout` when the deadline passes, or the
    /// engine error of a failed inspection.
    pub async fn wait(
        &self,
        test: &mut RuntimeTest,
        cancel: &mut Cancellation,
    ) -> Result<PollOutcome> {
        let id = test.container_id()?.clone();
        test.mark_polling();
        let wait = self.poller.wait_for_exit(self.engine.as_ref(), &id, cancel);
        let outcome = match self.timeout_ms {
            Some(after_ms) => tokio::time::timeout(Duration::from_millis(after_ms), wait)
                .await
                .map_err(|_| BaselineError::Timeout {
                    test: test.spec.name.clone(),
                    after_ms,
                })??,
            None => wait.await?,
        };
        match outcome {
            PollOutcome::Exited(code) => test.finish(code),
            PollOutcome::Cancelled => test.cancel(),
        }
        Ok(outcome)
    }

    /// Fetches the container's full timestamped log and writes it to the
    /// test's log file.
    ///
    /// # Errors
    ///
    /// Returns an error if the logs cannot be fetched or written.
    pub async fn capture_logs(&self, test: &mut RuntimeTest) -> Result<PathBuf> {
        let log = self.engine.fetch_logs(test.container_id()?, true).await?;
        let path = self.logs.persist(test.name(), &log).await?;
        tracing::debug!(test = test.name(), path = %path.display(), "log persisted");
        test.log_path = Some(path.clone());
        Ok(path)
    }

    /// Stops the container bound to `test`, logging instead of failing.
    pub async fn stop_quietly(&self, test: &RuntimeTest) {
        let Some(id) = test.container.as_ref() else {
            return;
        };
        if let Err(e) = self.engine.stop_container(id).await {
            tracing::warn!(test = test.name(), container = %id, error = %e, "failed to stop container");
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("app", &self.app)
            .field("build", &self.build)
            .field("stamp", &self.stamp)
            .field("logs", &self.logs)
            .field("poller", &self.poller)
            .field("timeout_ms", &self.timeout_ms)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline_engine::fake::{FakeEngine, Script};

    fn config(root: &Path) -> BaselineConfig {
        BaselineConfig {
            log_dir: root.to_path_buf(),
            inspect_frequency_ms: 1,
            ..BaselineConfig::default()
        }
    }

    fn context(engine: FakeEngine, config: &BaselineConfig) -> RunContext {
        RunContext::with_stamp(Arc::new(engine), "shop", "app", config, RunStamp::new("s1"))
            .expect("context")
    }

    #[test]
    fn container_spec_is_namespaced_by_stamp() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut cfg = config(root.path());
        cfg.volume_dir = Some(PathBuf::from("/srv/data"));
        let ctx = context(FakeEngine::new(), &cfg);

        let spec = ctx.container_spec(&TestSpec::new("unit", ["make", "test"]));
        assert_eq!(spec.name, "unit-s1");
        assert_eq!(spec.image, "shop-app");
        assert_eq!(spec.command, vec!["make", "test"]);
        assert!(spec.tty);
        assert_eq!(spec.volume, Some(PathBuf::from("/srv/data")));
    }

    #[test]
    fn new_creates_run_log_directory() {
        let root = tempfile::tempdir().expect("tempdir");
        let ctx = context(FakeEngine::new(), &config(root.path()));
        assert_eq!(ctx.log_dir(), root.path().join("shop").join("s1"));
        assert!(ctx.log_dir().is_dir());
    }

    #[tokio::test]
    async fn full_lifecycle_persists_timestamped_log() {
        let root = tempfile::tempdir().expect("tempdir");
        let engine = FakeEngine::new()
            .with_image("shop-app")
            .with_script("unit", Script::exits(0).with_logs("all good\n"));
        let ctx = context(engine, &config(root.path()));
        let mut test = RuntimeTest::new(TestSpec::new("unit", ["true"]));

        ctx.create(&mut test).await.unwrap();
        ctx.start(&mut test).await.unwrap();
        let outcome = ctx.wait(&mut test, &mut Cancellation::never()).await.unwrap();
        assert_eq!(outcome, PollOutcome::Exited(0));
        let path = ctx.capture_logs(&mut test).await.unwrap();

        let log = std::fs::read_to_string(path).unwrap();
        assert!(log.ends_with("all good\n"), "got: {log}");
        assert!(log.starts_with("2024-"), "expected a timestamp, got: {log}");
        assert_eq!(test.log_path.as_deref(), Some(ctx.log_dir().join("unit").as_path()));
    }

    #[tokio::test]
    async fn wait_past_deadline_is_timeout() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut cfg = config(root.path());
        cfg.test_timeout_ms = Some(20);
        let engine = FakeEngine::new()
            .with_image("shop-app")
            .with_script("slow", Script::hangs());
        let ctx = context(engine, &cfg);
        let mut test = RuntimeTest::new(TestSpec::new("slow", ["sleep", "inf"]));

        ctx.create(&mut test).await.unwrap();
        ctx.start(&mut test).await.unwrap();
        let err = ctx.wait(&mut test, &mut Cancellation::never()).await.unwrap_err();
        assert!(matches!(err, BaselineError::Timeout { after_ms: 20, .. }));
    }

    #[tokio::test]
    async fn create_fails_without_image() {
        let root = tempfile::tempdir().expect("tempdir");
        let ctx = context(FakeEngine::new(), &config(root.path()));
        let mut test = RuntimeTest::new(TestSpec::new("unit", ["true"]));
        assert!(ctx.create(&mut test).await.is_err());
        assert!(test.container.is_none());
    }
}
