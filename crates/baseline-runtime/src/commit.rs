//! The committer step.
//!
//! The committer runs alone on the final image before any tester. When it
//! exits with 0 its container is committed back onto the final image's
//! repository under the `latest` tag, so every tester starts from the
//! state it produced.

use baseline_common::constants::CHECKPOINT_TAG;
use baseline_common::error::{BaselineError, Result};
use baseline_common::types::TestSpec;

use crate::container::RuntimeTest;
use crate::context::RunContext;
use crate::poll::{Cancellation, PollOutcome};

/// Runs the committer and records the checkpoint.
#[derive(Debug, Clone, Copy)]
pub struct CommitStep<'a> {
    ctx: &'a RunContext,
}

impl<'a> CommitStep<'a> {
    /// Creates the step for a run.
    #[must_use]
    pub const fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Runs `committer` to completion and commits it on success.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::CommitFailed` when the committer exits
    /// non-zero, in which case nothing is committed. Engine and log
    /// failures are returned as-is.
    pub async fn run(&self, committer: &TestSpec) -> Result<RuntimeTest> {
        let ctx = self.ctx;
        let mut test = RuntimeTest::new(committer.clone());
        tracing::info!(test = %committer.name, image = %ctx.image(), "running committer");

        ctx.create(&mut test).await?;
        if let Err(e) = ctx.start(&mut test).await {
            test.fail();
            ctx.stop_quietly(&test).await;
            return Err(e);
        }
        let code = match ctx.wait(&mut test, &mut Cancellation::never()).await {
            Ok(PollOutcome::Exited(code)) => code,
            Ok(PollOutcome::Cancelled) => {
                return Err(BaselineError::Cancelled {
                    test: committer.name.clone(),
                });
            }
            Err(e) => {
                test.fail();
                ctx.stop_quietly(&test).await;
                self.keep_log(&mut test).await;
                return Err(e);
            }
        };

        if code != 0 {
            self.keep_log(&mut test).await;
            return Err(BaselineError::CommitFailed {
                test: committer.name.clone(),
                exit_code: code,
            });
        }

        let _ = ctx.capture_logs(&mut test).await?;
        let id = test.container_id()?;
        ctx.engine()
            .commit_container(id, &ctx.image(), CHECKPOINT_TAG)
            .await?;
        tracing::info!(
            test = %committer.name,
            container = %id,
            image = %format!("{}:{CHECKPOINT_TAG}", ctx.image()),
            "checkpoint committed"
        );
        Ok(test)
    }

    async fn keep_log(&self, test: &mut RuntimeTest) {
        if let Err(e) = self.ctx.capture_logs(test).await {
            tracing::warn!(test = test.name(), error = %e, "could not keep committer log");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::container::TestState;
    use baseline_common::config::BaselineConfig;
    use baseline_common::types::RunStamp;
    use baseline_engine::fake::{Call, FakeEngine, Script};

    fn setup(engine: FakeEngine) -> (Arc<FakeEngine>, RunContext, tempfile::TempDir) {
        setup_with_timeout(engine, None)
    }

    fn setup_with_timeout(
        engine: FakeEngine,
        test_timeout_ms: Option<u64>,
    ) -> (Arc<FakeEngine>, RunContext, tempfile::TempDir) {
        let root = tempfile::tempdir().expect("tempdir");
        let config = BaselineConfig {
            log_dir: root.path().to_path_buf(),
            inspect_frequency_ms: 1,
            test_timeout_ms,
            ..BaselineConfig::default()
        };
        let engine = Arc::new(engine);
        let ctx = RunContext::with_stamp(engine.clone(), "shop", "app", &config, RunStamp::new("s1"))
            .expect("context");
        (engine, ctx, root)
    }

    #[tokio::test]
    async fn success_commits_to_latest() {
        let (engine, ctx, _root) = setup(FakeEngine::new().with_image("shop-app"));
        let test = CommitStep::new(&ctx)
            .run(&TestSpec::new("setup", ["./migrate.sh"]))
            .await
            .unwrap();

        assert_eq!(test.state, TestState::Succeeded);
        let commits: Vec<_> = engine
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Commit { reference, .. } => Some(reference),
                _ => None,
            })
            .collect();
        assert_eq!(commits, vec!["shop-app:latest"]);
        assert!(ctx.log_dir().join("setup").is_file());
    }

    #[tokio::test]
    async fn nonzero_exit_is_commit_failed_without_commit() {
        let (engine, ctx, _root) = setup(
            FakeEngine::new()
                .with_image("shop-app")
                .with_script("setup", Script::exits(1)),
        );
        let err = CommitStep::new(&ctx)
            .run(&TestSpec::new("setup", ["./migrate.sh"]))
            .await
            .unwrap_err();

        assert!(matches!(err, BaselineError::CommitFailed { exit_code: 1, .. }));
        assert_eq!(engine.count(|c| matches!(c, Call::Commit { .. })), 0);
        assert!(ctx.log_dir().join("setup").is_file());
    }

    #[tokio::test]
    async fn failed_committer_with_lost_log_still_reports_commit_failure() {
        let (_engine, ctx, _root) = setup(
            FakeEngine::new()
                .with_image("shop-app")
                .with_script("setup", Script::exits(4).fail_logs()),
        );
        let err = CommitStep::new(&ctx)
            .run(&TestSpec::new("setup", ["./migrate.sh"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BaselineError::CommitFailed { exit_code: 4, .. }));
    }

    #[tokio::test]
    async fn log_failure_after_success_aborts_before_commit() {
        let (engine, ctx, _root) = setup(
            FakeEngine::new()
                .with_image("shop-app")
                .with_script("setup", Script::exits(0).fail_logs()),
        );
        let err = CommitStep::new(&ctx)
            .run(&TestSpec::new("setup", ["./migrate.sh"]))
            .await
            .unwrap_err();
        assert!(matches!(err, BaselineError::Engine { .. }));
        assert_eq!(engine.count(|c| matches!(c, Call::Commit { .. })), 0);
    }

    #[tokio::test]
    async fn timed_out_committer_is_stopped_without_commit() {
        let (engine, ctx, _root) = setup_with_timeout(
            FakeEngine::new()
                .with_image("shop-app")
                .with_script("setup", Script::hangs()),
            Some(20),
        );
        let err = CommitStep::new(&ctx)
            .run(&TestSpec::new("setup", ["./migrate.sh"]))
            .await
            .unwrap_err();

        assert!(matches!(err, BaselineError::Timeout { after_ms: 20, .. }));
        assert_eq!(engine.count(|c| matches!(c, Call::Stop(_))), 1);
        assert_eq!(engine.count(|c| matches!(c, Call::Commit { .. })), 0);
        assert!(ctx.log_dir().join("setup").is_file());
    }

    #[tokio::test]
    async fn unstartable_committer_is_stopped() {
        let (engine, ctx, _root) = setup(
            FakeEngine::new()
                .with_image("shop-app")
                .with_script("setup", Script::exits(0).fail_start()),
        );
        let err = CommitStep::new(&ctx)
            .run(&TestSpec::new("setup", ["./migrate.sh"]))
            .await
            .unwrap_err();

        assert!(matches!(err, BaselineError::Engine { .. }));
        assert_eq!(engine.count(|c| matches!(c, Call::Stop(_))), 1);
        assert_eq!(engine.count(|c| matches!(c, Call::Commit { .. })), 0);
    }
}
