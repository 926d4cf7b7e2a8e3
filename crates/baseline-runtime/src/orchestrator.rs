//! Concurrent tester execution.
//!
//! Every tester runs in its own task against the checkpoint image. Workers
//! report exactly one [`TestResult`] each over a channel sized to the
//! number of tests, so a send never blocks. The coordinator consumes
//! results until every test passed or one failed. On the first failure it
//! raises the cancellation flag and waits for the remaining workers to
//! stop their containers before returning.

use std::sync::Arc;

use baseline_common::constants::FAILURE_EXIT_CODE;
use baseline_common::error::{BaselineError, Result};
use baseline_common::types::TestSpec;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::container::RuntimeTest;
use crate::context::RunContext;
use crate::poll::{CancelHandle, Cancellation, PollOutcome};

/// Final report of one tester.
#[derive(Debug)]
pub struct TestResult {
    /// The execution, including container, state, and log path.
    pub test: RuntimeTest,
    /// Exit code. Never 0 when `error` is set.
    pub code: i64,
    /// Failure other than a non-zero exit.
    pub error: Option<BaselineError>,
}

impl TestResult {
    fn new(test: RuntimeTest, code: i64, error: Option<BaselineError>) -> Self {
        let code = if error.is_some() && code == 0 {
            FAILURE_EXIT_CODE
        } else {
            code
        };
        Self { test, code, error }
    }

    /// Returns whether this result fails the run.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.code != 0 || self.error.is_some()
    }

    /// Test name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.test.name()
    }

    /// The container's own exit code outranks a secondary failure such as
    /// a lost log, so the run still terminates with that code.
    fn into_error(self) -> BaselineError {
        let code = self.code;
        let test = self.test.spec.name;
        match self.error {
            Some(e) if e.exit_code() == code => e,
            _ => BaselineError::TestFailed {
                test,
                exit_code: code,
            },
        }
    }
}

/// Aggregate result of a tester run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Number of testers declared.
    pub total: usize,
    /// Testers that passed, including any that finished while the run was
    /// being drained.
    pub passed: Vec<TestResult>,
    /// The first failure observed, if any.
    pub failure: Option<TestResult>,
    /// Testers drained after the first failure without passing.
    pub unfinished: Vec<TestResult>,
}

impl RunOutcome {
    const fn empty(total: usize) -> Self {
        Self {
            total,
            passed: Vec::new(),
            failure: None,
            unfinished: Vec::new(),
        }
    }

    fn drained(&mut self, result: TestResult) {
        if result.failed() {
            self.unfinished.push(result);
        } else {
            self.passed.push(result);
        }
    }

    /// Returns whether every tester passed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Exit code of the run: the first failure's code, or 0.
    #[must_use]
    pub fn exit_code(&self) -> i64 {
        self.failure.as_ref().map_or(0, |f| f.code)
    }

    /// Converts the outcome into an error if a tester failed.
    ///
    /// # Errors
    ///
    /// Returns the failing tester's error, or `BaselineError::TestFailed`
    /// carrying its exit code.
    pub fn into_result(self) -> Result<()> {
        self.failure.map_or(Ok(()), |f| Err(f.into_error()))
    }
}

/// Runs testers concurrently and aggregates their results.
#[derive(Debug, Clone)]
pub struct TestOrchestrator {
    ctx: Arc<RunContext>,
}

impl TestOrchestrator {
    /// Creates an orchestrator for a run.
    #[must_use]
    pub const fn new(ctx: Arc<RunContext>) -> Self {
        Self { ctx }
    }

    /// Runs every test in `tests` and waits for the outcome.
    ///
    /// An empty list succeeds immediately without touching the engine.
    ///
    /// # Errors
    ///
    /// Returns an error only if workers vanished without reporting, which
    /// happens when a worker task panics.
    pub async fn run(&self, tests: &[TestSpec]) -> Result<RunOutcome> {
        let total = tests.len();
        let mut outcome = RunOutcome::empty(total);
        if tests.is_empty() {
            tracing::info!("no testers declared");
            return Ok(outcome);
        }

        let cancel = CancelHandle::new();
        let (tx, mut rx) = mpsc::channel(total);
        let mut workers = JoinSet::new();
        for spec in tests {
            let ctx = Arc::clone(&self.ctx);
            let tx = tx.clone();
            let token = cancel.subscribe();
            let spec = spec.clone();
            let _ = workers.spawn(async move {
                let result = run_test(&ctx, spec, token).await;
                let _ = tx.send(result).await;
            });
        }
        drop(tx);
        tracing::info!(tests = total, stamp = %self.ctx.stamp(), "testers started");

        while outcome.passed.len() < total {
            let Some(result) = rx.recv().await else {
                break;
            };
            report(&result);
            if result.failed() {
                outcome.failure = Some(result);
                break;
            }
            outcome.passed.push(result);
        }

        if outcome.failure.is_some() {
            cancel.cancel();
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "test worker did not finish cleanly");
            }
        }
        while let Ok(result) = rx.try_recv() {
            outcome.drained(result);
        }

        if outcome.failure.is_none() && outcome.passed.len() < total {
            return Err(BaselineError::engine(
                "test worker",
                format!(
                    "{} of {total} tests reported no result",
                    total - outcome.passed.len()
                ),
            ));
        }
        Ok(outcome)
    }
}

fn report(result: &TestResult) {
    let log = result
        .test
        .log_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    match &result.error {
        Some(e) => {
            tracing::error!(test = result.name(), code = result.code, log, error = %e, "test failed");
        }
        None if result.code != 0 => {
            tracing::error!(test = result.name(), code = result.code, log, "test failed");
        }
        None => tracing::info!(test = result.name(), log, "test passed"),
    }
}

async fn launch(ctx: &RunContext, test: &mut RuntimeTest) -> Result<()> {
    ctx.create(test).await?;
    ctx.start(test).await
}

async fn keep_logs(ctx: &RunContext, test: &mut RuntimeTest) {
    if let Err(e) = ctx.capture_logs(test).await {
        tracing::debug!(test = test.name(), error = %e, "log not captured");
    }
}

/// Executes one tester from creation to log capture.
///
/// Always produces a result; failures are carried inside it.
async fn run_test(ctx: &RunContext, spec: TestSpec, mut cancel: Cancellation) -> TestResult {
    let mut test = RuntimeTest::new(spec);

    if let Err(e) = launch(ctx, &mut test).await {
        test.fail();
        ctx.stop_quietly(&test).await;
        return TestResult::new(test, FAILURE_EXIT_CODE, Some(e));
    }

    match ctx.wait(&mut test, &mut cancel).await {
        Ok(PollOutcome::Exited(code)) => {
            let error = ctx.capture_logs(&mut test).await.err();
            TestResult::new(test, code, error)
        }
        Ok(PollOutcome::Cancelled) => {
            ctx.stop_quietly(&test).await;
            keep_logs(ctx, &mut test).await;
            let error = BaselineError::Cancelled {
                test: test.spec.name.clone(),
            };
            TestResult::new(test, FAILURE_EXIT_CODE, Some(error))
        }
        Err(e) => {
            test.fail();
            ctx.stop_quietly(&test).await;
            keep_logs(ctx, &mut test).await;
            TestResult::new(test, FAILURE_EXIT_CODE, Some(e))
        }
    }
}
