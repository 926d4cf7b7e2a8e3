//! A declared test bound to one execution.

use std::fmt;
use std::path::PathBuf;

use baseline_common::error::{BaselineError, Result};
use baseline_common::types::{ContainerId, TestSpec};

/// Lifecycle state of a test container within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestState {
    /// Declared, no container yet.
    Pending,
    /// Container created.
    Created,
    /// Container started.
    Started,
    /// Waiting for the container to exit.
    Polling,
    /// Exited with code 0.
    Succeeded,
    /// Exited non-zero, or could not be run.
    Failed,
    /// Stopped because the run already failed elsewhere.
    Cancelled,
}

impl TestState {
    /// Returns whether the test has reached a final state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Created => write!(f, "created"),
            Self::Started => write!(f, "started"),
            Self::Polling => write!(f, "polling"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A [`TestSpec`] bound to one run: its container, state, and outcome.
///
/// Owned by the worker executing it and discarded when the run ends.
#[derive(Debug, Clone)]
pub struct RuntimeTest {
    /// The declared test.
    pub spec: TestSpec,
    /// Engine-assigned container, once created.
    pub container: Option<ContainerId>,
    /// Current lifecycle state.
    pub state: TestState,
    /// Exit code, once the container has exited.
    pub exit_code: Option<i64>,
    /// Persisted log file, once captured.
    pub log_path: Option<PathBuf>,
}

impl RuntimeTest {
    /// Creates a pending execution of `spec`.
    #[must_use]
    pub const fn new(spec: TestSpec) -> Self {
        Self {
            spec,
            container: None,
            state: TestState::Pending,
            exit_code: None,
            log_path: None,
        }
    }

    /// Test name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// The container bound to this test.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::NotFound` if no container was created yet.
    pub fn container_id(&self) -> Result<&ContainerId> {
        self.container.as_ref().ok_or_else(|| BaselineError::NotFound {
            kind: "container for test",
            id: self.spec.name.clone(),
        })
    }

    /// Records the created container.
    pub fn mark_created(&mut self, id: ContainerId) {
        self.container = Some(id);
        self.state = TestState::Created;
    }

    /// Records that the container was started.
    pub const fn mark_started(&mut self) {
        self.state = TestState::Started;
    }

    /// Records that the worker is waiting for exit.
    pub const fn mark_polling(&mut self) {
        self.state = TestState::Polling;
    }

    /// Records the container's exit code.
    pub const fn finish(&mut self, code: i64) {
        self.exit_code = Some(code);
        self.state = if code == 0 {
            TestState::Succeeded
        } else {
            TestState::Failed
        };
    }

    /// Records a failure that produced no exit code.
    pub const fn fail(&mut self) {
        self.state = TestState::Failed;
    }

    /// Records cancellation.
    pub const fn cancel(&mut self) {
        self.state = TestState::Cancelled;
    }
}
