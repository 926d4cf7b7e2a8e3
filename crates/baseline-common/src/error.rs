//! Unified error types for the baseline workspace.
//!
//! Every failure in the build and test pipeline is terminal to the current
//! invocation; nothing here is retried. [`BaselineError::exit_code`] maps
//! each variant onto the process exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::constants::FAILURE_EXIT_CODE;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration or manifest value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A container engine call failed.
    #[error("engine {operation} failed: {message}")]
    Engine {
        /// Engine operation that failed.
        operation: &'static str,
        /// Message reported by the engine.
        message: String,
    },

    /// Building one step of the chain failed.
    #[error("build of image {image} failed: {message}")]
    BuildFailed {
        /// Tag of the image being built.
        image: String,
        /// Underlying failure.
        message: String,
    },

    /// The committer container exited with a non-zero code.
    #[error("commit step `{test}` exited with code {exit_code}, aborting")]
    CommitFailed {
        /// Name of the committer test.
        test: String,
        /// Exit code of the committer container.
        exit_code: i64,
    },

    /// The checkpoint image required for testing does not exist.
    #[error("image `{image}` doesn't exist, run `baseline init` first")]
    MissingCheckpoint {
        /// Tag of the missing image.
        image: String,
    },

    /// A test container exited with a non-zero code.
    #[error("test `{test}` exited with code {exit_code}")]
    TestFailed {
        /// Name of the failing test.
        test: String,
        /// Exit code of the test container.
        exit_code: i64,
    },

    /// Writing a captured log to disk failed.
    #[error("failed to persist log for `{test}` at {path}: {source}")]
    LogPersist {
        /// Test whose log could not be written.
        test: String,
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A test exceeded its configured deadline.
    #[error("test `{test}` did not exit within {after_ms}ms")]
    Timeout {
        /// Name of the test.
        test: String,
        /// Deadline in milliseconds.
        after_ms: u64,
    },

    /// A test was stopped because a sibling failed first.
    #[error("test `{test}` was cancelled")]
    Cancelled {
        /// Name of the test.
        test: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl BaselineError {
    /// Returns the process exit code this error terminates the run with.
    ///
    /// A failing test surfaces its own exit code; every other failure maps
    /// to `1`. Codes outside `1..=255` are clamped to `1`.
    #[must_use]
    pub fn exit_code(&self) -> i64 {
        match self {
            Self::TestFailed { exit_code, .. } if (1..=255).contains(exit_code) => *exit_code,
            _ => FAILURE_EXIT_CODE,
        }
    }

    /// Shorthand for an engine failure.
    #[must_use]
    pub fn engine(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Engine {
            operation,
            message: message.into(),
        }
    }

    /// Shorthand for a configuration failure.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BaselineError>;
