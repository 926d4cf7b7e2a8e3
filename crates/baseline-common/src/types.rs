//! Domain primitive types used across the baseline workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::RUN_STAMP_LENGTH;

/// Engine-assigned identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine-assigned identifier for an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates a new image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-invocation token namespacing containers and log directories.
///
/// Derived from the wall-clock time so repeated or concurrent runs never
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunStamp(String);

impl RunStamp {
    /// Creates a stamp from a fixed value.
    #[must_use]
    pub fn new(stamp: impl Into<String>) -> Self {
        Self(stamp.into())
    }

    /// Derives a fresh stamp from the current time.
    #[must_use]
    pub fn now() -> Self {
        let now = chrono::Utc::now();
        let seed = now.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);
        let digest = Sha256::digest(seed.as_bytes());
        let mut stamp = hex::encode(digest);
        stamp.truncate(RUN_STAMP_LENGTH);
        Self(stamp)
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A declared test: a human-readable name and the command to run.
///
/// Tests are opaque to the pipeline; only the container's exit code is
/// interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestSpec {
    /// Human-readable name, also used for container and log file names.
    pub name: String,
    /// Command tokens executed inside the container.
    pub cmd: Vec<String>,
}

impl TestSpec {
    /// Creates a test spec from a name and command tokens.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            cmd: cmd.into_iter().map(Into::into).collect(),
        }
    }

    /// Container name for this test within the given run.
    #[must_use]
    pub fn container_name(&self, stamp: &RunStamp) -> String {
        format!("{}-{stamp}", self.name)
    }
}

/// Snapshot of a container's state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// Whether the container's main process is still running.
    pub running: bool,
    /// Exit code of the main process (0 while running).
    pub exit_code: i64,
}

impl ContainerStatus {
    /// Status of a container that is still running.
    #[must_use]
    pub const fn running() -> Self {
        Self {
            running: true,
            exit_code: 0,
        }
    }

    /// Status of a container that exited with `code`.
    #[must_use]
    pub const fn exited(code: i64) -> Self {
        Self {
            running: false,
            exit_code: code,
        }
    }

    /// Exit code if the container is finished.
    ///
    /// A non-zero exit code wins over the running flag: engines may report
    /// a failed process as running for a short while.
    #[must_use]
    pub const fn exit(&self) -> Option<i64> {
        if self.exit_code != 0 {
            Some(self.exit_code)
        } else if !self.running {
            Some(0)
        } else {
            None
        }
    }
}
