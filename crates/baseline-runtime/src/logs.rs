//! Per-run test log storage.
//!
//! Logs for one run live under `{log_dir}/{app}/{stamp}/`, one file per
//! test, named after the test.

use std::path::{Path, PathBuf};

use baseline_common::error::{BaselineError, Result};
use baseline_common::types::RunStamp;

/// Log directory of a single run.
#[derive(Debug, Clone)]
pub struct RunLogs {
    dir: PathBuf,
}

/// Returns the log directory for a run.
#[must_use]
pub fn run_dir(log_dir: &Path, app: &str, stamp: &RunStamp) -> PathBuf {
    log_dir.join(app).join(stamp.as_str())
}

impl RunLogs {
    /// Creates the run's log directory, including missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(log_dir: &Path, app: &str, stamp: &RunStamp) -> Result<Self> {
        let dir = run_dir(log_dir, app, stamp);
        std::fs::create_dir_all(&dir).map_err(|e| BaselineError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    /// The run's log directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file path for a test.
    #[must_use]
    pub fn path_for(&self, test: &str) -> PathBuf {
        self.dir.join(test)
    }

    /// Writes a test's captured log, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns `BaselineError::LogPersist` if the file cannot be written.
    pub async fn persist(&self, test: &str, log: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(test);
        tokio::fs::write(&path, log)
            .await
            .map_err(|e| BaselineError::LogPersist {
                test: test.to_string(),
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }

    /// Reads a test's log back.
    ///
    /// Returns an empty string if the log has not been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read(&self, test: &str) -> Result<String> {
        let path = self.path_for(test);
        if !path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path).map_err(|e| BaselineError::Io { path, source: e })
    }
}
