//! Child process execution for CLI-backed engines.

use std::process::Stdio;

use baseline_common::error::{BaselineError, Result};
use tokio::process::Command;

/// Output from an engine CLI invocation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Standard output from the command.
    pub stdout: Vec<u8>,
    /// Standard error from the command.
    pub stderr: String,
}

impl ExecOutput {
    /// Standard output decoded lossily and trimmed.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }
}

/// Runs `command` to completion, capturing stdout and stderr.
///
/// # Errors
///
/// Returns `BaselineError::Io` if the binary cannot be spawned and
/// `BaselineError::Engine` if it exits with a non-zero status.
pub async fn capture(mut command: Command, operation: &'static str) -> Result<ExecOutput> {
    tracing::debug!(operation, cmd = ?command.as_std(), "invoking engine");
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error(&command, e))?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        let message = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(BaselineError::engine(operation, message));
    }

    Ok(ExecOutput {
        stdout: output.stdout,
        stderr,
    })
}

/// Runs `command` to completion with its output attached to the terminal.
///
/// # Errors
///
/// Returns `BaselineError::Io` if the binary cannot be spawned and
/// `BaselineError::Engine` if it exits with a non-zero status.
pub async fn stream(mut command: Command, operation: &'static str) -> Result<()> {
    tracing::debug!(operation, cmd = ?command.as_std(), "invoking engine");
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| spawn_error(&command, e))?;

    if status.success() {
        Ok(())
    } else {
        Err(BaselineError::engine(operation, format!("exited with {status}")))
    }
}

fn spawn_error(command: &Command, source: std::io::Error) -> BaselineError {
    BaselineError::Io {
        path: command.as_std().get_program().into(),
        source,
    }
}
