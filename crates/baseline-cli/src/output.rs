//! Formatted terminal output for CLI commands.
//!
//! Everything here goes to stderr so stdout stays free for the tests'
//! own streamed output.

#![allow(clippy::print_stderr)]

use std::time::Duration;

use baseline_runtime::{RunOutcome, TestResult};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Formats a duration for humans (e.g. "350ms", "4.2s", "2m05s").
#[must_use]
pub fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{}.{}s", millis / 1000, (millis % 1000) / 100)
    } else {
        let secs = elapsed.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}

/// Prints a one-line success message.
pub fn done(message: &str, elapsed: Duration) {
    eprintln!("  {GREEN}{BOLD}done{RESET} {message} {DIM}({}){RESET}", format_duration(elapsed));
}

/// Prints a fatal error with its cause chain.
pub fn error(err: &anyhow::Error) {
    eprintln!("  {RED}{BOLD}error{RESET} {err:#}");
}

fn result_line(marker: &str, result: &TestResult) -> String {
    let log = result
        .test
        .log_path
        .as_ref()
        .map_or_else(String::new, |p| format!(" {DIM}{}{RESET}", p.display()));
    format!("    {marker} {BOLD}{}{RESET} [{}]{log}", result.name(), result.code)
}

/// Prints the per-test summary of a run.
pub fn test_summary(outcome: &RunOutcome, elapsed: Duration) {
    eprintln!();
    for result in &outcome.passed {
        eprintln!("{}", result_line(&format!("{GREEN}●{RESET}"), result));
    }
    if let Some(failure) = &outcome.failure {
        eprintln!("{}", result_line(&format!("{RED}●{RESET}"), failure));
    }
    for result in &outcome.unfinished {
        eprintln!("{}", result_line(&format!("{YELLOW}○{RESET}"), result));
    }
    eprintln!();
    if outcome.is_success() {
        eprintln!(
            "  {GREEN}{BOLD}{} of {} passed{RESET} in {}",
            outcome.passed.len(),
            outcome.total,
            format_duration(elapsed)
        );
    } else {
        eprintln!(
            "  {RED}{BOLD}failed{RESET} with code {} after {} ({} passed)",
            outcome.exit_code(),
            format_duration(elapsed),
            outcome.passed.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_displays_millis() {
        assert_eq!(format_duration(Duration::from_millis(350)), "350ms");
    }

    #[test]
    fn format_duration_displays_seconds() {
        assert_eq!(format_duration(Duration::from_millis(4_250)), "4.2s");
    }

    #[test]
    fn format_duration_displays_minutes() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }
}
