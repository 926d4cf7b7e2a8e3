//! Run configuration passed explicitly into every component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Container engine endpoint (e.g. `unix:///var/run/docker.sock`).
    pub endpoint: String,
    /// Discard image build output instead of streaming it.
    pub quiet: bool,
    /// Disable layer caching during image builds.
    pub no_cache: bool,
    /// Interval between container inspections, in milliseconds.
    pub inspect_frequency_ms: u64,
    /// Root directory for per-run test logs.
    pub log_dir: PathBuf,
    /// Directory holding one sub-directory per application.
    pub apps_dir: PathBuf,
    /// Host directory bind-mounted into every test container.
    pub volume_dir: Option<PathBuf>,
    /// Optional per-test deadline in milliseconds. `None` polls forever.
    pub test_timeout_ms: Option<u64>,
}

impl BaselineConfig {
    /// Interval between container inspections.
    #[must_use]
    pub const fn inspect_interval(&self) -> Duration {
        Duration::from_millis(self.inspect_frequency_ms)
    }

    /// Per-test deadline, if one is configured.
    #[must_use]
    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout_ms.map(Duration::from_millis)
    }

    /// Directory containing the manifest and build contexts of `app`.
    #[must_use]
    pub fn app_dir(&self, app: &str) -> PathBuf {
        self.apps_dir.join(app)
    }

    /// Root of the log tree.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_ENDPOINT.to_string(),
            quiet: false,
            no_cache: false,
            inspect_frequency_ms: constants::DEFAULT_INSPECT_FREQUENCY_MS,
            log_dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
            apps_dir: PathBuf::from(constants::DEFAULT_APPS_DIR),
            volume_dir: None,
            test_timeout_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_polls_every_second_without_deadline() {
        let config = BaselineConfig::default();
        assert_eq!(config.inspect_interval(), Duration::from_secs(1));
        assert!(config.test_timeout().is_none());
        assert_eq!(config.endpoint, constants::DEFAULT_ENDPOINT);
    }

    #[test]
    fn app_dir_is_nested_under_apps_dir() {
        let config = BaselineConfig {
            apps_dir: PathBuf::from("/srv/apps"),
            ..BaselineConfig::default()
        };
        assert_eq!(config.app_dir("shop"), PathBuf::from("/srv/apps/shop"));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = BaselineConfig {
            quiet: true,
            test_timeout_ms: Some(30_000),
            ..BaselineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: BaselineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
