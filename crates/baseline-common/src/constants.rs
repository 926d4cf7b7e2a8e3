//! System-wide constants and default paths.

/// Default container engine endpoint.
pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/docker.sock";

/// Default interval between container inspections, in milliseconds.
pub const DEFAULT_INSPECT_FREQUENCY_MS: u64 = 1000;

/// Directory holding one sub-directory per application.
pub const DEFAULT_APPS_DIR: &str = "apps";

/// Root directory for per-run test logs.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// File name of the application manifest inside an application directory.
pub const APP_MANIFEST: &str = "app.json";

/// Tag qualifier applied to committed checkpoint images.
pub const CHECKPOINT_TAG: &str = "latest";

/// Number of hex characters kept from the run stamp digest.
pub const RUN_STAMP_LENGTH: usize = 16;

/// Exit code reported for setup, engine, and configuration failures.
pub const FAILURE_EXIT_CODE: i64 = 1;

/// Binary name for the CLI.
pub const BIN_NAME: &str = "baseline";

/// Environment variable consulted for the engine endpoint.
pub const ENDPOINT_ENV: &str = "DOCKER_HOST";
