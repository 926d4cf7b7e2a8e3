//! CLI command definitions and dispatch.

pub mod fix;
pub mod flush;
pub mod init;

use std::path::PathBuf;
use std::sync::Arc;

use baseline_common::config::BaselineConfig;
use baseline_common::constants::{
    BIN_NAME, DEFAULT_APPS_DIR, DEFAULT_ENDPOINT, DEFAULT_LOG_DIR, ENDPOINT_ENV,
};
use baseline_engine::ContainerEngine;
use baseline_engine::docker::DockerCli;
use baseline_runtime::Pipeline;
use clap::{Args, Parser, Subcommand};

/// Baseline: build an image chain, commit a checkpoint, test against it.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options accepted by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Docker endpoint.
    #[arg(
        short = 'd',
        long = "docker-host",
        global = true,
        env = ENDPOINT_ENV,
        default_value = DEFAULT_ENDPOINT,
        value_name = "ENDPOINT"
    )]
    pub docker_host: String,

    /// Directory holding one sub-directory per application.
    #[arg(long, global = true, default_value = DEFAULT_APPS_DIR)]
    pub apps_dir: PathBuf,

    /// Root directory for per-run test logs.
    #[arg(long, global = true, default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,
}

impl GlobalArgs {
    /// Base configuration derived from the global options.
    #[must_use]
    pub fn config(&self) -> BaselineConfig {
        BaselineConfig {
            endpoint: self.docker_host.clone(),
            apps_dir: self.apps_dir.clone(),
            log_dir: self.log_dir.clone(),
            ..BaselineConfig::default()
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove and rebuild every image of the application's chain.
    Init(init::InitArgs),
    /// Run the committer, then every tester against the checkpoint.
    Test(test::TestArgs),
    /// Remove the final image, or every image from a given step onwards.
    Flush(flush::FlushArgs),
    /// Build only the chain steps whose image is missing.
    Fix(fix::FixArgs),
}

/// Dispatches the parsed CLI command and returns the process exit code.
///
/// # Errors
///
/// Returns an error if the command fails.
pub async fn execute(cli: Cli) -> anyhow::Result<i64> {
    match cli.command {
        Command::Init(args) => init::execute(&cli.global, args).await,
        Command::Test(args) => test::execute(&cli.global, args).await,
        Command::Flush(args) => flush::execute(&cli.global, args).await,
        Command::Fix(args) => fix::execute(&cli.global, args).await,
    }
}

/// Loads application `app` and binds it to the Docker engine.
fn open(config: BaselineConfig, app: &str) -> anyhow::Result<Pipeline> {
    let engine = DockerCli::new(config.endpoint.clone());
    if !engine.is_available() {
        tracing::warn!(endpoint = %config.endpoint, "docker client not found on PATH");
    }
    let app = baseline_manifest::load(&config, app)?;
    Ok(Pipeline::new(Arc::new(engine), config, app)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_command_reads_flags() {
        let cli = Cli::try_parse_from([
            "baseline", "test", "shop", "-f", "250", "-v", "/srv/data", "--timeout", "5000",
            "-d", "tcp://10.0.0.2:2375",
        ])
        .unwrap();
        assert_eq!(cli.global.docker_host, "tcp://10.0.0.2:2375");
        let Command::Test(args) = cli.command else {
            panic!("expected test command");
        };
        assert_eq!(args.app, "shop");
        assert_eq!(args.freq, 250);
        assert_eq!(args.volume, Some(PathBuf::from("/srv/data")));
        assert_eq!(args.timeout, Some(5000));
    }

    #[test]
    fn test_command_defaults_to_one_second_polls() {
        let cli = Cli::try_parse_from(["baseline", "test", "shop"]).unwrap();
        let Command::Test(args) = cli.command else {
            panic!("expected test command");
        };
        assert_eq!(args.freq, 1000);
        assert!(args.timeout.is_none());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(Cli::try_parse_from(["baseline", "test", "shop", "--freq", "0"]).is_err());
    }

    #[test]
    fn init_accepts_quiet_and_no_cache() {
        let cli = Cli::try_parse_from(["baseline", "init", "shop", "-q", "-n"]).unwrap();
        let Command::Init(args) = cli.command else {
            panic!("expected init command");
        };
        assert!(args.quiet);
        assert!(args.no_cache);
    }

    #[test]
    fn flush_takes_optional_build_step() {
        let cli = Cli::try_parse_from(["baseline", "flush", "shop", "--build", "deps"]).unwrap();
        let Command::Flush(args) = cli.command else {
            panic!("expected flush command");
        };
        assert_eq!(args.build.as_deref(), Some("deps"));
    }

    #[test]
    fn app_argument_is_required() {
        assert!(Cli::try_parse_from(["baseline", "fix"]).is_err());
    }

    #[test]
    fn global_args_shape_the_config() {
        let cli = Cli::try_parse_from([
            "baseline", "fix", "shop", "--apps-dir", "/work/apps", "--log-dir", "/tmp/logs",
        ])
        .unwrap();
        let config = cli.global.config();
        assert_eq!(config.apps_dir, PathBuf::from("/work/apps"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/logs"));
        assert_eq!(config.inspect_frequency_ms, 1000);
    }
}
