//! `baseline init`: Rebuild the application's image chain from scratch.

use std::time::Instant;

use clap::Args;

use super::GlobalArgs;
use crate::output;

/// Arguments for the `init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Application name (directory under the apps directory).
    pub app: String,

    /// Discard image build output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Build without the layer cache.
    #[arg(short, long)]
    pub no_cache: bool,
}

/// Executes the `init` command.
///
/// # Errors
///
/// Returns an error if the application cannot be loaded or any removal
/// or build fails.
pub async fn execute(global: &GlobalArgs, args: InitArgs) -> anyhow::Result<i64> {
    let started = Instant::now();
    let mut config = global.config();
    config.quiet = args.quiet;
    config.no_cache = args.no_cache;

    let pipeline = super::open(config, &args.app)?;
    pipeline.init().await?;
    output::done(
        &format!("{} is ready", pipeline.app().final_image()),
        started.elapsed(),
    );
    Ok(0)
}
