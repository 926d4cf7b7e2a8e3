//! `baseline fix`: Build the chain steps whose image is missing.

use std::time::Instant;

use clap::Args;

use super::GlobalArgs;
use crate::output;

/// Arguments for the `fix` command.
#[derive(Args, Debug)]
pub struct FixArgs {
    /// Application name (directory under the apps directory).
    pub app: String,

    /// Discard image build output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Build without the layer cache.
    #[arg(short, long)]
    pub no_cache: bool,
}

/// Executes the `fix` command.
///
/// # Errors
///
/// Returns an error if the application cannot be loaded or a build fails.
pub async fn execute(global: &GlobalArgs, args: FixArgs) -> anyhow::Result<i64> {
    let started = Instant::now();
    let mut config = global.config();
    config.quiet = args.quiet;
    config.no_cache = args.no_cache;

    let pipeline = super::open(config, &args.app)?;
    let built = pipeline.fix().await?;
    output::done(&format!("rebuilt {built} image(s)"), started.elapsed());
    Ok(0)
}
