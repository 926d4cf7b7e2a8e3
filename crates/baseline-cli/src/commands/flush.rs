//! `baseline flush`: Remove images of the application's chain.

use std::time::Instant;

use clap::Args;

use super::GlobalArgs;
use crate::output;

/// Arguments for the `flush` command.
#[derive(Args, Debug)]
pub struct FlushArgs {
    /// Application name (directory under the apps directory).
    pub app: String,

    /// Flush this build step and every step after it. Defaults to the
    /// final step only.
    #[arg(short, long, value_name = "STEP")]
    pub build: Option<String>,
}

/// Executes the `flush` command.
///
/// # Errors
///
/// Returns an error if the application cannot be loaded, the step is not
/// part of the chain, or the engine refuses a removal.
pub async fn execute(global: &GlobalArgs, args: FlushArgs) -> anyhow::Result<i64> {
    let started = Instant::now();
    let pipeline = super::open(global.config(), &args.app)?;
    let chain = pipeline.flush(args.build.as_deref()).await?;
    let steps: Vec<&str> = chain.iter().collect();
    output::done(&format!("flushed {}", steps.join(", ")), started.elapsed());
    Ok(0)
}
