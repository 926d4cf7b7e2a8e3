//! # baseline
//!
//! Builds an application's chain of images, commits a checkpoint from its
//! setup test, and runs every other test concurrently against it.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

mod commands;
mod output;

use std::process::ExitCode;

use baseline_common::error::BaselineError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.json_logs);

    let code = match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            let code = e
                .downcast_ref::<BaselineError>()
                .map_or(1, BaselineError::exit_code);
            output::error(&e);
            code
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
