//! # baseline-engine
//!
//! The container engine capability consumed by the build and test pipeline.
//!
//! - [`ContainerEngine`]: the operations the pipeline needs from an engine.
//! - [`docker::DockerCli`]: implementation driving the `docker` binary.
//! - [`fake::FakeEngine`]: scripted in-memory engine for tests.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod docker;
mod engine;
mod exec;
pub mod fake;
pub mod request;

pub use engine::ContainerEngine;
pub use request::{BuildRequest, ContainerSpec, ImageSummary, OutputSink};
