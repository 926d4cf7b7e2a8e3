//! Build-chain and test orchestration for the baseline pipeline.
//!
//! The pipeline runs in a fixed order: build the chain, run the committer
//! container on the final image and commit it as the checkpoint, then run
//! every tester concurrently against the checkpoint and report one result.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod commit;
pub mod container;
pub mod context;
pub mod logs;
pub mod orchestrator;
pub mod pipeline;
pub mod poll;

pub use commit::CommitStep;
pub use container::{RuntimeTest, TestState};
pub use context::RunContext;
pub use orchestrator::{RunOutcome, TestOrchestrator, TestResult};
pub use pipeline::Pipeline;
