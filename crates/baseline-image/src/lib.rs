//! # baseline-image
//!
//! Image lifecycle management for an application's build chain.
//!
//! Handles:
//! - **Chain**: the ordered list of build steps, with suffix slicing.
//! - **Reference**: structured `repository[:tag][@digest]` parsing.
//! - **Registry**: existence checks against the engine's image list.
//! - **Builder**: sequential, fail-fast builds and idempotent removal.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod chain;
pub mod reference;
pub mod registry;

pub use builder::ImageBuilder;
pub use chain::BuildChain;
pub use reference::ImageRef;
