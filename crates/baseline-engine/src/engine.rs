//! The engine capability trait.

use async_trait::async_trait;
use baseline_common::error::Result;
use baseline_common::types::{ContainerId, ContainerStatus};

use crate::request::{BuildRequest, ContainerSpec, ImageSummary};

/// Operations the pipeline needs from a container engine.
///
/// Implementors own transport and engine-specific details; callers never
/// retry a failed call.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Builds an image from a context directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects or fails the build.
    async fn build_image(&self, request: &BuildRequest) -> Result<()>;

    /// Lists every image known to the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be retrieved.
    async fn list_images(&self) -> Result<Vec<ImageSummary>>;

    /// Removes an image by reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the image is missing or in use.
    async fn remove_image(&self, name: &str) -> Result<()>;

    /// Creates a container and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// Starts a created container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be started.
    async fn start_container(&self, id: &ContainerId) -> Result<()>;

    /// Reports whether the container is running and its exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be inspected.
    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be stopped.
    async fn stop_container(&self, id: &ContainerId) -> Result<()>;

    /// Commits the container's filesystem as `repository:tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    async fn commit_container(&self, id: &ContainerId, repository: &str, tag: &str)
    -> Result<()>;

    /// Returns the full stdout and stderr history of a container.
    ///
    /// # Errors
    ///
    /// Returns an error if logs cannot be retrieved.
    async fn fetch_logs(&self, id: &ContainerId, timestamps: bool) -> Result<Vec<u8>>;

    /// Returns whether the engine is reachable from this host.
    fn is_available(&self) -> bool;
}
