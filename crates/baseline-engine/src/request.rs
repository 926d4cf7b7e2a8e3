//! Request and response shapes exchanged with the engine.

use std::path::PathBuf;

use baseline_common::types::ImageId;

/// Where image build progress goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSink {
    /// Stream build output to the terminal.
    Inherit,
    /// Discard build output.
    Discard,
}

/// Parameters for building one image.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Tag given to the resulting image.
    pub name: String,
    /// Build context directory.
    pub context_dir: PathBuf,
    /// Disable layer caching.
    pub no_cache: bool,
    /// Destination of build progress output.
    pub output: OutputSink,
}

/// Configuration for creating a container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name, unique per run.
    pub name: String,
    /// Image the container is created from.
    pub image: String,
    /// Command to execute inside the container.
    pub command: Vec<String>,
    /// Allocate a pseudo-terminal.
    pub tty: bool,
    /// Host directory bind-mounted at the same path inside the container.
    pub volume: Option<PathBuf>,
}

/// An image known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    /// Engine identifier.
    pub id: ImageId,
    /// `repository:tag` references pointing at this image.
    pub repo_tags: Vec<String>,
}
