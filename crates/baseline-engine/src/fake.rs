//! In-memory scripted engine (testing only).
//!
//! [`FakeEngine`] keeps an image catalog and a container table in memory.
//! Container behaviour is scripted per test name with [`Script`], and every
//! call is recorded as a [`Call`] so tests can assert on what the pipeline
//! asked the engine to do.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use baseline_common::error::{BaselineError, Result};
use baseline_common::types::{ContainerId, ContainerStatus, ImageId};

use crate::engine::ContainerEngine;
use crate::request::{BuildRequest, ContainerSpec, ImageSummary};

/// Exit code the fake reports for containers stopped from outside.
pub const STOPPED_EXIT_CODE: i64 = 137;

/// Scripted behaviour of the containers created for one test.
#[derive(Debug, Clone)]
pub struct Script {
    exit_code: i64,
    polls: Option<u32>,
    report_running: bool,
    logs: Option<Vec<u8>>,
    fail_create: bool,
    fail_start: bool,
    fail_logs: bool,
}

impl Script {
    /// Exits with `code` on the first inspection after start.
    #[must_use]
    pub const fn exits(code: i64) -> Self {
        Self {
            exit_code: code,
            polls: Some(0),
            report_running: false,
            logs: None,
            fail_create: false,
            fail_start: false,
            fail_logs: false,
        }
    }

    /// Never exits on its own.
    #[must_use]
    pub const fn hangs() -> Self {
        let mut script = Self::exits(0);
        script.polls = None;
        script
    }

    /// Reports running for `polls` inspections before exiting.
    #[must_use]
    pub const fn after_polls(mut self, polls: u32) -> Self {
        self.polls = Some(polls);
        self
    }

    /// Keeps the running flag set after exiting with a non-zero code.
    #[must_use]
    pub const fn still_reported_running(mut self) -> Self {
        self.report_running = true;
        self
    }

    /// Log bytes returned by `fetch_logs`.
    #[must_use]
    pub fn with_logs(mut self, logs: impl Into<Vec<u8>>) -> Self {
        self.logs = Some(logs.into());
        self
    }

    /// Makes container creation fail.
    #[must_use]
    pub const fn fail_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Makes container start fail.
    #[must_use]
    pub const fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Makes log retrieval fail.
    #[must_use]
    pub const fn fail_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::exits(0)
    }
}

/// A recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `build_image` with the requested tag and cache flag.
    Build {
        /// Requested tag.
        name: String,
        /// Whether caching was disabled.
        no_cache: bool,
    },
    /// `list_images`.
    ListImages,
    /// `remove_image`.
    RemoveImage(String),
    /// `create_container`.
    Create {
        /// Container name.
        name: String,
        /// Source image.
        image: String,
    },
    /// `start_container`.
    Start(ContainerId),
    /// `inspect_container`.
    Inspect(ContainerId),
    /// `stop_container`.
    Stop(ContainerId),
    /// `commit_container` with the resulting `repository:tag`.
    Commit {
        /// Committed container.
        container: ContainerId,
        /// Resulting reference.
        reference: String,
    },
    /// `fetch_logs`.
    Logs(ContainerId),
}

#[derive(Debug)]
struct FakeContainer {
    name: String,
    script: Script,
    started: bool,
    stopped: bool,
    polls_seen: u32,
}

#[derive(Debug, Default)]
struct State {
    images: BTreeMap<String, ImageId>,
    next_image: u64,
    containers: HashMap<ContainerId, FakeContainer>,
    scripts: HashMap<String, Script>,
    failing_builds: HashSet<String>,
    locked_images: HashSet<String>,
    calls: Vec<Call>,
}

impl State {
    fn add_image(&mut self, reference: &str) {
        self.next_image += 1;
        let id = ImageId::new(format!("sha256:{:064x}", self.next_image));
        let _ = self.images.insert(normalize(reference), id);
    }

    fn script_for(&self, container_name: &str) -> Script {
        self.scripts
            .iter()
            .filter(|(key, _)| {
                container_name == key.as_str()
                    || container_name
                        .strip_prefix(key.as_str())
                        .is_some_and(|rest| rest.starts_with('-'))
            })
            .max_by_key(|(key, _)| key.len())
            .map(|(_, script)| script.clone())
            .unwrap_or_default()
    }

    fn container(&mut self, id: &ContainerId, operation: &'static str) -> Result<&mut FakeContainer> {
        self.containers
            .get_mut(id)
            .ok_or_else(|| BaselineError::engine(operation, format!("no such container: {id}")))
    }
}

/// Appends the default `latest` tag to untagged references.
fn normalize(reference: &str) -> String {
    let name = reference.rsplit('/').next().unwrap_or(reference);
    if name.contains(':') {
        reference.to_string()
    } else {
        format!("{reference}:latest")
    }
}

/// Scripted in-memory engine.
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<State>,
}

impl FakeEngine {
    /// Creates an engine with no images and no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds an image reference (`repo` or `repo:tag`).
    #[must_use]
    pub fn with_image(self, reference: &str) -> Self {
        self.state().add_image(reference);
        self
    }

    /// Scripts the containers whose name is `test` or starts with `test-`.
    #[must_use]
    pub fn with_script(self, test: &str, script: Script) -> Self {
        let _ = self.state().scripts.insert(test.to_string(), script);
        self
    }

    /// Makes building the image tagged `name` fail.
    #[must_use]
    pub fn with_failing_build(self, name: &str) -> Self {
        let _ = self.state().failing_builds.insert(name.to_string());
        self
    }

    /// Makes removing `reference` fail as if the image were in use.
    #[must_use]
    pub fn with_locked_image(self, reference: &str) -> Self {
        let _ = self.state().locked_images.insert(normalize(reference));
        self
    }

    /// Returns whether `reference` is present.
    #[must_use]
    pub fn has_image(&self, reference: &str) -> bool {
        self.state().images.contains_key(&normalize(reference))
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Counts recorded calls matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Names of every container created so far.
    #[must_use]
    pub fn container_names(&self) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state.containers.values().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn build_image(&self, request: &BuildRequest) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Build {
            name: request.name.clone(),
            no_cache: request.no_cache,
        });
        if state.failing_builds.contains(&request.name) {
            return Err(BaselineError::engine(
                "build",
                format!("build of {} returned a non-zero code", request.name),
            ));
        }
        state.add_image(&request.name);
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let mut state = self.state();
        state.calls.push(Call::ListImages);
        Ok(state
            .images
            .iter()
            .map(|(reference, id)| ImageSummary {
                id: id.clone(),
                repo_tags: vec![reference.clone()],
            })
            .collect())
    }

    async fn remove_image(&self, name: &str) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::RemoveImage(name.to_string()));
        let reference = normalize(name);
        if state.locked_images.contains(&reference) {
            return Err(BaselineError::engine(
                "remove image",
                format!("conflict: unable to remove {name}, image is being used"),
            ));
        }
        state
            .images
            .remove(&reference)
            .map(|_| ())
            .ok_or_else(|| BaselineError::engine("remove image", format!("no such image: {name}")))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let mut state = self.state();
        state.calls.push(Call::Create {
            name: spec.name.clone(),
            image: spec.image.clone(),
        });
        let script = state.script_for(&spec.name);
        if script.fail_create {
            return Err(BaselineError::engine(
                "create container",
                format!("cannot create {}", spec.name),
            ));
        }
        if !state.images.contains_key(&normalize(&spec.image)) {
            return Err(BaselineError::engine(
                "create container",
                format!("no such image: {}", spec.image),
            ));
        }
        let id = ContainerId::generate();
        let _ = state.containers.insert(
            id.clone(),
            FakeContainer {
                name: spec.name.clone(),
                script,
                started: false,
                stopped: false,
                polls_seen: 0,
            },
        );
        Ok(id)
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Start(id.clone()));
        let container = state.container(id, "start container")?;
        if container.script.fail_start {
            return Err(BaselineError::engine(
                "start container",
                format!("cannot start {}", container.name),
            ));
        }
        container.started = true;
        Ok(())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus> {
        let mut state = self.state();
        state.calls.push(Call::Inspect(id.clone()));
        let container = state.container(id, "inspect container")?;
        if !container.started {
            return Ok(ContainerStatus::exited(0));
        }
        if container.stopped {
            return Ok(ContainerStatus::exited(STOPPED_EXIT_CODE));
        }
        container.polls_seen += 1;
        let script = &container.script;
        let status = match script.polls {
            None => ContainerStatus::running(),
            Some(polls) if container.polls_seen <= polls => ContainerStatus::running(),
            Some(_) => ContainerStatus {
                running: script.report_running,
                exit_code: script.exit_code,
            },
        };
        Ok(status)
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Stop(id.clone()));
        state.container(id, "stop container")?.stopped = true;
        Ok(())
    }

    async fn commit_container(
        &self,
        id: &ContainerId,
        repository: &str,
        tag: &str,
    ) -> Result<()> {
        let mut state = self.state();
        let reference = format!("{repository}:{tag}");
        state.calls.push(Call::Commit {
            container: id.clone(),
            reference: reference.clone(),
        });
        let _ = state.container(id, "commit container")?;
        state.add_image(&reference);
        Ok(())
    }

    async fn fetch_logs(&self, id: &ContainerId, timestamps: bool) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.calls.push(Call::Logs(id.clone()));
        let container = state.container(id, "fetch logs")?;
        if container.script.fail_logs {
            return Err(BaselineError::engine("fetch logs", "log driver unavailable"));
        }
        let body = container
            .script
            .logs
            .clone()
            .unwrap_or_else(|| format!("{} finished\n", container.name).into_bytes());
        if timestamps {
            let mut stamped = b"2024-01-01T00:00:00.000000000Z ".to_vec();
            stamped.extend_from_slice(&body);
            Ok(stamped)
        } else {
            Ok(body)
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}
