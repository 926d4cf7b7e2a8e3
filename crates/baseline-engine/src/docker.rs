//! Engine implementation that drives the `docker` command-line client.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::PathBuf;

use async_trait::async_trait;
use baseline_common::error::{BaselineError, Result};
use baseline_common::types::{ContainerId, ContainerStatus, ImageId};
use serde::Deserialize;
use tokio::process::Command;

use crate::engine::ContainerEngine;
use crate::exec;
use crate::request::{BuildRequest, ContainerSpec, ImageSummary, OutputSink};

const DOCKER_BINARY: &str = "docker";

/// Placeholder the engine prints for untagged images.
const NONE_MARKER: &str = "<none>";

/// Engine backed by the `docker` CLI.
///
/// Every operation spawns one `docker` process against the configured
/// endpoint (`-H`).
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
    endpoint: Option<String>,
}

impl DockerCli {
    /// Creates a client for `endpoint`. An empty endpoint defers to the
    /// docker client's own defaults.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let binary = which::which(DOCKER_BINARY).unwrap_or_else(|_| PathBuf::from(DOCKER_BINARY));
        Self {
            binary,
            endpoint: (!endpoint.is_empty()).then_some(endpoint),
        }
    }

    /// Returns the endpoint this client talks to, if one was set.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.binary);
        if let Some(host) = &self.endpoint {
            let _ = cmd.arg("-H").arg(host);
        }
        let _ = cmd.args(args);
        cmd
    }
}

/// One line of `docker image ls --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct ImageLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Repository")]
    repository: String,
    #[serde(rename = "Tag")]
    tag: String,
}

/// The `.State` object of `docker container inspect`.
#[derive(Debug, Deserialize)]
struct StateDoc {
    #[serde(rename = "Running")]
    running: bool,
    #[serde(rename = "ExitCode")]
    exit_code: i64,
}

/// Groups image listing lines by image ID, collecting `repo:tag` pairs.
fn parse_image_lines(raw: &str) -> Result<Vec<ImageSummary>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry: ImageLine = serde_json::from_str(line)?;
        let tags = grouped.entry(entry.id).or_default();
        if entry.repository != NONE_MARKER {
            let tag = if entry.tag == NONE_MARKER {
                entry.repository
            } else {
                format!("{}:{}", entry.repository, entry.tag)
            };
            tags.push(tag);
        }
    }
    Ok(grouped
        .into_iter()
        .map(|(id, repo_tags)| ImageSummary {
            id: ImageId::new(id),
            repo_tags,
        })
        .collect())
}

fn parse_state(raw: &str) -> Result<ContainerStatus> {
    let state: StateDoc = serde_json::from_str(raw.trim())?;
    Ok(ContainerStatus {
        running: state.running,
        exit_code: state.exit_code,
    })
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn build_image(&self, request: &BuildRequest) -> Result<()> {
        let mut args = vec![
            "build".to_string(),
            "--force-rm".to_string(),
            "--tag".to_string(),
            request.name.clone(),
        ];
        if request.no_cache {
            args.push("--no-cache".to_string());
        }
        match request.output {
            OutputSink::Inherit => {
                let mut cmd = self.command(args);
                let _ = cmd.arg(&request.context_dir);
                exec::stream(cmd, "build").await
            }
            OutputSink::Discard => {
                args.push("--quiet".to_string());
                let mut cmd = self.command(args);
                let _ = cmd.arg(&request.context_dir);
                exec::capture(cmd, "build").await.map(|_| ())
            }
        }
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let cmd = self.command(["image", "ls", "--all", "--no-trunc", "--format", "{{json .}}"]);
        let out = exec::capture(cmd, "list images").await?;
        parse_image_lines(&String::from_utf8_lossy(&out.stdout))
    }

    async fn remove_image(&self, name: &str) -> Result<()> {
        let cmd = self.command(["image", "rm", name]);
        exec::capture(cmd, "remove image").await.map(|_| ())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<ContainerId> {
        let mut args = vec!["container".to_string(), "create".to_string()];
        args.extend(["--name".to_string(), spec.name.clone()]);
        if spec.tty {
            args.push("--tty".to_string());
        }
        if let Some(volume) = &spec.volume {
            let path = volume.display();
            args.extend(["--volume".to_string(), format!("{path}:{path}")]);
        }
        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());

        let out = exec::capture(self.command(args), "create container").await?;
        let id = out.stdout_text();
        if id.is_empty() {
            return Err(BaselineError::engine(
                "create container",
                "engine returned no container id",
            ));
        }
        Ok(ContainerId::new(id))
    }

    async fn start_container(&self, id: &ContainerId) -> Result<()> {
        let cmd = self.command(["container", "start", id.as_str()]);
        exec::capture(cmd, "start container").await.map(|_| ())
    }

    async fn inspect_container(&self, id: &ContainerId) -> Result<ContainerStatus> {
        let cmd = self.command([
            "container",
            "inspect",
            "--format",
            "{{json .State}}",
            id.as_str(),
        ]);
        let out = exec::capture(cmd, "inspect container").await?;
        parse_state(&String::from_utf8_lossy(&out.stdout))
    }

    async fn stop_container(&self, id: &ContainerId) -> Result<()> {
        let cmd = self.command(["container", "stop", id.as_str()]);
        exec::capture(cmd, "stop container").await.map(|_| ())
    }

    async fn commit_container(
        &self,
        id: &ContainerId,
        repository: &str,
        tag: &str,
    ) -> Result<()> {
        let reference = format!("{repository}:{tag}");
        let cmd = self.command(["container", "commit", id.as_str(), reference.as_str()]);
        exec::capture(cmd, "commit container").await.map(|_| ())
    }

    async fn fetch_logs(&self, id: &ContainerId, timestamps: bool) -> Result<Vec<u8>> {
        let mut args = vec!["container", "logs"];
        if timestamps {
            args.push("--timestamps");
        }
        args.push(id.as_str());
        let out = exec::capture(self.command(args), "fetch logs").await?;
        let mut log = out.stdout;
        if !out.stderr.is_empty() {
            log.extend_from_slice(out.stderr.as_bytes());
            log.push(b'\n');
        }
        Ok(log)
    }

    fn is_available(&self) -> bool {
        self.binary.is_absolute() && self.binary.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_lines_group_tags_by_id() {
        let raw = r#"
{"ID":"sha256:aaa","Repository":"myapp-build","Tag":"latest"}
{"ID":"sha256:aaa","Repository":"myapp-build","Tag":"v2"}
{"ID":"sha256:bbb","Repository":"myapp-builder","Tag":"latest"}
"#;
        let images = parse_image_lines(raw).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id.as_str(), "sha256:aaa");
        assert_eq!(images[0].repo_tags, vec!["myapp-build:latest", "myapp-build:v2"]);
        assert_eq!(images[1].repo_tags, vec!["myapp-builder:latest"]);
    }

    #[test]
    fn untagged_images_have_no_repo_tags() {
        let raw = r#"{"ID":"sha256:ccc","Repository":"<none>","Tag":"<none>"}"#;
        let images = parse_image_lines(raw).unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].repo_tags.is_empty());
    }

    #[test]
    fn malformed_listing_is_a_serialization_error() {
        let err = parse_image_lines("not json").unwrap_err();
        assert!(matches!(err, BaselineError::Serialization { .. }));
    }

    #[test]
    fn state_document_is_parsed() {
        let status = parse_state(r#"{"Status":"exited","Running":false,"ExitCode":7}"#).unwrap();
        assert_eq!(status, ContainerStatus::exited(7));
    }

    #[test]
    fn empty_endpoint_is_not_passed_through() {
        assert!(DockerCli::new("").endpoint().is_none());
        assert_eq!(
            DockerCli::new("tcp://10.0.0.2:2375").endpoint(),
            Some("tcp://10.0.0.2:2375")
        );
    }
}
