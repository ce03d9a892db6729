//! Docker-backed [`ContainerRuntime`]
//!
//! Each primitive is one `docker` CLI invocation. The argument vector is built
//! from scratch per call, and the command's stderr is classified into
//! [`RuntimeError`] variants so callers can tell a missing container from an
//! unreachable daemon.

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ContainerRuntime, NodeFilter, NodeHandle, NodeStatus, RuntimeError};
use crate::node::NodeSpec;

const DOCKER: &str = "docker";

/// Runtime adapter that drives the host's `docker` CLI.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    binary: String,
}

impl Default for DockerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerRuntime {
    /// Use `docker` from `PATH`
    pub fn new() -> Self {
        Self {
            binary: DOCKER.to_string(),
        }
    }

    /// Use a specific docker-compatible binary (e.g. `podman`)
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn exec(&self, args: &[String]) -> Result<String, RuntimeError> {
        debug!(command = ?args, "running {}", self.binary);

        let output: Output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    RuntimeError::Unavailable(format!("{} not found in PATH", self.binary))
                }
                _ => RuntimeError::CommandFailed(format!("failed to spawn {}: {}", self.binary, e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_stderr(stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn version(&self) -> Result<String, RuntimeError> {
        let out = self
            .exec(&strings(["version", "--format", "{{.Server.Version}}"]))
            .await?;
        Ok(out.trim().to_string())
    }

    async fn ensure_network(&self, name: &str) -> Result<(), RuntimeError> {
        if self
            .exec(&strings(["network", "inspect", name]))
            .await
            .is_ok()
        {
            return Ok(());
        }
        match self.exec(&strings(["network", "create", name])).await {
            Ok(_) | Err(RuntimeError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn remove_network(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&strings(["network", "rm", name])).await.map(|_| ())
    }

    async fn run(&self, spec: &NodeSpec) -> Result<NodeHandle, RuntimeError> {
        let id = self.exec(&run_args(spec)).await?;
        Ok(NodeHandle {
            id: id.trim().to_string(),
            name: spec.name.clone(),
        })
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&strings(["start", name])).await.map(|_| ())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.exec(&strings(["stop", name])).await.map(|_| ())
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        self.exec(&remove_args(name, force)).await.map(|_| ())
    }

    async fn copy_out(&self, name: &str, src: &str, dest: &Path) -> Result<(), RuntimeError> {
        let args = vec![
            "cp".to_string(),
            format!("{}:{}", name, src),
            dest.to_string_lossy().into_owned(),
        ];
        self.exec(&args).await.map(|_| ())
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeStatus>, RuntimeError> {
        let out = self.exec(&list_args(filter)).await?;
        Ok(parse_ps_output(&out, filter))
    }
}

fn strings<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// `docker run` arguments for a node.
pub(crate) fn run_args(spec: &NodeSpec) -> Vec<String> {
    let mut args = strings(["run", "--detach", "--name"]);
    args.push(spec.name.clone());

    for (key, value) in &spec.labels {
        args.push("--label".to_string());
        args.push(format!("{}={}", key, value));
    }
    for (key, value) in &spec.env {
        args.push("--env".to_string());
        args.push(format!("{}={}", key, value));
    }
    for port in &spec.ports {
        args.push("--publish".to_string());
        args.push(format!("{}:{}", port.host, port.container));
    }
    for volume in &spec.volumes {
        args.push("--volume".to_string());
        args.push(volume.to_string());
    }
    if let Some(network) = &spec.network {
        args.push("--network".to_string());
        args.push(network.clone());
    }
    if spec.privileged {
        args.push("--privileged".to_string());
    }

    args.push(spec.image.clone());
    args.push(spec.command.clone());
    args.extend(spec.args.iter().cloned());
    args
}

/// `docker rm` arguments, with `--force` for the escalated attempt.
pub(crate) fn remove_args(name: &str, force: bool) -> Vec<String> {
    let mut args = vec!["rm".to_string()];
    if force {
        args.push("--force".to_string());
    }
    args.push(name.to_string());
    args
}

/// `docker ps` arguments for a filter.
pub(crate) fn list_args(filter: &NodeFilter) -> Vec<String> {
    let mut args = vec!["ps".to_string()];
    if !filter.running_only {
        args.push("--all".to_string());
    }
    if let Some((key, value)) = &filter.label {
        args.push("--filter".to_string());
        args.push(format!("label={}={}", key, value));
    }
    if let Some(name) = &filter.name {
        args.push("--filter".to_string());
        args.push(format!("name=^{}$", name));
    }
    args.push("--format".to_string());
    args.push("{{.Names}}\t{{.State}}".to_string());
    args
}

/// Parse `docker ps` output in `{{.Names}}\t{{.State}}` format.
///
/// The name filter on the docker side is a regex, so exact matching is
/// re-applied here.
pub(crate) fn parse_ps_output(out: &str, filter: &NodeFilter) -> Vec<NodeStatus> {
    out.lines()
        .filter_map(|line| {
            let mut parts = line.trim().splitn(2, '\t');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let running = parts.next().map(str::trim) == Some("running");
            Some(NodeStatus {
                name: name.to_string(),
                running,
            })
        })
        .filter(|node| filter.name.as_deref().map_or(true, |n| n == node.name))
        .filter(|node| !filter.running_only || node.running)
        .collect()
}

/// Map docker stderr onto a [`RuntimeError`] variant.
pub(crate) fn classify_stderr(stderr: &str) -> RuntimeError {
    let msg = stderr.to_string();
    let lower = stderr.to_lowercase();

    if lower.contains("cannot connect to the docker daemon")
        || lower.contains("is the docker daemon running")
        || lower.contains("error during connect")
    {
        RuntimeError::Unavailable(msg)
    } else if lower.contains("could not find the file")
        || lower.contains("no such container:path")
    {
        RuntimeError::SourceMissing(msg)
    } else if lower.contains("no such container")
        || lower.contains("no such network")
        || (lower.contains("not found") && !lower.contains("manifest"))
    {
        RuntimeError::NotFound(msg)
    } else if lower.contains("is already in use") || lower.contains("already exists") {
        RuntimeError::AlreadyExists(msg)
    } else if lower.contains("pull access denied")
        || lower.contains("manifest unknown")
        || lower.contains("manifest for")
        || lower.contains("unable to find image")
    {
        RuntimeError::ImagePull(msg)
    } else if lower.contains("stop the container before")
        || lower.contains("removal of container")
        || lower.contains("has active endpoints")
    {
        RuntimeError::InUse(msg)
    } else if lower.contains("is not running") {
        RuntimeError::NotRunning(msg)
    } else {
        RuntimeError::CommandFailed(msg)
    }
}
