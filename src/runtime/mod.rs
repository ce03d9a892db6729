//! Container runtime abstraction
//!
//! The orchestrator only ever talks to the runtime through the narrow
//! [`ContainerRuntime`] trait. [`DockerRuntime`] implements it by shelling out
//! to the `docker` CLI; tests use the in-memory fake or the mockall mock.

mod docker;
#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::node::NodeSpec;

pub use docker::DockerRuntime;

/// Errors reported by a container runtime primitive
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime daemon could not be reached
    #[error("runtime unavailable: {0}")]
    Unavailable(String),

    /// A container or network with this name already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// No container or network with this name
    #[error("not found: {0}")]
    NotFound(String),

    /// The image could not be pulled
    #[error("image pull failed: {0}")]
    ImagePull(String),

    /// The container is still in use and cannot be removed
    #[error("in use: {0}")]
    InUse(String),

    /// The container exists but is not running
    #[error("not running: {0}")]
    NotRunning(String),

    /// The file to copy does not exist inside the container
    #[error("source missing: {0}")]
    SourceMissing(String),

    /// Any other failure of the runtime command
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Selects nodes for [`ContainerRuntime::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    /// Only nodes carrying this label with this value
    pub label: Option<(String, String)>,
    /// Only nodes with exactly this name
    pub name: Option<String>,
    /// Only running nodes
    pub running_only: bool,
}

impl NodeFilter {
    /// All nodes (running or not) carrying `key=value`
    pub fn label(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: Some((key.into(), value.into())),
            ..Default::default()
        }
    }

    /// All nodes (running or not) named `name`
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Restrict the filter to running nodes
    pub fn running(mut self) -> Self {
        self.running_only = true;
        self
    }

    /// Whether a node with these attributes passes the filter
    pub fn matches(
        &self,
        name: &str,
        labels: &std::collections::BTreeMap<String, String>,
        running: bool,
    ) -> bool {
        if self.running_only && !running {
            return false;
        }
        if let Some(wanted) = &self.name {
            if wanted != name {
                return false;
            }
        }
        if let Some((key, value)) = &self.label {
            if labels.get(key) != Some(value) {
                return false;
            }
        }
        true
    }
}

/// One node as reported by [`ContainerRuntime::list`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    /// Container name
    pub name: String,
    /// Whether the container is currently running
    pub running: bool,
}

/// Handle returned by [`ContainerRuntime::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    /// Runtime-assigned container id
    pub id: String,
    /// Container name
    pub name: String,
}

/// Primitives the orchestrator needs from a container runtime.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime version string; fails if the runtime is unreachable.
    async fn version(&self) -> Result<String, RuntimeError>;

    /// Create the network if it does not exist yet.
    async fn ensure_network(&self, name: &str) -> Result<(), RuntimeError>;

    /// Remove a network.
    async fn remove_network(&self, name: &str) -> Result<(), RuntimeError>;

    /// Create and start a node.
    async fn run(&self, spec: &NodeSpec) -> Result<NodeHandle, RuntimeError>;

    /// Start a stopped node.
    async fn start(&self, name: &str) -> Result<(), RuntimeError>;

    /// Stop a running node.
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Remove a node; `force` also removes a running node.
    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError>;

    /// Copy `src` from inside the node to `dest` on the host.
    async fn copy_out(&self, name: &str, src: &str, dest: &Path) -> Result<(), RuntimeError>;

    /// Nodes matching `filter`, queried fresh on every call.
    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeStatus>, RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn labels(cluster: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("k3d.cluster".to_string(), cluster.to_string())])
    }

    #[test]
    fn label_filter_matches_running_and_stopped() {
        let filter = NodeFilter::label("k3d.cluster", "dev");
        assert!(filter.matches("a", &labels("dev"), true));
        assert!(filter.matches("a", &labels("dev"), false));
        assert!(!filter.matches("a", &labels("prod"), true));
    }

    #[test]
    fn running_filter_excludes_stopped() {
        let filter = NodeFilter::label("k3d.cluster", "dev").running();
        assert!(!filter.matches("a", &labels("dev"), false));
    }

    #[test]
    fn name_filter_is_exact() {
        let filter = NodeFilter::name("k3d-dev-server");
        assert!(filter.matches("k3d-dev-server", &BTreeMap::new(), false));
        assert!(!filter.matches("k3d-dev-server-2", &BTreeMap::new(), false));
    }
}
