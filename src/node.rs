//! Cluster nodes: roles, naming and container specifications
//!
//! Node names are derived from the cluster name, role and index so that the
//! membership of a cluster can be rebuilt from the runtime alone:
//!
//! ```text
//! k3d-<cluster>-server
//! k3d-<cluster>-worker-0
//! k3d-<cluster>-worker-1
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Label carrying the owning cluster name
pub const CLUSTER_LABEL: &str = "k3d.cluster";

/// Label carrying the node role
pub const ROLE_LABEL: &str = "k3d.role";

/// Role of a node within its cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Runs the control plane and exposes the API port
    Server,
    /// Runs the agent and joins the server
    Worker,
}

impl NodeRole {
    /// Lowercase name used in node names and labels
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Server => "server",
            NodeRole::Worker => "worker",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds node and network names for one cluster.
#[derive(Debug, Clone)]
pub struct NodeNaming<'a> {
    prefix: &'a str,
    cluster: &'a str,
}

impl<'a> NodeNaming<'a> {
    /// Naming scheme for `cluster` under `prefix` (normally `k3d`)
    pub fn new(prefix: &'a str, cluster: &'a str) -> Self {
        Self { prefix, cluster }
    }

    /// Name of the single server node
    pub fn server(&self) -> String {
        format!("{}-{}-server", self.prefix, self.cluster)
    }

    /// Name of the worker node at `index`
    pub fn worker(&self, index: usize) -> String {
        format!("{}-{}-worker-{}", self.prefix, self.cluster, index)
    }

    /// Name of the per-cluster network
    pub fn network(&self) -> String {
        format!("{}-{}", self.prefix, self.cluster)
    }

    /// Labels attached to every node of the cluster with the given role
    pub fn labels(&self, role: NodeRole) -> BTreeMap<String, String> {
        BTreeMap::from([
            (CLUSTER_LABEL.to_string(), self.cluster.to_string()),
            (ROLE_LABEL.to_string(), role.as_str().to_string()),
        ])
    }

    /// Role of a node of this cluster, recovered from its name
    pub fn role_of(&self, node: &str) -> Option<NodeRole> {
        if node == self.server() {
            return Some(NodeRole::Server);
        }
        let worker_prefix = format!("{}-{}-worker-", self.prefix, self.cluster);
        node.strip_prefix(&worker_prefix)
            .filter(|index| index.parse::<usize>().is_ok())
            .map(|_| NodeRole::Worker)
    }
}

/// A host directory mounted into every node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Path on the host
    pub host_path: String,
    /// Path inside the node
    pub container_path: String,
}

impl VolumeMount {
    /// Mount `host_path` at `container_path`
    pub fn new(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path, self.container_path)
    }
}

/// A published port, host side and node side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Port on the host
    pub host: u16,
    /// Port inside the node
    pub container: u16,
}

/// Everything the runtime needs to create and start one node.
///
/// Built fresh for every node; nothing is shared or mutated between nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Container name
    pub name: String,
    /// Role within the cluster
    pub role: NodeRole,
    /// Image reference
    pub image: String,
    /// Published ports (server only)
    pub ports: Vec<PortMapping>,
    /// Bind mounts
    pub volumes: Vec<VolumeMount>,
    /// Environment variables, in insertion order
    pub env: Vec<(String, String)>,
    /// Labels used to rediscover cluster membership
    pub labels: BTreeMap<String, String>,
    /// Network to attach to
    pub network: Option<String>,
    /// Whether the container runs privileged
    pub privileged: bool,
    /// k3s subcommand (`server` or `agent`)
    pub command: String,
    /// Arguments following the subcommand
    pub args: Vec<String>,
}
