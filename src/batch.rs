//! Batch operations over clusters
//!
//! Start, stop, delete and kubeconfig extraction all follow the same shape:
//! resolve a target set (one name, or every known cluster), then apply the
//! operation to each target in turn. Targets are processed sequentially and
//! in isolation. A failing target is recorded in the [`BatchReport`] and the
//! loop moves on; nothing a single target does can abort the batch.
//!
//! Removal escalates exactly once: a plain remove first, then a forced remove.
//! An unreachable runtime is never escalated. It ends the current target
//! without touching its remaining nodes, and the batch moves on.
//! A cluster's metadata directory is only deleted once all of its nodes are
//! gone, so a cluster that failed to delete stays known and can be retried.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::context::ClusterContext;
use crate::kubeconfig::KubeconfigExtractor;
use crate::node::{NodeNaming, NodeRole};
use crate::runtime::{NodeStatus, RuntimeError};
use crate::store::validate_cluster_name;
use crate::{Error, Result};

/// Operation applied to every target of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchOperation {
    /// Start all nodes, server first
    Start,
    /// Stop all nodes, workers first
    Stop,
    /// Remove all nodes and the metadata directory
    Delete,
    /// Copy the kubeconfig out of the server
    GetKubeconfig,
}

impl BatchOperation {
    /// Command name of the operation
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Start => "start",
            BatchOperation::Stop => "stop",
            BatchOperation::Delete => "delete",
            BatchOperation::GetKubeconfig => "get-kubeconfig",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying an operation to one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TargetOutcome {
    /// The operation completed
    Success {
        /// Extracted kubeconfig, for [`BatchOperation::GetKubeconfig`]
        #[serde(skip_serializing_if = "Option::is_none")]
        kubeconfig: Option<PathBuf>,
    },
    /// The operation completed, but only after escalating to forced removal
    SoftFailure {
        /// What had to be escalated
        message: String,
    },
    /// The operation did not complete for this cluster
    HardFailure {
        /// Why
        error: String,
    },
}

impl TargetOutcome {
    fn success() -> Self {
        TargetOutcome::Success { kubeconfig: None }
    }

    fn hard(error: impl fmt::Display) -> Self {
        TargetOutcome::HardFailure {
            error: error.to_string(),
        }
    }

    /// Whether the target ended in a hard failure
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, TargetOutcome::HardFailure { .. })
    }
}

/// Outcome for one cluster of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetResult {
    /// Cluster name
    pub cluster: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: TargetOutcome,
}

/// Aggregated outcome of a batch, in target order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Operation that was applied
    pub operation: BatchOperation,
    /// One entry per target
    pub results: Vec<TargetResult>,
}

impl BatchReport {
    /// No target ended in a hard failure
    pub fn is_success(&self) -> bool {
        !self.results.iter().any(|r| r.outcome.is_hard_failure())
    }

    /// Names of clusters that hard-failed
    pub fn hard_failures(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| r.outcome.is_hard_failure())
            .map(|r| r.cluster.as_str())
            .collect()
    }

    /// Kubeconfig paths extracted by the batch, in target order
    pub fn kubeconfigs(&self) -> Vec<&PathBuf> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                TargetOutcome::Success {
                    kubeconfig: Some(path),
                } => Some(path),
                _ => None,
            })
            .collect()
    }
}

/// Cluster state derived from its nodes at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusterState {
    /// No nodes exist
    Absent,
    /// Nodes exist but none is running
    Stopped,
    /// Every node is running
    Running,
    /// Some nodes are running
    PartiallyRunning,
    /// The runtime could not be queried
    Unknown,
}

impl ClusterState {
    /// Derive the state from a cluster's nodes
    pub fn from_nodes(nodes: &[NodeStatus]) -> Self {
        let running = nodes.iter().filter(|n| n.running).count();
        match (nodes.len(), running) {
            (0, _) => ClusterState::Absent,
            (_, 0) => ClusterState::Stopped,
            (total, running) if total == running => ClusterState::Running,
            _ => ClusterState::PartiallyRunning,
        }
    }

    /// Whether at least one node is running
    pub fn is_active(&self) -> bool {
        matches!(self, ClusterState::Running | ClusterState::PartiallyRunning)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterState::Absent => "absent",
            ClusterState::Stopped => "stopped",
            ClusterState::Running => "running",
            ClusterState::PartiallyRunning => "partially running",
            ClusterState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One row of `list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    /// Cluster name
    pub name: String,
    /// Derived state
    pub state: ClusterState,
    /// Number of server nodes found
    pub servers: usize,
    /// Number of worker nodes found
    pub workers: usize,
    /// Number of running nodes
    pub running: usize,
}

enum Removal {
    Removed,
    Forced,
    Failed(String),
    Unavailable(Error),
}

/// Applies operations to sets of clusters.
#[derive(Clone)]
pub struct BatchOperationExecutor {
    ctx: ClusterContext,
    extractor: KubeconfigExtractor,
}

impl BatchOperationExecutor {
    /// Executor over the given context
    pub fn new(ctx: ClusterContext) -> Self {
        let extractor = KubeconfigExtractor::new(ctx.clone());
        Self { ctx, extractor }
    }

    /// `{name}` unless `all` is set, in which case every known cluster.
    pub fn resolve_targets(&self, name: &str, all: bool) -> Result<Vec<String>> {
        if !all {
            validate_cluster_name(name)?;
            return Ok(vec![name.to_string()]);
        }
        let names = self.ctx.store.list_names()?;
        if names.is_empty() {
            return Err(Error::NoClustersFound);
        }
        Ok(names)
    }

    /// Apply `operation` to each target, one after another.
    pub async fn apply(&self, operation: BatchOperation, targets: &[String]) -> BatchReport {
        let mut results = Vec::with_capacity(targets.len());

        for cluster in targets {
            let outcome = match operation {
                BatchOperation::Start => self.start_cluster(cluster).await,
                BatchOperation::Stop => self.stop_cluster(cluster).await,
                BatchOperation::Delete => self.delete_cluster(cluster).await,
                BatchOperation::GetKubeconfig => self.kubeconfig(cluster).await,
            };

            match &outcome {
                TargetOutcome::Success { .. } => {}
                TargetOutcome::SoftFailure { message } => {
                    warn!(cluster = %cluster, operation = %operation, "Completed with escalation: {}", message);
                }
                TargetOutcome::HardFailure { error } => {
                    error!(cluster = %cluster, operation = %operation, "FAILURE: {}", error);
                }
            }

            results.push(TargetResult {
                cluster: cluster.clone(),
                outcome,
            });
        }

        BatchReport { operation, results }
    }

    /// State of every known cluster; without `all`, only clusters with a
    /// running node.
    pub async fn survey(&self, all: bool) -> Result<Vec<ClusterSummary>> {
        let mut summaries = Vec::new();

        for name in self.ctx.store.list_names()? {
            let summary = match self.ctx.cluster_nodes(&name).await {
                Ok(nodes) => summarize(&self.ctx.naming(&name), &name, &nodes),
                Err(e) => {
                    warn!(cluster = %name, error = %e, "Failed to query cluster nodes");
                    ClusterSummary {
                        name: name.clone(),
                        state: ClusterState::Unknown,
                        servers: 0,
                        workers: 0,
                        running: 0,
                    }
                }
            };
            if all || summary.state.is_active() {
                summaries.push(summary);
            }
        }

        Ok(summaries)
    }

    async fn start_cluster(&self, cluster: &str) -> TargetOutcome {
        info!(cluster = %cluster, "Starting cluster");
        let nodes = match self.ordered_nodes(cluster, false).await {
            Ok(nodes) => nodes,
            Err(outcome) => return outcome,
        };

        let mut failures = Vec::new();
        for node in &nodes {
            match self.ctx.runtime.start(node).await {
                Ok(()) => {}
                Err(e @ RuntimeError::Unavailable(_)) => {
                    return TargetOutcome::hard(Error::runtime(node, "start", e))
                }
                Err(e) => failures.push(Error::runtime(node, "start", e).to_string()),
            }
        }
        finish(cluster, "started", failures)
    }

    async fn stop_cluster(&self, cluster: &str) -> TargetOutcome {
        info!(cluster = %cluster, "Stopping cluster");
        let nodes = match self.ordered_nodes(cluster, true).await {
            Ok(nodes) => nodes,
            Err(outcome) => return outcome,
        };

        let mut failures = Vec::new();
        for node in &nodes {
            match self.ctx.runtime.stop(node).await {
                Ok(()) => {}
                Err(e @ RuntimeError::Unavailable(_)) => {
                    return TargetOutcome::hard(Error::runtime(node, "stop", e))
                }
                Err(e) => failures.push(Error::runtime(node, "stop", e).to_string()),
            }
        }
        finish(cluster, "stopped", failures)
    }

    async fn delete_cluster(&self, cluster: &str) -> TargetOutcome {
        info!(cluster = %cluster, "Removing cluster");

        let known = match self.ctx.store.exists(cluster) {
            Ok(known) => known,
            Err(e) => return TargetOutcome::hard(e),
        };
        let nodes = match self.ctx.cluster_nodes(cluster).await {
            Ok(nodes) if nodes.is_empty() && !known => {
                return TargetOutcome::hard(Error::NotFound {
                    name: cluster.to_string(),
                })
            }
            Ok(nodes) => self.order(cluster, nodes, true),
            Err(e) => return TargetOutcome::hard(Error::runtime(cluster, "list", e)),
        };

        let mut forced = Vec::new();
        let mut failures = Vec::new();
        for node in &nodes {
            match self.remove_node(node).await {
                Removal::Removed => {}
                Removal::Forced => forced.push(node.clone()),
                Removal::Failed(e) => failures.push(e),
                Removal::Unavailable(e) => return TargetOutcome::hard(e),
            }
        }

        if !failures.is_empty() {
            return TargetOutcome::hard(failures.join("; "));
        }

        let network = self.ctx.naming(cluster).network();
        match self.ctx.runtime.remove_network(&network).await {
            Ok(()) | Err(RuntimeError::NotFound(_)) => {}
            Err(e) => {
                warn!(cluster = %cluster, network = %network, error = %e, "Failed to remove cluster network")
            }
        }

        if let Err(e) = self.ctx.store.remove(cluster) {
            return TargetOutcome::hard(e);
        }

        info!(cluster = %cluster, "SUCCESS: removed cluster");
        if forced.is_empty() {
            TargetOutcome::success()
        } else {
            TargetOutcome::SoftFailure {
                message: format!("force-removed {}", forced.join(", ")),
            }
        }
    }

    async fn kubeconfig(&self, cluster: &str) -> TargetOutcome {
        match self.extractor.extract(cluster).await {
            Ok(path) => TargetOutcome::Success {
                kubeconfig: Some(path),
            },
            Err(e) => TargetOutcome::hard(e),
        }
    }

    /// Soft removal, then forced removal. A node that is already gone counts
    /// as removed. An unreachable runtime is reported as is, without the
    /// forced attempt.
    async fn remove_node(&self, node: &str) -> Removal {
        let soft = match self.ctx.runtime.remove(node, false).await {
            Ok(()) | Err(RuntimeError::NotFound(_)) => return Removal::Removed,
            Err(e @ RuntimeError::Unavailable(_)) => {
                return Removal::Unavailable(Error::runtime(node, "remove", e))
            }
            Err(e) => e,
        };
        warn!(node = %node, error = %soft, "WARNING: couldn't remove node, trying a force remove now");

        match self.ctx.runtime.remove(node, true).await {
            Ok(()) | Err(RuntimeError::NotFound(_)) => Removal::Forced,
            Err(e @ RuntimeError::Unavailable(_)) => {
                Removal::Unavailable(Error::runtime(node, "remove", e))
            }
            Err(e) => Removal::Failed(Error::runtime(node, "remove", e).to_string()),
        }
    }

    /// Node names of `cluster`, server first (or last when `reverse`).
    ///
    /// A cluster without nodes is a hard failure.
    async fn ordered_nodes(
        &self,
        cluster: &str,
        reverse: bool,
    ) -> std::result::Result<Vec<String>, TargetOutcome> {
        let nodes = self
            .ctx
            .cluster_nodes(cluster)
            .await
            .map_err(|e| TargetOutcome::hard(Error::runtime(cluster, "list", e)))?;
        if nodes.is_empty() {
            return Err(TargetOutcome::hard(Error::NotFound {
                name: cluster.to_string(),
            }));
        }
        Ok(self.order(cluster, nodes, reverse))
    }

    fn order(&self, cluster: &str, nodes: Vec<NodeStatus>, reverse: bool) -> Vec<String> {
        let naming = self.ctx.naming(cluster);
        let mut names: Vec<String> = nodes.into_iter().map(|n| n.name).collect();
        names.sort_by_key(|name| node_order(&naming, name));
        if reverse {
            names.reverse();
        }
        names
    }
}

/// Sort key: server, then workers by index, then anything unrecognized.
fn node_order(naming: &NodeNaming<'_>, name: &str) -> (u8, usize, String) {
    match naming.role_of(name) {
        Some(NodeRole::Server) => (0, 0, String::new()),
        Some(NodeRole::Worker) => {
            let index = name
                .rsplit('-')
                .next()
                .and_then(|i| i.parse().ok())
                .unwrap_or(usize::MAX);
            (1, index, String::new())
        }
        None => (2, 0, name.to_string()),
    }
}

fn summarize(naming: &NodeNaming<'_>, name: &str, nodes: &[NodeStatus]) -> ClusterSummary {
    let servers = nodes
        .iter()
        .filter(|n| naming.role_of(&n.name) == Some(NodeRole::Server))
        .count();
    let workers = nodes
        .iter()
        .filter(|n| naming.role_of(&n.name) == Some(NodeRole::Worker))
        .count();
    ClusterSummary {
        name: name.to_string(),
        state: ClusterState::from_nodes(nodes),
        servers,
        workers,
        running: nodes.iter().filter(|n| n.running).count(),
    }
}

fn finish(cluster: &str, done: &str, failures: Vec<String>) -> TargetOutcome {
    if failures.is_empty() {
        info!(cluster = %cluster, "SUCCESS: {} cluster", done);
        TargetOutcome::success()
    } else {
        TargetOutcome::hard(failures.join("; "))
    }
}
