//! Shared handles for cluster operations

use std::sync::Arc;

use crate::config::OrchestratorConfig;
use crate::node::{NodeNaming, CLUSTER_LABEL};
use crate::runtime::{ContainerRuntime, NodeFilter, NodeStatus, RuntimeError};
use crate::store::ClusterDirectoryStore;

/// Runtime, store and tunables shared by the orchestrator, the batch
/// executor and the kubeconfig extractor.
#[derive(Clone)]
pub struct ClusterContext {
    /// Container runtime (trait object for testability)
    pub runtime: Arc<dyn ContainerRuntime>,
    /// Metadata directory store
    pub store: ClusterDirectoryStore,
    /// Naming, paths and polling cadence
    pub config: OrchestratorConfig,
}

impl ClusterContext {
    /// Context with default tunables
    pub fn new(runtime: Arc<dyn ContainerRuntime>, store: ClusterDirectoryStore) -> Self {
        Self {
            runtime,
            store,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the tunables
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Naming scheme for the nodes of `cluster`
    pub fn naming<'a>(&'a self, cluster: &'a str) -> NodeNaming<'a> {
        NodeNaming::new(&self.config.name_prefix, cluster)
    }

    /// All nodes of `cluster`, running or not.
    pub async fn cluster_nodes(&self, cluster: &str) -> Result<Vec<NodeStatus>, RuntimeError> {
        self.runtime
            .list(&NodeFilter::label(CLUSTER_LABEL, cluster))
            .await
    }
}
