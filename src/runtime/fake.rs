//! In-memory [`ContainerRuntime`] for stateful tests
//!
//! Keeps a table of nodes and networks, records every call, and lets tests
//! inject failures per node name.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ContainerRuntime, NodeFilter, NodeHandle, NodeStatus, RuntimeError};
use crate::node::NodeSpec;

const FAKE_KUBECONFIG: &str = "apiVersion: v1\nkind: Config\nclusters: []\n";

#[derive(Debug, Clone)]
struct FakeNode {
    labels: BTreeMap<String, String>,
    running: bool,
    copies: u32,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, FakeNode>,
    networks: BTreeSet<String>,
    calls: Vec<String>,
    fail_run: BTreeSet<String>,
    fail_start: BTreeSet<String>,
    fail_stop: BTreeSet<String>,
    fail_soft_remove: BTreeSet<String>,
    fail_remove: BTreeSet<String>,
    kubeconfig_after: HashMap<String, Option<u32>>,
    unavailable: bool,
}

/// Stateful fake runtime.
#[derive(Debug, Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// `run` of this node fails with a pull error.
    pub fn fail_run(&self, node: &str) {
        self.state.lock().fail_run.insert(node.to_string());
    }

    pub fn fail_start(&self, node: &str) {
        self.state.lock().fail_start.insert(node.to_string());
    }

    pub fn fail_stop(&self, node: &str) {
        self.state.lock().fail_stop.insert(node.to_string());
    }

    /// Non-forced removal of this node fails; forced removal works.
    pub fn fail_soft_remove(&self, node: &str) {
        self.state.lock().fail_soft_remove.insert(node.to_string());
    }

    /// Every removal of this node fails.
    pub fn fail_remove(&self, node: &str) {
        self.state.lock().fail_remove.insert(node.to_string());
    }

    /// The node's kubeconfig appears after `attempts` failed copies; `None` never.
    pub fn kubeconfig_after(&self, node: &str, attempts: Option<u32>) {
        self.state
            .lock()
            .kubeconfig_after
            .insert(node.to_string(), attempts);
    }

    /// Every call fails as if the daemon were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Add a node directly, bypassing `run`.
    pub fn insert_node(&self, name: &str, cluster: &str, running: bool) {
        self.state.lock().nodes.insert(
            name.to_string(),
            FakeNode {
                labels: BTreeMap::from([("k3d.cluster".to_string(), cluster.to_string())]),
                running,
                copies: 0,
            },
        );
    }

    pub fn node_names(&self) -> Vec<String> {
        self.state.lock().nodes.keys().cloned().collect()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.state.lock().nodes.contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state
            .lock()
            .nodes
            .get(name)
            .map_or(false, |n| n.running)
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.state.lock().networks.contains(name)
    }

    /// Every call so far, formatted as `op name`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn record(&self, call: String) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.unavailable {
            return Err(RuntimeError::Unavailable(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn version(&self) -> Result<String, RuntimeError> {
        self.record("version".to_string())?;
        Ok("fake-1.0".to_string())
    }

    async fn ensure_network(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("ensure_network {}", name))?;
        self.state.lock().networks.insert(name.to_string());
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("remove_network {}", name))?;
        if self.state.lock().networks.remove(name) {
            Ok(())
        } else {
            Err(RuntimeError::NotFound(name.to_string()))
        }
    }

    async fn run(&self, spec: &NodeSpec) -> Result<NodeHandle, RuntimeError> {
        self.record(format!("run {}", spec.name))?;
        let mut state = self.state.lock();
        if state.fail_run.contains(&spec.name) {
            return Err(RuntimeError::ImagePull(format!(
                "pull access denied for {}",
                spec.image
            )));
        }
        if state.nodes.contains_key(&spec.name) {
            return Err(RuntimeError::AlreadyExists(spec.name.clone()));
        }
        state.nodes.insert(
            spec.name.clone(),
            FakeNode {
                labels: spec.labels.clone(),
                running: true,
                copies: 0,
            },
        );
        Ok(NodeHandle {
            id: format!("id-{}", spec.name),
            name: spec.name.clone(),
        })
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("start {}", name))?;
        let mut state = self.state.lock();
        if state.fail_start.contains(name) {
            return Err(RuntimeError::CommandFailed(format!("cannot start {}", name)));
        }
        let node = state
            .nodes
            .get_mut(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        node.running = true;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("stop {}", name))?;
        let mut state = self.state.lock();
        if state.fail_stop.contains(name) {
            return Err(RuntimeError::CommandFailed(format!("cannot stop {}", name)));
        }
        let node = state
            .nodes
            .get_mut(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        node.running = false;
        Ok(())
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        let op = if force { "remove --force" } else { "remove" };
        self.record(format!("{} {}", op, name))?;
        let mut state = self.state.lock();
        if state.fail_remove.contains(name) || (!force && state.fail_soft_remove.contains(name)) {
            return Err(RuntimeError::InUse(name.to_string()));
        }
        state
            .nodes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))
    }

    async fn copy_out(&self, name: &str, src: &str, dest: &Path) -> Result<(), RuntimeError> {
        self.record(format!("copy_out {}", name))?;
        let mut state = self.state.lock();
        let after = state.kubeconfig_after.get(name).copied().unwrap_or(Some(0));
        let node = state
            .nodes
            .get_mut(name)
            .ok_or_else(|| RuntimeError::NotFound(name.to_string()))?;
        if !node.running {
            return Err(RuntimeError::NotRunning(name.to_string()));
        }
        let ready = match after {
            Some(n) => node.copies >= n,
            None => false,
        };
        node.copies += 1;
        if !ready {
            return Err(RuntimeError::SourceMissing(format!("{}:{}", name, src)));
        }
        std::fs::write(dest, FAKE_KUBECONFIG)
            .map_err(|e| RuntimeError::CommandFailed(e.to_string()))
    }

    async fn list(&self, filter: &NodeFilter) -> Result<Vec<NodeStatus>, RuntimeError> {
        self.record("list".to_string())?;
        let state = self.state.lock();
        Ok(state
            .nodes
            .iter()
            .filter(|(name, node)| filter.matches(name, &node.labels, node.running))
            .map(|(name, node)| NodeStatus {
                name: name.clone(),
                running: node.running,
            })
            .collect())
    }
}
