//! Cluster creation
//!
//! Turns a [`CreateRequest`] into an ordered sequence of runtime calls:
//!
//! 1. Reject names the store already knows
//! 2. Create the metadata directory
//! 3. Ensure the cluster network and generate the join token
//! 4. Run the server node (fatal on failure)
//! 5. Run each worker in order (failures are recorded, not fatal)
//! 6. Optionally wait for the server to produce its kubeconfig
//!
//! Nothing is rolled back. A partially created cluster stays in place and is
//! reported as such; the caller deletes it explicitly if it wants a retry.

use std::path::PathBuf;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::context::ClusterContext;
use crate::kubeconfig::KubeconfigExtractor;
use crate::node::{NodeRole, NodeSpec, PortMapping, VolumeMount};
use crate::poll::{wait_with_timeout, PollError};
use crate::{Error, Result};

/// Default k3s image repository
pub const DEFAULT_IMAGE_REPOSITORY: &str = "docker.io/rancher/k3s";

/// Default k3s version tag
pub const DEFAULT_K3S_VERSION: &str = "v1.29.4-k3s1";

/// Default API server port
pub const DEFAULT_API_PORT: u16 = 6443;

const TOKEN_LENGTH: usize = 20;

/// A validated request to create a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Cluster name
    pub name: String,
    /// Image shared by all nodes
    pub image: String,
    /// Host port mapped to the server's API port
    pub api_port: u16,
    /// Number of worker nodes
    pub workers: usize,
    /// Mounts applied to every node
    pub volumes: Vec<VolumeMount>,
    /// Environment applied to every node
    pub env: Vec<(String, String)>,
    /// Extra arguments appended to `k3s server`
    pub extra_server_args: Vec<String>,
    /// Whether to wait for the server to become ready
    pub wait: bool,
    /// Readiness deadline; `None` or zero waits forever
    pub timeout: Option<Duration>,
}

impl CreateRequest {
    /// Request with defaults: default image, port 6443, no workers, no wait.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: default_image(DEFAULT_K3S_VERSION),
            api_port: DEFAULT_API_PORT,
            workers: 0,
            volumes: Vec::new(),
            env: Vec::new(),
            extra_server_args: Vec::new(),
            wait: false,
            timeout: None,
        }
    }
}

/// Image reference for a k3s version tag
pub fn default_image(version: &str) -> String {
    format!("{}:{}", DEFAULT_IMAGE_REPOSITORY, version)
}

/// A worker that could not be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFailure {
    /// Node name
    pub node: String,
    /// Error message
    pub error: String,
}

/// What `create` produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOutcome {
    /// Cluster name
    pub cluster: String,
    /// Server node name
    pub server: String,
    /// Workers that were created, in order
    pub workers: Vec<String>,
    /// Workers that failed
    pub failed_workers: Vec<NodeFailure>,
    /// Kubeconfig path if readiness was awaited
    pub kubeconfig: Option<PathBuf>,
}

impl CreateOutcome {
    /// Every requested node exists
    pub fn is_complete(&self) -> bool {
        self.failed_workers.is_empty()
    }
}

/// Builds and sequences the nodes of a new cluster.
#[derive(Clone)]
pub struct ClusterLifecycleOrchestrator {
    ctx: ClusterContext,
    extractor: KubeconfigExtractor,
}

impl ClusterLifecycleOrchestrator {
    /// Orchestrator over the given context
    pub fn new(ctx: ClusterContext) -> Self {
        let extractor = KubeconfigExtractor::new(ctx.clone());
        Self { ctx, extractor }
    }

    /// Create a cluster.
    pub async fn create(&self, request: &CreateRequest) -> Result<CreateOutcome> {
        let name = request.name.as_str();
        if request.api_port == 0 {
            return Err(Error::validation("api port must be between 1 and 65535"));
        }
        if self.ctx.store.exists(name)? {
            return Err(Error::AlreadyExists {
                name: name.to_string(),
            });
        }

        info!(cluster = %name, workers = request.workers, "Creating cluster");
        self.ctx.store.ensure(name)?;

        let naming = self.ctx.naming(name);
        let network = naming.network();
        self.ctx
            .runtime
            .ensure_network(&network)
            .await
            .map_err(|e| Error::runtime(&network, "network create", e))?;

        let token = generate_token();

        let server = self.server_spec(request, &token);
        self.ctx
            .runtime
            .run(&server)
            .await
            .map_err(|e| Error::runtime(&server.name, "run", e))?;
        info!(cluster = %name, node = %server.name, "Created server node");

        let mut outcome = CreateOutcome {
            cluster: name.to_string(),
            server: server.name.clone(),
            workers: Vec::new(),
            failed_workers: Vec::new(),
            kubeconfig: None,
        };

        for index in 0..request.workers {
            let worker = self.worker_spec(request, index, &token);
            match self.ctx.runtime.run(&worker).await {
                Ok(_) => {
                    info!(cluster = %name, node = %worker.name, "Created worker node");
                    outcome.workers.push(worker.name);
                }
                Err(e) => {
                    warn!(cluster = %name, node = %worker.name, error = %e, "Failed to create worker node");
                    outcome.failed_workers.push(NodeFailure {
                        node: worker.name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if request.wait {
            outcome.kubeconfig = Some(self.wait_ready(name, request.timeout).await?);
        }

        if outcome.is_complete() {
            info!(cluster = %name, "Created cluster");
        } else {
            warn!(
                cluster = %name,
                failed = outcome.failed_workers.len(),
                "Cluster created with missing workers"
            );
        }
        Ok(outcome)
    }

    /// Poll the server until it has written its kubeconfig.
    pub async fn wait_ready(&self, cluster: &str, timeout: Option<Duration>) -> Result<PathBuf> {
        info!(cluster = %cluster, timeout = ?timeout, "Waiting for server to become ready");
        let description = format!("cluster {} to become ready", cluster);
        let extractor = &self.extractor;
        wait_with_timeout(
            timeout,
            self.ctx.config.poll_interval,
            &description,
            move || extractor.try_extract(cluster),
        )
        .await
        .map_err(|e| match e {
            PollError::Timeout(waited) => Error::ReadinessTimeout {
                cluster: cluster.to_string(),
                waited,
            },
            PollError::Failed(e) => e,
        })
    }

    /// Server node: publishes the API port, emits the kubeconfig and takes the
    /// extra server arguments.
    pub(crate) fn server_spec(&self, request: &CreateRequest, token: &str) -> NodeSpec {
        let naming = self.ctx.naming(&request.name);

        let mut env = request.env.clone();
        env.push((
            "K3S_KUBECONFIG_OUTPUT".to_string(),
            self.ctx.config.kubeconfig_in_node.clone(),
        ));
        env.push(("K3S_TOKEN".to_string(), token.to_string()));

        let mut args = vec![
            "--https-listen-port".to_string(),
            request.api_port.to_string(),
        ];
        args.extend(request.extra_server_args.iter().cloned());

        NodeSpec {
            name: naming.server(),
            role: NodeRole::Server,
            image: request.image.clone(),
            ports: vec![PortMapping {
                host: request.api_port,
                container: request.api_port,
            }],
            volumes: request.volumes.clone(),
            env,
            labels: naming.labels(NodeRole::Server),
            network: Some(naming.network()),
            privileged: true,
            command: "server".to_string(),
            args,
        }
    }

    /// Worker node: joins the server over the cluster network.
    pub(crate) fn worker_spec(
        &self,
        request: &CreateRequest,
        index: usize,
        token: &str,
    ) -> NodeSpec {
        let naming = self.ctx.naming(&request.name);

        let mut env = request.env.clone();
        env.push((
            "K3S_URL".to_string(),
            format!("https://{}:{}", naming.server(), request.api_port),
        ));
        env.push(("K3S_TOKEN".to_string(), token.to_string()));

        NodeSpec {
            name: naming.worker(index),
            role: NodeRole::Worker,
            image: request.image.clone(),
            ports: Vec::new(),
            volumes: request.volumes.clone(),
            env,
            labels: naming.labels(NodeRole::Worker),
            network: Some(naming.network()),
            privileged: true,
            command: "agent".to_string(),
            args: Vec::new(),
        }
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
