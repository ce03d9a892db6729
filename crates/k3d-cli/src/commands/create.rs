//! `k3d create` - create a single- or multi-node cluster

use std::time::Duration;

use clap::Args;
use k3d::node::VolumeMount;
use k3d::orchestrator::{default_image, DEFAULT_API_PORT, DEFAULT_K3S_VERSION};
use k3d::{ClusterLifecycleOrchestrator, CreateRequest};
use tracing::warn;

use super::{parse_duration, parse_env, parse_volume, CliEnv};
use crate::{Error, Result};

/// Create a single- or multi-node k3s cluster
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the cluster
    #[arg(short, long, default_value = k3d::DEFAULT_CLUSTER_NAME)]
    pub name: String,

    /// Mount a host directory into every node (SRC:DST, repeatable)
    #[arg(short, long = "volume", value_name = "SRC:DST", value_parser = parse_volume)]
    pub volumes: Vec<VolumeMount>,

    /// Set an environment variable on every node (KEY=VALUE, repeatable)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env)]
    pub env: Vec<(String, String)>,

    /// Host port mapped to the k3s API server
    #[arg(short, long, env = "K3D_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Full image reference for all nodes (overrides --version)
    #[arg(short, long, env = "K3D_IMAGE")]
    pub image: Option<String>,

    /// k3s version tag of the default image
    #[arg(long, default_value = DEFAULT_K3S_VERSION)]
    pub version: String,

    /// Number of worker nodes
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,

    /// Extra argument for `k3s server` (repeatable)
    #[arg(long = "server-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Wait for the server to write its kubeconfig
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this long (e.g. 60s, 5m; 0 waits forever)
    #[arg(long, requires = "wait", value_parser = parse_duration)]
    pub timeout: Option<Duration>,
}

impl CreateArgs {
    /// Build the core request from the flags.
    pub fn to_request(&self) -> CreateRequest {
        CreateRequest {
            name: self.name.clone(),
            image: self
                .image
                .clone()
                .unwrap_or_else(|| default_image(&self.version)),
            api_port: self.port,
            workers: self.workers,
            volumes: self.volumes.clone(),
            env: self.env.clone(),
            extra_server_args: self.server_args.clone(),
            wait: self.wait,
            timeout: self.timeout,
        }
    }
}

pub async fn run(env: &CliEnv, args: CreateArgs) -> Result<()> {
    let orchestrator = ClusterLifecycleOrchestrator::new(env.context()?);
    let outcome = orchestrator.create(&args.to_request()).await?;

    for failure in &outcome.failed_workers {
        warn!(node = %failure.node, "Worker not created: {}", failure.error);
    }

    println!(
        "Cluster '{}' created. You can now use it like this:\nexport KUBECONFIG=\"$(k3d get-kubeconfig --name='{}')\"\nkubectl cluster-info",
        outcome.cluster, outcome.cluster
    );

    if !outcome.is_complete() {
        let names: Vec<&str> = outcome
            .failed_workers
            .iter()
            .map(|f| f.node.as_str())
            .collect();
        return Err(Error::command_failed(format!(
            "cluster '{}' is missing workers: {}",
            outcome.cluster,
            names.join(", ")
        )));
    }
    Ok(())
}
