//! k3d - run k3s clusters as containers
//!
//! Every cluster is one server node and zero or more worker nodes, each a
//! container in the local container runtime. Cluster identity on the host is a
//! directory under the k3d root (`~/.config/k3d/<name>` by default), which also
//! holds the extracted kubeconfig.
//!
//! # Modules
//!
//! - [`store`] - Per-cluster metadata directories
//! - [`runtime`] - Container runtime abstraction and the Docker CLI adapter
//! - [`orchestrator`] - Cluster creation and readiness
//! - [`batch`] - Start, stop, delete and kubeconfig over target sets
//! - [`kubeconfig`] - Copying the kubeconfig out of the server node
//! - [`config`] - Root directory resolution and tunables
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod kubeconfig;
pub mod node;
pub mod orchestrator;
pub mod poll;
pub mod runtime;
pub mod store;

pub use batch::{
    BatchOperation, BatchOperationExecutor, BatchReport, ClusterState, ClusterSummary,
    TargetOutcome, TargetResult,
};
pub use context::ClusterContext;
pub use error::Error;
pub use kubeconfig::KubeconfigExtractor;
pub use orchestrator::{ClusterLifecycleOrchestrator, CreateOutcome, CreateRequest};
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
pub use store::ClusterDirectoryStore;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default cluster name, used when `--name` is not given
pub const DEFAULT_CLUSTER_NAME: &str = "k3s_default";
