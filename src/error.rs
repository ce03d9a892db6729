//! Error types for cluster lifecycle operations
//!
//! Every variant that can be raised while acting on a cluster carries the
//! cluster (or node) name so that the caller can report exactly which target
//! and which operation failed.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::runtime::RuntimeError;

/// Main error type for k3d operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bad or missing input, detected before any side effect
    #[error("validation error: {0}")]
    Validation(String),

    /// A cluster with this name is already known
    #[error("cluster already exists: {name}")]
    AlreadyExists {
        /// Name of the existing cluster
        name: String,
    },

    /// The cluster is neither known to the store nor present in the runtime
    #[error("cluster not found: {name}")]
    NotFound {
        /// Name of the missing cluster
        name: String,
    },

    /// `--all` was requested but the store holds no clusters
    #[error("no clusters found")]
    NoClustersFound,

    /// The container runtime could not be reached
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A runtime primitive failed for a specific node
    #[error("{operation} failed for node {node}: {source}")]
    Runtime {
        /// Node the primitive was applied to
        node: String,
        /// Primitive that failed (run, start, stop, remove, ...)
        operation: &'static str,
        /// Underlying runtime error
        #[source]
        source: RuntimeError,
    },

    /// The cluster was materialized but never reported ready
    #[error("cluster {cluster} not ready after {waited:?}")]
    ReadinessTimeout {
        /// Cluster that was waited on
        cluster: String,
        /// How long the readiness check ran
        waited: Duration,
    },

    /// The access credential could not be copied out of the server node
    #[error("failed to extract kubeconfig for cluster {cluster}: {message}")]
    Extraction {
        /// Cluster whose kubeconfig was requested
        cluster: String,
        /// What went wrong
        message: String,
    },

    /// Metadata directory operation failed
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// Path that was being touched
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an extraction error for a cluster
    pub fn extraction(cluster: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            cluster: cluster.into(),
            message: msg.into(),
        }
    }

    /// Wrap an IO error with the path that caused it
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute a runtime error to a node and primitive.
    ///
    /// An unreachable runtime is lifted to [`Error::RuntimeUnavailable`] since it
    /// is fatal for the whole operation rather than for one node.
    pub fn runtime(node: impl Into<String>, operation: &'static str, source: RuntimeError) -> Self {
        match source {
            RuntimeError::Unavailable(msg) => Self::RuntimeUnavailable(msg),
            source => Self::Runtime {
                node: node.into(),
                operation,
                source,
            },
        }
    }
}
