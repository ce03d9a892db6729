//! Kubeconfig extraction
//!
//! k3s writes an admin kubeconfig inside the server node. Extraction copies it
//! to `<root>/<cluster>/kubeconfig`, overwriting any previous copy. The file is
//! treated as an opaque artifact and never parsed.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::context::ClusterContext;
use crate::poll::PollResult;
use crate::runtime::{NodeFilter, RuntimeError};
use crate::{Error, Result};

/// File name of the extracted kubeconfig inside the cluster directory
pub const KUBECONFIG_FILE_NAME: &str = "kubeconfig";

/// Copies the access credential out of a cluster's server node.
#[derive(Clone)]
pub struct KubeconfigExtractor {
    ctx: ClusterContext,
}

impl KubeconfigExtractor {
    /// Extractor over the given context
    pub fn new(ctx: ClusterContext) -> Self {
        Self { ctx }
    }

    /// Local path the kubeconfig of `cluster` is copied to
    pub fn destination(&self, cluster: &str) -> Result<PathBuf> {
        Ok(self.ctx.store.path_for(cluster)?.join(KUBECONFIG_FILE_NAME))
    }

    /// Copy the kubeconfig out of the running server node of `cluster`.
    ///
    /// Returns the absolute path of the local copy.
    pub async fn extract(&self, cluster: &str) -> Result<PathBuf> {
        let server = self.ctx.naming(cluster).server();

        let nodes = self
            .ctx
            .runtime
            .list(&NodeFilter::name(&server))
            .await
            .map_err(|e| lift(cluster, e))?;
        let node = nodes
            .into_iter()
            .find(|n| n.name == server)
            .ok_or_else(|| {
                Error::extraction(cluster, format!("server node {} does not exist", server))
            })?;
        if !node.running {
            return Err(Error::extraction(
                cluster,
                format!("server node {} is not running", server),
            ));
        }

        let dest = self.destination(cluster)?;
        self.ctx.store.ensure(cluster)?;
        self.copy(&server, &dest).await.map_err(|e| lift(cluster, e))?;
        info!(cluster = %cluster, path = %dest.display(), "extracted kubeconfig");
        Ok(dest)
    }

    /// One readiness check: try to copy the kubeconfig out.
    ///
    /// `Ok(None)` while the node is still coming up and has not written the
    /// file yet. Any other runtime failure ends polling.
    pub(crate) async fn try_extract(&self, cluster: &str) -> PollResult<PathBuf, Error> {
        let server = self.ctx.naming(cluster).server();
        let dest = self.destination(cluster)?;
        self.ctx.store.ensure(cluster)?;
        match self.copy(&server, &dest).await {
            Ok(()) => Ok(Some(dest)),
            Err(RuntimeError::SourceMissing(msg)) | Err(RuntimeError::NotRunning(msg)) => {
                debug!(cluster = %cluster, reason = %msg, "kubeconfig not available yet");
                Ok(None)
            }
            Err(e) => Err(Error::runtime(server, "copy", e)),
        }
    }

    async fn copy(&self, server: &str, dest: &Path) -> std::result::Result<(), RuntimeError> {
        self.ctx
            .runtime
            .copy_out(server, &self.ctx.config.kubeconfig_in_node, dest)
            .await
    }
}

fn lift(cluster: &str, err: RuntimeError) -> Error {
    match err {
        RuntimeError::Unavailable(msg) => Error::RuntimeUnavailable(msg),
        other => Error::extraction(cluster, other.to_string()),
    }
}
