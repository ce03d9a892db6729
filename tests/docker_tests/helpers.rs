//! Shared setup for Docker e2e tests

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use k3d::{
    BatchOperation, BatchOperationExecutor, ClusterContext, ClusterDirectoryStore, DockerRuntime,
};

/// How long a k3s server may take to write its kubeconfig
pub const READY_TIMEOUT: Duration = Duration::from_secs(180);

pub struct TestEnv {
    _root: tempfile::TempDir,
    pub ctx: ClusterContext,
    created: Vec<String>,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let ctx = ClusterContext::new(
            Arc::new(DockerRuntime::new()),
            ClusterDirectoryStore::new(root.path()),
        );
        Self {
            _root: root,
            ctx,
            created: Vec::new(),
        }
    }

    /// Remember a cluster so [`run`](Self::run) deletes it once the story ends.
    pub fn track(&mut self, name: &str) {
        self.created.push(name.to_string());
    }

    /// Run `story` on its own task, then delete every tracked cluster.
    ///
    /// Cleanup happens whether the story passes or panics; a panic is
    /// re-raised afterwards so the test still fails.
    pub async fn run<F, Fut>(self, story: F)
    where
        F: FnOnce(ClusterContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let outcome = tokio::spawn(story(self.ctx.clone())).await;

        let executor = BatchOperationExecutor::new(self.ctx.clone());
        executor.apply(BatchOperation::Delete, &self.created).await;

        if let Err(e) = outcome {
            if e.is_panic() {
                std::panic::resume_unwind(e.into_panic());
            }
            panic!("story task did not finish: {e}");
        }
    }
}

/// Unique cluster name so parallel or repeated runs don't collide
pub fn unique_name(prefix: &str) -> String {
    format!("e2e-{}-{}", prefix, std::process::id())
}
