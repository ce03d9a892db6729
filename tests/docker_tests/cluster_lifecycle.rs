//! A developer creates a cluster, uses it, pauses it and throws it away.

use std::time::Duration;

use k3d::{
    BatchOperation, BatchOperationExecutor, ClusterLifecycleOrchestrator, ClusterState,
    CreateRequest, Error, KubeconfigExtractor,
};

use super::helpers::{unique_name, TestEnv, READY_TIMEOUT};

/// Story: create with one worker, wait, fetch the kubeconfig, stop, start, delete.
#[tokio::test]
#[ignore]
async fn story_full_cluster_lifecycle() {
    let mut env = TestEnv::new();
    let name = unique_name("lifecycle");
    env.track(&name);

    env.run(move |ctx| async move {
        let orchestrator = ClusterLifecycleOrchestrator::new(ctx.clone());
        let executor = BatchOperationExecutor::new(ctx.clone());

        let mut request = CreateRequest::new(&name);
        request.api_port = 16443;
        request.workers = 1;
        request.wait = true;
        request.timeout = Some(READY_TIMEOUT);

        let outcome = orchestrator.create(&request).await.expect("create failed");
        assert!(outcome.is_complete());
        assert_eq!(outcome.workers.len(), 1);
        let kubeconfig = outcome
            .kubeconfig
            .expect("wait should extract the kubeconfig");
        assert!(kubeconfig.exists());

        // A second create with the same name is refused
        let err = orchestrator.create(&request).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));

        let listed = executor.survey(false).await.unwrap();
        let cluster = listed
            .iter()
            .find(|c| c.name == name)
            .expect("cluster not listed");
        assert_eq!(cluster.state, ClusterState::Running);
        assert_eq!(cluster.workers, 1);

        let path = KubeconfigExtractor::new(ctx.clone())
            .extract(&name)
            .await
            .expect("extract failed");
        assert_eq!(path.parent().unwrap(), ctx.store.path_for(&name).unwrap());

        let targets = vec![name.clone()];
        let report = executor.apply(BatchOperation::Stop, &targets).await;
        assert!(report.is_success(), "stop failed: {report:?}");
        let listed = executor.survey(true).await.unwrap();
        let state = listed.iter().find(|c| c.name == name).unwrap().state;
        assert_eq!(state, ClusterState::Stopped);

        let report = executor.apply(BatchOperation::Start, &targets).await;
        assert!(report.is_success(), "start failed: {report:?}");

        let report = executor.apply(BatchOperation::Delete, &targets).await;
        assert!(report.is_success(), "delete failed: {report:?}");
        assert!(!ctx.store.exists(&name).unwrap());
        assert!(ctx.cluster_nodes(&name).await.unwrap().is_empty());
    })
    .await;
}

/// Story: a server that never becomes ready times out but stays listed.
#[tokio::test]
#[ignore]
async fn story_readiness_timeout_keeps_cluster() {
    let mut env = TestEnv::new();
    let name = unique_name("timeout");
    env.track(&name);

    env.run(move |ctx| async move {
        let mut request = CreateRequest::new(&name);
        request.api_port = 16444;
        // k3s exits on an unknown flag, so the kubeconfig never appears
        request.extra_server_args = vec!["--not-a-real-flag".to_string()];
        request.wait = true;
        request.timeout = Some(Duration::from_secs(20));

        let err = ClusterLifecycleOrchestrator::new(ctx.clone())
            .create(&request)
            .await
            .unwrap_err();
        match err {
            Error::ReadinessTimeout { cluster, waited } => {
                assert_eq!(cluster, name);
                assert!(waited >= Duration::from_secs(20));
            }
            other => panic!("expected ReadinessTimeout, got {other:?}"),
        }
        assert!(ctx.store.exists(&name).unwrap());
        assert!(!ctx.cluster_nodes(&name).await.unwrap().is_empty());
    })
    .await;
}
