//! An operator cleans up every cluster at once.

use k3d::{BatchOperation, BatchOperationExecutor, ClusterLifecycleOrchestrator, CreateRequest};

use super::helpers::{unique_name, TestEnv};

/// Story: `delete --all` removes every cluster in the metadata root.
#[tokio::test]
#[ignore]
async fn story_delete_all_clusters() {
    let mut env = TestEnv::new();
    let names: Vec<String> = ["a", "b"]
        .iter()
        .map(|suffix| unique_name(&format!("batch-{}", suffix)))
        .collect();
    for name in &names {
        env.track(name);
    }

    env.run(move |ctx| async move {
        let orchestrator = ClusterLifecycleOrchestrator::new(ctx.clone());
        for (i, name) in names.iter().enumerate() {
            let mut request = CreateRequest::new(name);
            request.api_port = 16450 + i as u16;
            orchestrator.create(&request).await.expect("create failed");
        }

        let executor = BatchOperationExecutor::new(ctx.clone());
        let targets = executor.resolve_targets("", true).unwrap();
        assert_eq!(targets, names);

        let report = executor.apply(BatchOperation::Delete, &targets).await;
        assert!(report.is_success(), "delete failed: {report:?}");
        assert!(ctx.store.list_names().unwrap().is_empty());
    })
    .await;
}
