//! `k3d delete`, `k3d stop` and `k3d start`
//!
//! All three share target resolution and reporting; only the operation differs.

use k3d::{BatchOperation, TargetOutcome};

use super::{check_report, run_batch, CliEnv, TargetArgs};
use crate::Result;

pub async fn run(env: &CliEnv, operation: BatchOperation, args: TargetArgs) -> Result<()> {
    let report = run_batch(env, operation, &args).await?;

    for result in &report.results {
        if let TargetOutcome::Success { .. } | TargetOutcome::SoftFailure { .. } = result.outcome {
            println!("{} {}", past_tense(operation), result.cluster);
        }
    }

    check_report(&report)
}

fn past_tense(operation: BatchOperation) -> &'static str {
    match operation {
        BatchOperation::Start => "Started",
        BatchOperation::Stop => "Stopped",
        BatchOperation::Delete => "Deleted",
        BatchOperation::GetKubeconfig => "Extracted kubeconfig of",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmations_read_naturally() {
        assert_eq!(past_tense(BatchOperation::Delete), "Deleted");
        assert_eq!(past_tense(BatchOperation::Stop), "Stopped");
        assert_eq!(past_tense(BatchOperation::Start), "Started");
    }
}
