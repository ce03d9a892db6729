//! `k3d get-kubeconfig` - copy kubeconfigs out and print their paths
//!
//! Paths go to stdout one per line so the output can feed `KUBECONFIG`.

use k3d::BatchOperation;

use super::{check_report, run_batch, CliEnv, TargetArgs};
use crate::Result;

pub async fn run(env: &CliEnv, args: TargetArgs) -> Result<()> {
    let report = run_batch(env, BatchOperation::GetKubeconfig, &args).await?;

    for path in report.kubeconfigs() {
        println!("{}", path.display());
    }

    check_report(&report)
}
