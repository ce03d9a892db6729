//! CLI commands

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use k3d::node::VolumeMount;
use k3d::{
    BatchOperation, BatchOperationExecutor, BatchReport, ClusterContext, ClusterDirectoryStore,
    DockerRuntime,
};
use tracing::debug;

use crate::{Error, Result};

pub mod check_tools;
pub mod create;
pub mod format;
pub mod kubeconfig;
pub mod lifecycle;
pub mod list;

/// Extension trait to convert errors with Display to CLI Error::CommandFailed.
pub trait CommandErrorExt<T> {
    /// Convert an error to `Error::CommandFailed` using its Display implementation.
    fn cmd_err(self) -> Result<T>;
}

impl<T, E: Display> CommandErrorExt<T> for std::result::Result<T, E> {
    fn cmd_err(self) -> Result<T> {
        self.map_err(|e| Error::command_failed(e.to_string()))
    }
}

/// Global flags every command needs to reach the runtime and the store
#[derive(Debug, Clone)]
pub struct CliEnv {
    pub config_dir: Option<PathBuf>,
    pub runtime_binary: String,
}

impl CliEnv {
    pub fn runtime(&self) -> DockerRuntime {
        DockerRuntime::with_binary(&self.runtime_binary)
    }

    /// Resolve the metadata root, load `config.json` and wire up the runtime.
    pub fn context(&self) -> Result<ClusterContext> {
        let root = k3d::config::resolve_root(self.config_dir.as_deref())?;
        let config = k3d::config::load_config(&root)?;
        debug!(root = %root.display(), "Using metadata root");

        Ok(
            ClusterContext::new(Arc::new(self.runtime()), ClusterDirectoryStore::new(root))
                .with_config(config),
        )
    }
}

/// Which clusters a batch command applies to
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Name of the cluster
    #[arg(short, long, default_value = k3d::DEFAULT_CLUSTER_NAME)]
    pub name: String,

    /// Apply to every known cluster instead of --name
    #[arg(short, long)]
    pub all: bool,
}

/// Resolve targets and apply `operation` to each.
pub async fn run_batch(
    env: &CliEnv,
    operation: BatchOperation,
    args: &TargetArgs,
) -> Result<BatchReport> {
    let executor = BatchOperationExecutor::new(env.context()?);
    let targets = executor.resolve_targets(&args.name, args.all)?;
    Ok(executor.apply(operation, &targets).await)
}

/// Turn hard failures in a report into an error so the exit code reflects them.
pub fn check_report(report: &BatchReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }
    Err(Error::BatchFailed {
        operation: report.operation.to_string(),
        failed: report
            .hard_failures()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Parse `src:dst`.
pub fn parse_volume(s: &str) -> std::result::Result<VolumeMount, String> {
    match s.split_once(':') {
        Some((src, dst)) if !src.is_empty() && !dst.is_empty() => Ok(VolumeMount::new(src, dst)),
        _ => Err(format!("invalid volume '{}', expected SRC:DST", s)),
    }
}

/// Parse `KEY=VALUE`; the value may itself contain `=`.
pub fn parse_env(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid environment variable '{}', expected KEY=VALUE", s)),
    }
}

/// Parse durations like `90`, `30s`, `5m` or `1h`. A bare number is seconds.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}'", s))?;
    let secs = match unit {
        "s" => value,
        "m" => value.saturating_mul(60),
        "h" => value.saturating_mul(3600),
        _ => return Err(format!("invalid duration unit in '{}', use s, m or h", s)),
    };
    Ok(Duration::from_secs(secs))
}
