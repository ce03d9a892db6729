//! `k3d list` - show known clusters and their state

use clap::{Args, ValueEnum};
use k3d::{BatchOperationExecutor, ClusterSummary};

use super::format::print_table;
use super::{CliEnv, CommandErrorExt};
use crate::Result;

/// List clusters
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Also show clusters without running nodes
    #[arg(short, long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Columnar table (default)
    #[default]
    Table,
    /// JSON
    Json,
}

pub async fn run(env: &CliEnv, args: ListArgs) -> Result<()> {
    let executor = BatchOperationExecutor::new(env.context()?);
    let clusters = executor.survey(args.all).await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&clusters).cmd_err()?),
        OutputFormat::Table if clusters.is_empty() => println!("No clusters found."),
        OutputFormat::Table => print_table(HEADERS, &rows(&clusters)),
    }

    Ok(())
}

const HEADERS: &[&str] = &["NAME", "STATE", "SERVERS", "WORKERS", "RUNNING"];

fn rows(clusters: &[ClusterSummary]) -> Vec<Vec<String>> {
    clusters
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.state.to_string(),
                c.servers.to_string(),
                c.workers.to_string(),
                format!("{}/{}", c.running, c.servers + c.workers),
            ]
        })
        .collect()
}
