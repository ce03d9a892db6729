//! k3d CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use k3d::BatchOperation;

use commands::{CliEnv, TargetArgs};

/// k3d - Run k3s clusters in Docker containers
#[derive(Parser, Debug)]
#[command(name = "k3d")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding cluster metadata (default: $K3D_CONFIG_DIR or ~/.config/k3d)
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Docker-compatible CLI used to manage nodes
    #[arg(long, global = true, env = "K3D_RUNTIME_BINARY", default_value = "docker")]
    pub runtime_binary: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that docker is installed and the daemon is reachable
    #[command(visible_alias = "ct")]
    CheckTools,
    /// Create a single- or multi-node k3s cluster
    #[command(visible_alias = "c")]
    Create(commands::create::CreateArgs),
    /// Delete a cluster
    #[command(visible_alias = "d")]
    Delete(TargetArgs),
    /// Stop a cluster
    Stop(TargetArgs),
    /// Start a stopped cluster
    Start(TargetArgs),
    /// List clusters
    #[command(visible_aliases = ["ls", "l"])]
    List(commands::list::ListArgs),
    /// Copy the kubeconfig out of a cluster and print its path
    GetKubeconfig(TargetArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        let env = CliEnv {
            config_dir: self.config_dir,
            runtime_binary: self.runtime_binary,
        };
        match self.command {
            Commands::CheckTools => commands::check_tools::run(&env).await,
            Commands::Create(args) => commands::create::run(&env, args).await,
            Commands::Delete(args) => {
                commands::lifecycle::run(&env, BatchOperation::Delete, args).await
            }
            Commands::Stop(args) => {
                commands::lifecycle::run(&env, BatchOperation::Stop, args).await
            }
            Commands::Start(args) => {
                commands::lifecycle::run(&env, BatchOperation::Start, args).await
            }
            Commands::List(args) => commands::list::run(&env, args).await,
            Commands::GetKubeconfig(args) => commands::kubeconfig::run(&env, args).await,
        }
    }
}
