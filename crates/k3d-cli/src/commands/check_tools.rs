//! `k3d check-tools` - verify the container runtime is usable

use k3d::{ContainerRuntime, RuntimeError};
use tracing::info;

use super::CliEnv;
use crate::{Error, Result};

pub async fn run(env: &CliEnv) -> Result<()> {
    info!("Checking docker...");

    let version = env.runtime().version().await.map_err(|e| match e {
        RuntimeError::Unavailable(msg) => Error::from(k3d::Error::RuntimeUnavailable(msg)),
        other => Error::command_failed(format!("checking docker failed: {}", other)),
    })?;

    println!("SUCCESS: Checking docker succeeded (server version {})", version);
    Ok(())
}
