//! Configuration for the metadata root and the orchestrator
//!
//! The metadata root resolution chain (highest priority first):
//! 1. Explicit path (the CLI `--config-dir` flag)
//! 2. `K3D_CONFIG_DIR` environment variable
//! 3. `~/.config/k3d`
//!
//! An optional `config.json` in the root overrides [`OrchestratorConfig`]
//! defaults. It is a file, so it never shows up as a cluster.
//!
//! ```json
//! { "pollIntervalSecs": 5, "namePrefix": "k3d" }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const CONFIG_DIR_ENV: &str = "K3D_CONFIG_DIR";
const CONFIG_FILE_NAME: &str = "config.json";

/// Path inside the server node where k3s writes its kubeconfig
pub const KUBECONFIG_IN_NODE: &str = "/output/kubeconfig.yaml";

/// Default readiness polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Tunables for cluster creation and readiness polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct OrchestratorConfig {
    /// Interval between readiness checks, whole seconds in JSON
    #[serde(rename = "pollIntervalSecs", with = "duration_secs")]
    pub poll_interval: Duration,
    /// Where the server node emits its kubeconfig
    pub kubeconfig_in_node: String,
    /// Prefix for node and network names
    pub name_prefix: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            kubeconfig_in_node: KUBECONFIG_IN_NODE.to_string(),
            name_prefix: "k3d".to_string(),
        }
    }
}

/// Resolve the metadata root using the priority chain.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_DIR_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let home = dirs::home_dir()
        .ok_or_else(|| Error::validation("could not determine home directory"))?;
    Ok(home.join(".config").join("k3d"))
}

/// Load `<root>/config.json`, returning defaults if it is missing.
pub fn load_config(root: &Path) -> Result<OrchestratorConfig> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(OrchestratorConfig::default());
    }
    let data = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let config: OrchestratorConfig = serde_json::from_str(&data)
        .map_err(|e| Error::validation(format!("failed to parse {}: {}", path.display(), e)))?;
    if config.poll_interval.is_zero() {
        return Err(Error::validation(format!(
            "{}: pollIntervalSecs must be at least 1",
            path.display()
        )));
    }
    Ok(config)
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
