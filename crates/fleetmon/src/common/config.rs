use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::common::error::error;
use crate::event::publisher::PublisherConfig;

pub const DEFAULT_SUSPEND_CONFIG_PATH: &str =
    "/etc/parallelcluster/slurm_plugin/parallelcluster_slurm_suspend.toml";

const DEFAULT_CLUSTERMGTD_TIMEOUT_SECS: u64 = 300;

fn default_unknown() -> String {
    "unknown".to_string()
}

fn default_clustermgtd_timeout() -> u64 {
    DEFAULT_CLUSTERMGTD_TIMEOUT_SECS
}

/// Configuration of the suspend program, loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuspendConfig {
    #[serde(default = "default_unknown")]
    pub cluster_name: String,
    #[serde(default = "default_unknown")]
    pub instance_id: String,
    /// Maximum age of the cluster monitor heartbeat, in seconds.
    #[serde(default = "default_clustermgtd_timeout")]
    pub clustermgtd_timeout: u64,
    pub clustermgtd_heartbeat_file_path: PathBuf,
    #[serde(default)]
    pub max_list_size: Option<usize>,
}

impl SuspendConfig {
    pub fn load(path: &Path) -> crate::Result<Self> {
        log::info!("Reading {}", path.display());
        let content = std::fs::read_to_string(path).inspect_err(|e| {
            log::error!(
                "Cannot read suspend program configuration file {}: {e}",
                path.display()
            );
        })?;
        let config = Self::parse(&content)?;
        log::info!("{config:?}");
        Ok(config)
    }

    pub fn parse(content: &str) -> crate::Result<Self> {
        let config: SuspendConfig = toml::from_str(content)?;
        if config.clustermgtd_heartbeat_file_path.as_os_str().is_empty() {
            return error("clustermgtd_heartbeat_file_path must not be empty".to_string());
        }
        if config.max_list_size == Some(0) {
            return error("max_list_size must be larger than zero".to_string());
        }
        Ok(config)
    }

    pub fn clustermgtd_timeout(&self) -> Duration {
        Duration::from_secs(self.clustermgtd_timeout)
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            max_list_size: self.max_list_size,
        }
    }
}
