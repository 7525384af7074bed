use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::ConfigError;

#[cfg(test)]
#[path = "./config.tests.rs"]
mod config_tests;

pub const APP_NAME: &str = "mci";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// Namespace sentinel that selects every namespace of a cluster.
pub const ALL_NAMESPACES: &str = "all";

/// Rate limiting policy applied when events are admitted to (or re-admitted into) the queue.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RateLimitConfig {
    /// Items are visible to consumers immediately.
    None,

    /// Every admission is delayed by the same amount of time.
    Fixed {
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },

    /// Admission delay doubles with every retry of the same item.
    Exponential {
        #[serde(rename = "baseDelayMs", default = "default_base_delay_ms")]
        base_delay_ms: u64,
        #[serde(rename = "maxDelayMs", default = "default_max_delay_ms")]
        max_delay_ms: u64,
    },
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::Exponential {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    5
}

fn default_max_delay_ms() -> u64 {
    1_000_000
}

/// Single resource kind to watch within a cluster.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResourceConfig {
    /// Resource kind, e.g. `pods` or `deployments`.
    #[serde(rename = "rType")]
    pub kind: String,

    /// Namespace to watch or `all` for every namespace present at startup.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Retain object snapshots in emitted events.
    #[serde(rename = "objSave", default)]
    pub retain_objects: bool,
}

fn default_namespace() -> String {
    ALL_NAMESPACES.to_owned()
}

/// Cluster connection details and the resources watched in it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMetadata {
    pub cluster_name: String,

    /// Path to the kubeconfig file, the default configuration is inferred if not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,

    /// Kube context to use from the kubeconfig file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub list: Vec<ResourceConfig>,
}

/// Single watch source.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClusterConfig {
    pub metadata: ClusterMetadata,
}

impl ClusterConfig {
    /// Returns cluster name.
    pub fn name(&self) -> &str {
        &self.metadata.cluster_name
    }

    /// Returns resources watched in the cluster.
    pub fn resources(&self) -> &[ResourceConfig] {
        &self.metadata.list
    }
}

/// Application configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// How many times a single item can be put back to the queue after failed processing.
    #[serde(default)]
    pub max_requeue_time: u32,

    /// Deadline for the initial synchronization of all watchers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_timeout_secs: Option<u64>,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

impl Config {
    /// Loads and validates configuration from the YAML file at `path`.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut file = File::open(path).await?;

        let mut config_str = String::new();
        file.read_to_string(&mut config_str).await?;

        let config = Self::from_yaml(&config_str)?;
        tracing::info!(
            "Configuration loaded from {} ({} clusters)",
            path.display(),
            config.clusters.len()
        );

        Ok(config)
    }

    /// Parses and validates configuration from the YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config = serde_yaml::from_str::<Config>(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks if configuration content makes sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clusters.is_empty() {
            return Err(ConfigError::Invalid("no clusters configured".to_owned()));
        }

        let mut names = HashSet::new();
        for cluster in &self.clusters {
            let name = cluster.name();
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid("cluster name cannot be empty".to_owned()));
            }

            if !names.insert(name) {
                return Err(ConfigError::Invalid(format!("duplicated cluster name '{name}'")));
            }

            if cluster.resources().is_empty() {
                return Err(ConfigError::Invalid(format!("cluster '{name}' has no resources to watch")));
            }

            for resource in cluster.resources() {
                let kind = resource.kind.trim();
                if kind.is_empty() {
                    return Err(ConfigError::Invalid(format!("cluster '{name}' has a resource without rType")));
                }

                if kind.eq_ignore_ascii_case(ALL_NAMESPACES) {
                    return Err(ConfigError::Invalid(format!(
                        "cluster '{name}': '{ALL_NAMESPACES}' is not a resource kind"
                    )));
                }
            }
        }

        Ok(())
    }
}
