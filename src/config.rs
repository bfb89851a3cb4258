//! Configuration types for MirrorFS

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Volume-level settings
    pub volume: VolumeConfig,

    /// Replica backends, in dispatch order
    pub replicas: Vec<ReplicaConfig>,
}

/// Volume configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Volume name
    #[serde(default = "default_volume_name")]
    pub name: String,

    /// Replica preferred for single-replica read operations
    #[serde(default)]
    pub read_replica: Option<String>,
}

fn default_volume_name() -> String {
    "mirror0".to_string()
}

/// One replica backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Stable replica name; index identity within the set derives from it
    pub name: String,

    /// Backend address, consumed by the transport layer
    pub address: String,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate replica list consistency
    pub fn validate(&self) -> Result<()> {
        if self.replicas.is_empty() {
            return Err(Error::Config("at least one replica is required".to_string()));
        }

        for (i, replica) in self.replicas.iter().enumerate() {
            if self.replicas[..i].iter().any(|r| r.name == replica.name) {
                return Err(Error::Config(format!(
                    "duplicate replica name: {}",
                    replica.name
                )));
            }
        }

        if let Some(ref read_replica) = self.volume.read_replica {
            if !self.replicas.iter().any(|r| &r.name == read_replica) {
                return Err(Error::Config(format!(
                    "read replica {} is not in the replica list",
                    read_replica
                )));
            }
        }

        Ok(())
    }
}
