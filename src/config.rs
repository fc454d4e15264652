//! Node configuration
//!
//! Loaded from a YAML file when `COOPNET_CONFIG_FILE` points at one,
//! otherwise from individual environment variables.

use std::env;
use std::fs;
use std::path::Path;

use coopnet_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Deployment topology of this instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Single instance, local-only dispatch
    #[default]
    Standalone,
    /// Multiple instances exchanging signed cross-instance calls
    Federated,
}

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This instance's identifier
    pub instance_did: String,

    /// This instance's handle, e.g. `coop.example`
    pub handle: String,

    /// Public base URL of this instance
    pub public_url: String,

    #[serde(default)]
    pub topology: Topology,

    /// Identifier of the hub, for federated member instances
    #[serde(default)]
    pub hub_did: Option<String>,

    /// Data directory; `:memory:` selects the in-memory store
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Base64 32-byte key sealing secret material at rest
    pub instance_key: String,

    #[serde(default = "default_outbox_poll_secs")]
    pub outbox_poll_secs: u64,

    #[serde(default = "default_outbox_batch")]
    pub outbox_batch: usize,

    #[serde(default = "default_outbox_max_attempts")]
    pub outbox_max_attempts: u32,

    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    #[serde(default = "default_sending_grace_secs")]
    pub sending_grace_secs: u64,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_outbox_poll_secs() -> u64 {
    10
}

fn default_outbox_batch() -> usize {
    20
}

fn default_outbox_max_attempts() -> u32 {
    8
}

fn default_backoff_base_secs() -> u64 {
    30
}

fn default_backoff_max_secs() -> u64 {
    3600
}

fn default_sending_grace_secs() -> u64 {
    120
}

impl NodeConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = env::var("COOPNET_CONFIG_FILE") {
            if Path::new(&path).exists() {
                return Self::from_file(&path);
            }
        }

        let require = |name: &str| {
            env::var(name).map_err(|_| Error::validation(format!("Missing env var {}", name)))
        };

        Ok(Self {
            instance_did: require("COOPNET_INSTANCE_DID")?,
            handle: require("COOPNET_HANDLE")?,
            public_url: require("COOPNET_PUBLIC_URL")?,
            topology: match env::var("COOPNET_TOPOLOGY").as_deref() {
                Ok("federated") => Topology::Federated,
                _ => Topology::Standalone,
            },
            hub_did: env::var("COOPNET_HUB_DID").ok(),
            data_dir: env::var("COOPNET_DATA_DIR").unwrap_or_else(|_| default_data_dir()),
            instance_key: require("COOPNET_INSTANCE_KEY")?,
            outbox_poll_secs: default_outbox_poll_secs(),
            outbox_batch: default_outbox_batch(),
            outbox_max_attempts: default_outbox_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            sending_grace_secs: default_sending_grace_secs(),
        })
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::internal(format!("Failed to read {}: {}", path, e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::deserialization(format!("Invalid config file {}: {}", path, e)))
    }

    /// Decode the instance key
    pub fn instance_key_bytes(&self) -> Result<Vec<u8>> {
        let bytes = base64::decode(&self.instance_key)
            .map_err(|e| Error::validation(format!("Invalid instance key base64: {}", e)))?;
        if bytes.len() != 32 {
            return Err(Error::validation(format!(
                "Instance key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
instance_did: "did:web:coop.example"
handle: "coop.example"
public_url: "https://coop.example"
topology: federated
hub_did: "did:web:hub.example"
instance_key: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA="
"#
    }

    #[test]
    fn test_from_yaml_with_defaults() {
        let config: NodeConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.instance_did, "did:web:coop.example");
        assert_eq!(config.topology, Topology::Federated);
        assert_eq!(config.outbox_poll_secs, 10);
        assert_eq!(config.outbox_max_attempts, 8);
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.instance_key_bytes().unwrap().len(), 32);
    }

    #[test]
    fn test_invalid_instance_key_is_rejected() {
        let mut config: NodeConfig = serde_yaml::from_str(minimal_yaml()).unwrap();
        config.instance_key = "c2hvcnQ=".to_string();
        assert!(config.instance_key_bytes().is_err());
    }
}
