//! Node Configuration
//!
//! Loaded from a JSON file and optionally overridden from the command line.
//!
//! ```json
//! {
//!   "node_name": "node-a",
//!   "bind_addr": "127.0.0.1:7000",
//!   "protocol_version": 2,
//!   "quorum": { "read_quorum": 1, "write_quorum": "majority" },
//!   "peers": [{ "name": "node-b", "http_addr": "127.0.0.1:7001" }]
//! }
//! ```

use crate::quorum::QuorumPolicy;
use crate::task::CURRENT_PROTOCOL;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

fn default_database() -> String {
    "records".to_string()
}

fn default_protocol() -> u32 {
    CURRENT_PROTOCOL
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub name: String,
    pub http_addr: SocketAddr,
    /// Protocol the peer is expected to speak until it advertises its own.
    #[serde(default = "default_protocol")]
    pub protocol_version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_name: String,
    pub bind_addr: SocketAddr,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_protocol")]
    pub protocol_version: u32,
    #[serde(default)]
    pub quorum: QuorumPolicy,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl NodeConfig {
    /// Single-node configuration with defaults everywhere.
    pub fn local(node_name: &str, bind_addr: SocketAddr) -> Self {
        Self {
            node_name: node_name.to_string(),
            bind_addr,
            database: default_database(),
            protocol_version: default_protocol(),
            quorum: QuorumPolicy::default(),
            peers: Vec::new(),
            log_level: default_log_level(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid node configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let supported = 1..=CURRENT_PROTOCOL;
        if !supported.contains(&self.protocol_version) {
            anyhow::bail!(
                "Protocol v{} is not supported (1..={})",
                self.protocol_version,
                CURRENT_PROTOCOL
            );
        }

        let mut names = HashSet::new();
        names.insert(self.node_name.as_str());
        for peer in &self.peers {
            if !names.insert(peer.name.as_str()) {
                anyhow::bail!("Duplicate node name '{}'", peer.name);
            }
            if !supported.contains(&peer.protocol_version) {
                anyhow::bail!(
                    "Peer {} uses unsupported protocol v{}",
                    peer.name,
                    peer.protocol_version
                );
            }
        }

        Ok(())
    }

    /// This node followed by its peers.
    pub fn replica_names(&self) -> Vec<String> {
        std::iter::once(self.node_name.clone())
            .chain(self.peers.iter().map(|peer| peer.name.clone()))
            .collect()
    }
}
