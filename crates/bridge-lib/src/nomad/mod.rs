//! Nomad agent API access
//!
//! The bridge needs three answers from the local Nomad agent: which client
//! node it is, what that node declares and reserves, and which allocations are
//! placed on it.

mod client;


pub use client::{NomadClient, TlsSettings, DEFAULT_NOMAD_ADDR};

use crate::error::{BridgeError, Result};
use crate::models::{Allocation, NodeIdentity, NodeResources};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Queries the bridge issues against the orchestrator
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Agent self-description (`/v1/agent/self`)
    async fn self_info(&self) -> Result<AgentSelf>;

    /// Declared and reserved resources of a node
    async fn node_info(&self, node_id: &str) -> Result<NodeResources>;

    /// Allocations placed on a node, in any state
    async fn node_allocations(&self, node_id: &str) -> Result<Vec<Allocation>>;
}

/// The parts of the agent self-description the bridge reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSelf {
    #[serde(default)]
    pub stats: Value,
    #[serde(default)]
    pub config: Value,
}

impl AgentSelf {
    /// Extract the client node identity
    ///
    /// Requires `stats.client.node_id`, `config.Region` and
    /// `config.Datacenter` as non-empty strings. A missing `stats.client`
    /// means the agent runs in server-only mode.
    pub fn node_identity(&self) -> Result<NodeIdentity> {
        let client = self
            .stats
            .get("client")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                BridgeError::Configuration("Nomad not running in client mode".to_string())
            })?;

        let node_id = client
            .get("node_id")
            .and_then(non_empty_str)
            .ok_or_else(|| BridgeError::Configuration("failed to determine node ID".to_string()))?;

        let region = self
            .config
            .get("Region")
            .and_then(non_empty_str)
            .ok_or_else(|| BridgeError::Configuration("failed to determine region".to_string()))?;

        let datacenter = self
            .config
            .get("Datacenter")
            .and_then(non_empty_str)
            .ok_or_else(|| {
                BridgeError::Configuration("failed to determine datacenter".to_string())
            })?;

        Ok(NodeIdentity {
            node_id: node_id.to_string(),
            region: region.to_string(),
            datacenter: datacenter.to_string(),
        })
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.is_empty())
}
