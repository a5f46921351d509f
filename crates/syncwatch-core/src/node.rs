//! Node identities as seen by the monitoring side
//!
//! A [`NodeHandle`] is created by cluster bringup and only read afterwards:
//! the monitor needs the RPC address to poll and the identity for
//! diagnostics and boot-node wiring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Role a node plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Produces blocks
    Validator,
    /// Follows the chain without producing blocks
    Observer,
}

impl NodeRole {
    pub fn is_validator(&self) -> bool {
        matches!(self, NodeRole::Validator)
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Validator => write!(f, "validator"),
            NodeRole::Observer => write!(f, "observer"),
        }
    }
}

/// A running node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHandle {
    /// Position in the cluster layout (`test{ordinal}` home)
    pub ordinal: usize,
    pub role: NodeRole,
    /// Peer-to-peer listen address
    pub addr: SocketAddr,
    /// Address of the status/RPC endpoint
    pub rpc_addr: SocketAddr,
    /// Node public key, as written in its key file
    pub public_key: String,
    /// Home directory holding config, keys and chain data
    pub home: PathBuf,
    /// When the process was launched
    pub launched_at: DateTime<Utc>,
}

impl NodeHandle {
    /// Handle for a node launched just now
    pub fn new(
        ordinal: usize,
        role: NodeRole,
        addr: SocketAddr,
        rpc_addr: SocketAddr,
        public_key: impl Into<String>,
        home: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ordinal,
            role,
            addr,
            rpc_addr,
            public_key: public_key.into(),
            home: home.into(),
            launched_at: Utc::now(),
        }
    }

    /// Short name used in logs and errors
    pub fn name(&self) -> String {
        format!("node{}", self.ordinal)
    }

    /// Boot node string other nodes use to join through this one
    pub fn boot_node(&self) -> String {
        format!("{}@{}", self.public_key, self.addr)
    }

    /// Base URL of the status endpoint
    pub fn rpc_url(&self) -> String {
        format!("http://{}", self.rpc_addr)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{} ({}, rpc {})", self.ordinal, self.role, self.rpc_addr)
    }
}
