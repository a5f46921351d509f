//! Cluster layout
//!
//! A [`ClusterLayout`] describes how many nodes of each role to create and
//! which settings to override. Overrides are passed through opaquely as
//! JSON; the harness never interprets them.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use syncwatch_core::{NodeHandle, NodeRole, TopologyConfig};

use crate::error::{BringupError, Result};

/// Nodes to create and the settings they start with
#[derive(Debug, Clone, Default)]
pub struct ClusterLayout {
    pub topology: TopologyConfig,
    /// Chain parameters written into every node's genesis, keyed by a
    /// dotted path
    pub chain_overrides: Vec<(String, Value)>,
    /// Client settings written into a single node's config, by ordinal
    pub node_overrides: BTreeMap<usize, Map<String, Value>>,
}

impl ClusterLayout {
    pub fn new(topology: TopologyConfig) -> Self {
        Self {
            topology,
            ..Default::default()
        }
    }

    /// Override a genesis parameter on every node
    pub fn with_chain_override(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.chain_overrides.push((path.into(), value.into()));
        self
    }

    /// Override a client setting on node `ordinal`
    pub fn with_node_override(
        mut self,
        ordinal: usize,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.node_overrides
            .entry(ordinal)
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn node_count(&self) -> usize {
        self.topology.node_count()
    }

    /// Validators come first, observers after them
    pub fn role_of(&self, ordinal: usize) -> NodeRole {
        if ordinal < self.topology.validators {
            NodeRole::Validator
        } else {
            NodeRole::Observer
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.topology.validators == 0 {
            return Err(BringupError::InvalidLayout(
                "at least one validator is required".to_string(),
            ));
        }
        if self.topology.shards == 0 {
            return Err(BringupError::InvalidLayout(
                "shard count must be positive".to_string(),
            ));
        }
        if let Some(ordinal) = self
            .node_overrides
            .keys()
            .find(|ordinal| **ordinal >= self.node_count())
        {
            return Err(BringupError::InvalidLayout(format!(
                "override for node {} but the cluster has {} nodes",
                ordinal,
                self.node_count()
            )));
        }
        Ok(())
    }
}

/// A prepared node home that has not been launched yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHome {
    pub ordinal: usize,
    pub role: NodeRole,
    pub dir: PathBuf,
    pub addr: SocketAddr,
    pub rpc_addr: SocketAddr,
    pub public_key: String,
}

impl NodeHome {
    /// Handle describing this home once its process is running
    pub fn to_handle(&self) -> NodeHandle {
        NodeHandle::new(
            self.ordinal,
            self.role,
            self.addr,
            self.rpc_addr,
            self.public_key.clone(),
            self.dir.clone(),
        )
    }
}
