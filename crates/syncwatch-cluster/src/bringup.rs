//! Cluster bringup interface
//!
//! Bringup is split in two so a dataset can be seeded into the node homes
//! before any process starts: [`ClusterBringup::init`] lays out the homes,
//! [`ClusterBringup::launch`] starts one node.

use async_trait::async_trait;

use syncwatch_core::{NodeHandle, NodeRole};

use crate::error::{BringupError, Result};
use crate::layout::{ClusterLayout, NodeHome};

/// Creates, starts and tears down the nodes of a scenario
#[async_trait]
pub trait ClusterBringup: Send {
    /// Lay out one home per node with the layout's overrides applied
    async fn init(&mut self, layout: &ClusterLayout) -> Result<Vec<NodeHome>>;

    /// Start the node living in `home`, joining through `boot` if given
    async fn launch(&mut self, home: &NodeHome, boot: Option<&NodeHandle>) -> Result<NodeHandle>;

    /// Start an observer that joins through `leader`
    async fn add_observer(&mut self, home: &NodeHome, leader: &NodeHandle) -> Result<NodeHandle> {
        if home.role != NodeRole::Observer {
            return Err(BringupError::UnexpectedRole {
                ordinal: home.ordinal,
                expected: NodeRole::Observer,
                actual: home.role,
            });
        }
        self.launch(home, Some(leader)).await
    }

    /// Stop every node this bringup launched
    async fn shutdown(&mut self) -> Result<()>;
}
