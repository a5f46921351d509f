//! Syncwatch Cluster - node bringup for sync scenarios
//!
//! This crate prepares and runs the nodes a scenario watches:
//! - [`ClusterLayout`] describes topology and config overrides
//! - [`ClusterBringup`] lays out homes and launches nodes; [`LocalCluster`]
//!   does so with local processes
//! - [`DatasetSeeder`] fills the homes with a large genesis before launch

pub mod bringup;
pub mod error;
pub mod layout;
pub mod local;
pub mod overrides;
pub mod seed;

pub use bringup::ClusterBringup;
pub use error::{BringupError, Result};
pub use layout::{ClusterLayout, NodeHome};
pub use local::LocalCluster;
pub use seed::{DatasetSeeder, DatasetSource, GenesisPopulate};
