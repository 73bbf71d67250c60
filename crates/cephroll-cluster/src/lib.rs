//! cephroll-cluster: access to the storage cluster service.
//!
//! # Components
//!
//! - **`client`**: [`ClusterInfoClient`], the seam every control loop reads
//!   health, PG states, weights and rosters through
//! - **`ceph`**: [`CephCli`], the `ceph` CLI implementation of that seam
//! - **`model`**: response types and pure JSON parsers
//! - **`config_key`**: [`ConfigKeyStore`], hand-off markers in the
//!   monitors' config-key store
//! - **`upgrade`**: [`NodeUpgradeAction`] and a command-running action

pub mod ceph;
pub mod client;
pub mod config_key;
pub mod error;
pub mod model;
pub mod upgrade;

pub use ceph::{CephCli, CommandOutput};
pub use client::ClusterInfoClient;
pub use config_key::ConfigKeyStore;
pub use error::{ClusterError, ClusterResult};
pub use model::{
    ClusterHealth, ClusterStatus, OverallStatus, PgMapRatios, PgStateCount, PgStats, StatusHealth,
};
pub use upgrade::{CommandUpgradeAction, NodeUpgradeAction};
