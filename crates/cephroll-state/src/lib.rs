//! cephroll-state: the hand-off store for rolling upgrades.
//!
//! Nodes coordinate only through start/done markers in a shared key-value
//! namespace. This crate defines the [`HandoffStore`] seam and two local
//! backends: an in-memory map and a redb file. The `ceph config-key`
//! backend lives in `cephroll-cluster` next to the rest of the CLI plumbing.
//!
//! Keys follow `{kind}_{node}_{version}_{start|done}`; values are the
//! fractional Unix timestamp at which the marker was written.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::{HandoffStore, MemoryHandoffStore, RedbHandoffStore};
