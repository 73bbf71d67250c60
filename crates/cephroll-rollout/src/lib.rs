//! cephroll-rollout: the two control loops.
//!
//! # Components
//!
//! - **`coordinator`**: [`RollingUpgradeCoordinator`], one node at a time
//!   through the sorted roster, handing off via store markers
//! - **`reweight`**: [`SlowReweightController`], stepwise CRUSH weight
//!   changes gated on cluster health
//! - **`error`**: [`RolloutError`] and the [`TerminalStatus`] reported to
//!   operators

pub mod coordinator;
pub mod error;
pub mod reweight;

pub use coordinator::{PredecessorOutcome, RollReport, RollingUpgradeCoordinator};
pub use error::{RolloutError, RolloutResult, TerminalStatus};
pub use reweight::{ReweightPhase, ReweightReport, SlowReweightController};
