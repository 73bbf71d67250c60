//! cephroll-core: shared types for cephroll.
//!
//! Node identities and rosters, hand-off marker keys, weight arithmetic,
//! the injectable [`Clock`], release upgrade paths, and `cephroll.toml`
//! parsing.

pub mod clock;
pub mod config;
pub mod release;
pub mod types;
pub mod weight;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CephrollConfig;
pub use release::UpgradePaths;
pub use types::*;
