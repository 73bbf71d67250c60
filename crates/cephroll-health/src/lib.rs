//! cephroll-health: is the cluster safe to disturb?
//!
//! - **`gate`**: [`HealthGate`] classifies live health and blocks callers
//!   while placement groups are moving data
//! - **`status`**: [`check_status`], the monitoring-plugin style verdict over
//!   a full status document
//! - **`patterns`**: the summary-line patterns both of them share

pub mod error;
pub mod gate;
pub mod patterns;
pub mod status;

pub use error::{HealthError, HealthResult};
pub use gate::{HealthGate, HealthState, classify_reading};
pub use status::{StatusThresholds, StatusVerdict, check_status, check_status_file};
