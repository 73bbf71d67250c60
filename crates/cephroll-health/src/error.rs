//! Health gate error types.

use std::time::Duration;

use thiserror::Error;

use cephroll_cluster::ClusterError;

pub type HealthResult<T> = Result<T, HealthError>;

#[derive(Debug, Error)]
pub enum HealthError {
    /// HEALTH_ERR persisted across the grace retry. Needs an operator.
    #[error("cluster is HEALTH_ERR after grace retry: {}", summary.join("; "))]
    Unstable { summary: Vec<String> },

    /// The cluster stayed busy for the whole wait budget.
    #[error("cluster still busy after {waited:?} (step timeout {budget:?})")]
    StepTimeout { waited: Duration, budget: Duration },

    #[error("cluster query failed: {0}")]
    Cluster(#[from] ClusterError),
}
