//! Rollout error types and terminal status mapping.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cephroll_cluster::ClusterError;
use cephroll_core::{NodeIdentity, OperationKind};
use cephroll_health::HealthError;
use cephroll_state::StateError;

pub type RolloutResult<T> = Result<T, RolloutError>;

#[derive(Debug, Error)]
pub enum RolloutError {
    /// HEALTH_ERR survived the grace retry.
    #[error("cluster is unstable: {}", summary.join("; "))]
    Unstable { summary: Vec<String> },

    #[error("cluster service error: {0}")]
    Service(#[from] ClusterError),

    #[error("hand-off store error: {0}")]
    Handoff(#[from] StateError),

    /// One health wait used its whole step budget.
    #[error("cluster stayed busy for {waited:?} (step timeout {budget:?})")]
    StepDeadlineExceeded { waited: Duration, budget: Duration },

    /// The operation as a whole ran out of time.
    #[error("operation exceeded its deadline after {elapsed:?} (budget {budget:?})")]
    DeadlineExceeded { elapsed: Duration, budget: Duration },

    #[error("cannot resolve {kind} roster: {reason}")]
    RosterUnavailable { kind: OperationKind, reason: String },

    #[error("node {node} is not in roster [{}]", roster.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "))]
    NotInRoster {
        node: NodeIdentity,
        roster: Vec<NodeIdentity>,
    },

    #[error("upgrade of {node} failed: {reason}")]
    UpgradeFailed { node: NodeIdentity, reason: String },

    #[error("no upgrade path from {from} to {to}")]
    InvalidUpgradePath { from: String, to: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<HealthError> for RolloutError {
    fn from(e: HealthError) -> Self {
        match e {
            HealthError::Unstable { summary } => RolloutError::Unstable { summary },
            HealthError::StepTimeout { waited, budget } => {
                RolloutError::StepDeadlineExceeded { waited, budget }
            }
            HealthError::Cluster(e) => RolloutError::Service(e),
        }
    }
}

impl RolloutError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RolloutError::DeadlineExceeded { .. } | RolloutError::StepDeadlineExceeded { .. }
        )
    }
}

/// How an operation ended, as reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TerminalStatus {
    /// Rolling upgrade of this node finished.
    Done,
    /// Reweight reached its target.
    Converged,
    TimedOut,
    Failed(String),
}

impl TerminalStatus {
    /// Map an outcome. `success` is the status reported on `Ok`.
    pub fn from_result<T>(result: &RolloutResult<T>, success: TerminalStatus) -> Self {
        match result {
            Ok(_) => success,
            Err(e) if e.is_timeout() => TerminalStatus::TimedOut,
            Err(e) => TerminalStatus::Failed(e.to_string()),
        }
    }

    /// Process exit code: 0 on success, 1 on failure, 2 on timeout.
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminalStatus::Done | TerminalStatus::Converged => 0,
            TerminalStatus::Failed(_) => 1,
            TerminalStatus::TimedOut => 2,
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Done => f.write_str("done"),
            TerminalStatus::Converged => f.write_str("converged"),
            TerminalStatus::TimedOut => f.write_str("timed out"),
            TerminalStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}
