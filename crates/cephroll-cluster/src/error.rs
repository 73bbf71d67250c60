//! Cluster service error types.

use thiserror::Error;

/// Result type alias for cluster service calls.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors from querying or commanding the cluster service.
///
/// Every variant is fatal to the calling operation: acting on missing or
/// garbled cluster state is never safe.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {code:?}: {stderr}")]
    Exit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("unparseable output from `{command}`: {reason}")]
    Parse { command: String, reason: String },

    #[error("{0} not found in osd tree")]
    OsdNotFound(String),

    #[error("unknown overall health status: {0}")]
    UnknownStatus(String),
}
