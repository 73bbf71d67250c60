//! The read/command seam to the cluster service.

use std::sync::Arc;

use async_trait::async_trait;

use cephroll_core::{NodeIdentity, OperationKind, OsdId};

use crate::error::ClusterResult;
use crate::model::{ClusterHealth, ClusterStatus, PgStats};

/// Queries and commands against the authoritative cluster service.
///
/// Nothing here is cached: every call reflects live cluster state.
#[async_trait]
pub trait ClusterInfoClient: Send + Sync {
    /// Overall health plus summary lines.
    async fn cluster_health(&self) -> ClusterResult<ClusterHealth>;

    /// Placement-group counts by state.
    async fn pg_stats(&self) -> ClusterResult<PgStats>;

    /// Current CRUSH weight of an OSD, unrounded.
    async fn osd_weight(&self, osd: OsdId) -> ClusterResult<f64>;

    /// Set an OSD's CRUSH weight. `Ok(false)` means the command ran but its
    /// acknowledgement did not match the expected text, so the outcome is
    /// ambiguous and the caller must re-read the weight.
    async fn set_osd_weight(&self, osd: OsdId, weight: f64) -> ClusterResult<bool>;

    /// Current members for an operation kind, in no particular order.
    async fn roster(&self, kind: OperationKind) -> ClusterResult<Vec<NodeIdentity>>;

    /// Full status document, for the status check.
    async fn cluster_status(&self) -> ClusterResult<ClusterStatus>;
}

#[async_trait]
impl<C: ClusterInfoClient + ?Sized> ClusterInfoClient for Arc<C> {
    async fn cluster_health(&self) -> ClusterResult<ClusterHealth> {
        (**self).cluster_health().await
    }

    async fn pg_stats(&self) -> ClusterResult<PgStats> {
        (**self).pg_stats().await
    }

    async fn osd_weight(&self, osd: OsdId) -> ClusterResult<f64> {
        (**self).osd_weight(osd).await
    }

    async fn set_osd_weight(&self, osd: OsdId, weight: f64) -> ClusterResult<bool> {
        (**self).set_osd_weight(osd, weight).await
    }

    async fn roster(&self, kind: OperationKind) -> ClusterResult<Vec<NodeIdentity>> {
        (**self).roster(kind).await
    }

    async fn cluster_status(&self) -> ClusterResult<ClusterStatus> {
        (**self).cluster_status().await
    }
}
