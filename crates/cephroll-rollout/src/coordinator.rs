//! Rolling upgrade coordinator: one node at a time, no central scheduler.
//!
//! Every participant sorts the same roster and waits for its immediate
//! predecessor's `done` marker in the hand-off store before upgrading
//! itself. A predecessor that wrote `start` but no `done` within the
//! dead-peer threshold is presumed dead and skipped.

use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info, warn};

use cephroll_cluster::{ClusterInfoClient, NodeUpgradeAction};
use cephroll_core::clock::Clock;
use cephroll_core::config::RollingConfig;
use cephroll_core::{
    HandoffKey, Marker, NodeIdentity, OperationKind, UpgradePaths, format_timestamp,
    roster_position, sorted_roster,
};
use cephroll_health::HealthGate;
use cephroll_state::HandoffStore;

use crate::error::{RolloutError, RolloutResult};

/// How the wait on the predecessor ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredecessorOutcome {
    /// Its `done` marker appeared.
    Finished,
    /// It started but never finished within the dead-peer threshold.
    PresumedDead,
}

/// Outcome of one node's participation in a rolling upgrade.
#[derive(Debug, Clone, Serialize)]
pub struct RollReport {
    pub node: NodeIdentity,
    pub kind: OperationKind,
    pub version: String,
    pub position: usize,
    pub roster: Vec<NodeIdentity>,
    pub predecessor: Option<NodeIdentity>,
    pub predecessor_bypassed: bool,
    /// Timestamp written to the `start` marker.
    pub started_at: f64,
    /// Timestamp written to the `done` marker.
    pub finished_at: f64,
}

pub struct RollingUpgradeCoordinator {
    node: NodeIdentity,
    client: Arc<dyn ClusterInfoClient>,
    store: Arc<dyn HandoffStore>,
    action: Arc<dyn NodeUpgradeAction>,
    clock: Arc<dyn Clock>,
    config: RollingConfig,
    paths: UpgradePaths,
    gate: HealthGate,
}

impl RollingUpgradeCoordinator {
    pub fn new(
        node: NodeIdentity,
        client: Arc<dyn ClusterInfoClient>,
        store: Arc<dyn HandoffStore>,
        action: Arc<dyn NodeUpgradeAction>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gate = HealthGate::new(client.clone(), clock.clone());
        Self {
            node,
            client,
            store,
            action,
            clock,
            config: RollingConfig::default(),
            paths: UpgradePaths::default(),
            gate,
        }
    }

    pub fn with_config(mut self, config: RollingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_upgrade_paths(mut self, paths: UpgradePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Replaces the default gate consulted before the start marker when
    /// `rolling.gate_on_health` is set.
    pub fn with_health_gate(mut self, gate: HealthGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }

    /// Fail unless `from -> to` is a known release upgrade.
    pub fn validate_upgrade(&self, from: &str, to: &str) -> RolloutResult<()> {
        if self.paths.is_valid(from, to) {
            Ok(())
        } else {
            Err(RolloutError::InvalidUpgradePath {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    /// Current sorted roster for `kind`. Never cached.
    pub async fn resolve_roster(&self, kind: OperationKind) -> RolloutResult<Vec<NodeIdentity>> {
        let members = self
            .client
            .roster(kind)
            .await
            .map_err(|e| RolloutError::RosterUnavailable {
                kind,
                reason: e.to_string(),
            })?;
        let roster = sorted_roster(members);
        if roster.is_empty() {
            return Err(RolloutError::RosterUnavailable {
                kind,
                reason: "roster is empty".into(),
            });
        }
        Ok(roster)
    }

    /// Validate the release pair, then roll.
    pub async fn roll_cluster_from(
        &self,
        current_release: &str,
        version: &str,
        kind: OperationKind,
    ) -> RolloutResult<RollReport> {
        self.validate_upgrade(current_release, version)?;
        self.roll_cluster(version, kind).await
    }

    /// Take this node's turn in the cluster-wide rolling upgrade.
    pub async fn roll_cluster(&self, version: &str, kind: OperationKind) -> RolloutResult<RollReport> {
        info!(node = %self.node, %kind, %version, "rolling upgrade requested");

        if kind == OperationKind::Osd && self.config.osd_waits_for_monitors {
            self.wait_for_monitors(version).await?;
        }

        let roster = self.resolve_roster(kind).await?;
        let position =
            roster_position(&roster, &self.node).ok_or_else(|| RolloutError::NotInRoster {
                node: self.node.clone(),
                roster: roster.clone(),
            })?;
        info!(node = %self.node, position, members = roster.len(), "upgrade position");

        let predecessor = position.checked_sub(1).map(|p| roster[p].clone());
        let mut predecessor_bypassed = false;
        if let Some(previous) = &predecessor {
            let outcome = self.wait_on_previous_node(previous, kind, version).await?;
            predecessor_bypassed = outcome == PredecessorOutcome::PresumedDead;
        } else {
            debug!(node = %self.node, "first in roster, not waiting");
        }

        if self.config.gate_on_health {
            let waited = self.gate.wait_until_idle(self.config.health_wait()).await?;
            debug!(node = %self.node, ?waited, "cluster idle, proceeding");
        }

        let key = HandoffKey::new(kind, self.node.clone(), version);
        let started_at = self.clock.epoch_secs();
        self.store
            .put(&key.start_key(), &format_timestamp(started_at))
            .await?;
        info!(node = %self.node, key = %key.start_key(), "start marker written, upgrading");

        self.action
            .upgrade(&self.node, kind, version)
            .await
            .map_err(|e| RolloutError::UpgradeFailed {
                node: self.node.clone(),
                reason: format!("{e:#}"),
            })?;

        let finished_at = self.clock.epoch_secs();
        self.store
            .put(&key.done_key(), &format_timestamp(finished_at))
            .await?;
        info!(
            node = %self.node,
            key = %key.done_key(),
            took_secs = finished_at - started_at,
            "upgrade done"
        );

        Ok(RollReport {
            node: self.node.clone(),
            kind,
            version: version.to_string(),
            position,
            roster,
            predecessor,
            predecessor_bypassed,
            started_at,
            finished_at,
        })
    }

    /// Block until `previous` has finished, or has been running longer than
    /// the dead-peer threshold.
    pub async fn wait_on_previous_node(
        &self,
        previous: &NodeIdentity,
        kind: OperationKind,
        version: &str,
    ) -> RolloutResult<PredecessorOutcome> {
        let key = HandoffKey::new(kind, previous.clone(), version);
        let threshold = self.config.dead_peer_threshold().as_secs_f64();
        info!(node = %self.node, %previous, "waiting on previous node");

        loop {
            if self.store.marker_timestamp(&key, Marker::Done).await?.is_some() {
                info!(node = %self.node, %previous, "previous node finished");
                return Ok(PredecessorOutcome::Finished);
            }

            match self.store.marker_timestamp(&key, Marker::Start).await? {
                Some(started) => {
                    let running = self.clock.epoch_secs() - started;
                    if running > threshold {
                        warn!(
                            node = %self.node,
                            %previous,
                            running_secs = running,
                            "previous node started but never finished, presuming it dead"
                        );
                        return Ok(PredecessorOutcome::PresumedDead);
                    }
                    debug!(%previous, running_secs = running, "previous node still upgrading");
                }
                None => debug!(%previous, "previous node has not started"),
            }

            let pause = self.config.poll.sample();
            debug!(node = %self.node, ?pause, "sleeping before next marker check");
            self.clock.sleep(pause).await;
        }
    }

    /// Wait until every monitor has a `done` marker for `version`.
    pub async fn wait_for_monitors(&self, version: &str) -> RolloutResult<()> {
        let monitors = self.resolve_roster(OperationKind::Mon).await?;
        let budget = self.config.monitor_wait();
        let started: SystemTime = self.clock.now();
        info!(node = %self.node, monitors = monitors.len(), "waiting for monitors to upgrade");

        loop {
            let mut pending = Vec::new();
            for mon in &monitors {
                let key = HandoffKey::new(OperationKind::Mon, mon.clone(), version);
                if !self.store.exists(&key.done_key()).await? {
                    pending.push(mon.as_str());
                }
            }
            if pending.is_empty() {
                info!(node = %self.node, "all monitors upgraded");
                return Ok(());
            }

            let elapsed = self.clock.elapsed_since(started);
            if elapsed > budget {
                return Err(RolloutError::DeadlineExceeded { elapsed, budget });
            }
            debug!(pending = %pending.join(","), "monitors still upgrading");
            self.clock.sleep(self.config.monitor_poll()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cephroll_cluster::{ClusterHealth, ClusterResult, ClusterStatus, PgStats};
    use cephroll_core::{ManualClock, OsdId};
    use cephroll_state::MemoryHandoffStore;

    struct FixedRoster(Vec<&'static str>);

    #[async_trait]
    impl ClusterInfoClient for FixedRoster {
        async fn cluster_health(&self) -> ClusterResult<ClusterHealth> {
            unimplemented!()
        }
        async fn pg_stats(&self) -> ClusterResult<PgStats> {
            unimplemented!()
        }
        async fn osd_weight(&self, _osd: OsdId) -> ClusterResult<f64> {
            unimplemented!()
        }
        async fn set_osd_weight(&self, _osd: OsdId, _weight: f64) -> ClusterResult<bool> {
            unimplemented!()
        }
        async fn roster(&self, _kind: OperationKind) -> ClusterResult<Vec<NodeIdentity>> {
            Ok(self.0.iter().map(|n| NodeIdentity::new(*n)).collect())
        }
        async fn cluster_status(&self) -> ClusterResult<ClusterStatus> {
            unimplemented!()
        }
    }

    struct NoopUpgrade;

    #[async_trait]
    impl NodeUpgradeAction for NoopUpgrade {
        async fn upgrade(&self, _: &NodeIdentity, _: OperationKind, _: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn coordinator(node: &str, roster: Vec<&'static str>) -> RollingUpgradeCoordinator {
        RollingUpgradeCoordinator::new(
            NodeIdentity::new(node),
            Arc::new(FixedRoster(roster)),
            Arc::new(MemoryHandoffStore::new()),
            Arc::new(NoopUpgrade),
            Arc::new(ManualClock::starting_at(1_700_000_000)),
        )
    }

    #[test]
    fn upgrade_path_validation() {
        let c = coordinator("a", vec!["a"]);
        c.validate_upgrade("firefly", "hammer").unwrap();
        c.validate_upgrade("hammer", "jewel").unwrap();
        let err = c.validate_upgrade("firefly", "jewel").unwrap_err();
        assert!(matches!(err, RolloutError::InvalidUpgradePath { .. }));
    }

    #[tokio::test]
    async fn roster_is_sorted_and_deduplicated() {
        let c = coordinator("a", vec!["c", "a", "b", "a"]);
        let roster = c.resolve_roster(OperationKind::Mon).await.unwrap();
        let names: Vec<&str> = roster.iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn invalid_path_writes_nothing() {
        let store = MemoryHandoffStore::new();
        let c = RollingUpgradeCoordinator::new(
            NodeIdentity::new("a"),
            Arc::new(FixedRoster(vec!["a"])),
            Arc::new(store.clone()),
            Arc::new(NoopUpgrade),
            Arc::new(ManualClock::starting_at(0)),
        );
        let err = c
            .roll_cluster_from("firefly", "jewel", OperationKind::Mon)
            .await
            .unwrap_err();
        assert!(matches!(err, RolloutError::InvalidUpgradePath { .. }));
        assert!(store.write_log().is_empty());
    }
}
