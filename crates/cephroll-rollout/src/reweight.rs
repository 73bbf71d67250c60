//! Slow OSD reweighting.
//!
//! Moves one OSD's CRUSH weight toward a target in bounded steps, waiting
//! for the cluster to stop moving data before each step. The weight read
//! back from the cluster after every command drives the next decision; the
//! locally computed value is never trusted.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use cephroll_cluster::ClusterInfoClient;
use cephroll_core::OsdId;
use cephroll_core::clock::Clock;
use cephroll_core::config::ReweightConfig;
use cephroll_core::weight::{next_weight, round3, weights_equal};
use cephroll_health::HealthGate;

use crate::error::{RolloutError, RolloutResult};

/// Where the controller is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReweightPhase {
    Idle,
    WaitingForHealth,
    Stepping,
    Converged,
    TimedOut,
    Failed,
}

impl fmt::Display for ReweightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReweightPhase::Idle => "idle",
            ReweightPhase::WaitingForHealth => "waiting-for-health",
            ReweightPhase::Stepping => "stepping",
            ReweightPhase::Converged => "converged",
            ReweightPhase::TimedOut => "timed-out",
            ReweightPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReweightReport {
    pub osd: OsdId,
    pub target: f64,
    /// Weight-change commands sent to the cluster.
    pub commands_issued: u32,
    /// Every weight read from the cluster, starting with the initial one.
    pub path: Vec<f64>,
    pub phase: ReweightPhase,
    pub elapsed: Duration,
}

pub struct SlowReweightController {
    client: Arc<dyn ClusterInfoClient>,
    gate: HealthGate,
    clock: Arc<dyn Clock>,
    settle: Duration,
}

impl SlowReweightController {
    pub fn new(client: Arc<dyn ClusterInfoClient>, clock: Arc<dyn Clock>) -> Self {
        let gate = HealthGate::new(client.clone(), clock.clone());
        Self {
            client,
            gate,
            clock,
            settle: ReweightConfig::default().settle(),
        }
    }

    pub fn with_gate(mut self, gate: HealthGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_config(mut self, config: &ReweightConfig) -> Self {
        self.settle = config.settle();
        self
    }

    fn enter(&self, osd: OsdId, phase: &mut ReweightPhase, next: ReweightPhase) {
        if *phase != next {
            debug!(%osd, from = %phase, to = %next, "reweight phase");
            *phase = next;
        }
    }

    /// Drive `osd` to `target` in steps of at most `step`.
    ///
    /// `timeout` bounds the whole operation; `step_timeout` bounds each wait
    /// for the cluster to go idle. Applied weights are left in place on
    /// failure, so re-running resumes from wherever the cluster is.
    pub async fn reweight_slowly(
        &self,
        osd: OsdId,
        target: f64,
        step: f64,
        timeout: Duration,
        step_timeout: Duration,
    ) -> RolloutResult<ReweightReport> {
        if !step.is_finite() || step <= 0.0 {
            return Err(RolloutError::InvalidArgument(format!(
                "step size must be a positive number, got {step}"
            )));
        }
        if round3(step) == 0.0 {
            return Err(RolloutError::InvalidArgument(format!(
                "step size {step} rounds to zero at three decimal places"
            )));
        }
        if !target.is_finite() || target < 0.0 {
            return Err(RolloutError::InvalidArgument(format!(
                "target weight must be a non-negative number, got {target}"
            )));
        }

        let started = self.clock.now();
        let target = round3(target);
        let mut phase = ReweightPhase::Idle;
        let mut commands_issued = 0u32;

        let mut current = round3(self.client.osd_weight(osd).await?);
        let mut path = vec![current];
        info!(%osd, weight = current, target, step, "reweight requested");

        while !weights_equal(current, target) {
            let elapsed = self.clock.elapsed_since(started);
            if elapsed > timeout {
                self.enter(osd, &mut phase, ReweightPhase::TimedOut);
                warn!(%osd, weight = current, target, ?elapsed, "reweight timed out");
                return Err(RolloutError::DeadlineExceeded {
                    elapsed,
                    budget: timeout,
                });
            }

            self.enter(osd, &mut phase, ReweightPhase::WaitingForHealth);
            if let Err(e) = self.gate.wait_until_idle(step_timeout).await {
                let e = RolloutError::from(e);
                let terminal = if e.is_timeout() {
                    ReweightPhase::TimedOut
                } else {
                    ReweightPhase::Failed
                };
                self.enter(osd, &mut phase, terminal);
                warn!(%osd, weight = current, error = %e, "health wait failed");
                return Err(e);
            }

            self.enter(osd, &mut phase, ReweightPhase::Stepping);
            let next = next_weight(current, target, step);
            info!(%osd, from = current, to = next, target, "setting crush weight");
            let acked = match self.client.set_osd_weight(osd, next).await {
                Ok(acked) => acked,
                Err(e) => {
                    self.enter(osd, &mut phase, ReweightPhase::Failed);
                    warn!(%osd, weight = next, error = %e, "crush reweight failed");
                    return Err(e.into());
                }
            };
            commands_issued += 1;
            if !acked {
                warn!(%osd, weight = next, "crush reweight not acknowledged, re-reading weight");
            }

            current = round3(self.client.osd_weight(osd).await?);
            path.push(current);
            debug!(%osd, weight = current, "weight after step");
            self.clock.sleep(self.settle).await;
        }

        self.enter(osd, &mut phase, ReweightPhase::Converged);
        let elapsed = self.clock.elapsed_since(started);
        info!(%osd, weight = current, commands_issued, ?elapsed, "reweight converged");
        Ok(ReweightReport {
            osd,
            target,
            commands_issued,
            path,
            phase,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cephroll_core::ManualClock;

    use async_trait::async_trait;
    use cephroll_cluster::{ClusterHealth, ClusterResult, ClusterStatus, PgStats};
    use cephroll_core::{NodeIdentity, OperationKind};

    struct Unreachable;

    #[async_trait]
    impl ClusterInfoClient for Unreachable {
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
            unimplemented!()
        }
        async fn cluster_status(&self) -> ClusterResult<ClusterStatus> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn rejects_bad_arguments_before_touching_the_cluster() {
        let controller =
            SlowReweightController::new(Arc::new(Unreachable), Arc::new(ManualClock::starting_at(0)));
        let hour = Duration::from_secs(3600);
        for (target, step) in [
            (1.0, 0.0),
            (1.0, -0.1),
            (1.0, 0.0001),
            (1.0, f64::NAN),
            (-0.5, 0.1),
            (f64::INFINITY, 0.1),
        ] {
            let err = controller
                .reweight_slowly(OsdId(1), target, step, hour, hour)
                .await
                .unwrap_err();
            assert!(matches!(err, RolloutError::InvalidArgument(_)), "{target} {step}");
        }
    }

    #[test]
    fn phase_display() {
        assert_eq!(ReweightPhase::WaitingForHealth.to_string(), "waiting-for-health");
        assert_eq!(ReweightPhase::TimedOut.to_string(), "timed-out");
    }
}
