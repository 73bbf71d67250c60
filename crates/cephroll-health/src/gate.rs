//! The health gate decides whether a disruptive step may run right now.
//!
//! Two tiers: HEALTH_WARN on its own does not block (clusters sit in
//! benign WARN states such as clock skew for days), but WARN with data
//! moving does. HEALTH_ERR gets one short grace retry and is then fatal.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use cephroll_cluster::{ClusterHealth, ClusterInfoClient, OverallStatus, PgStats};
use cephroll_core::clock::Clock;
use cephroll_core::config::{HealthGateConfig, PollWindow};

use crate::error::{HealthError, HealthResult};
use crate::patterns::is_data_movement;

/// Classified cluster health.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Ok,
    /// WARN with placement groups moving data.
    WarnBusy,
    /// WARN for reasons unrelated to data movement.
    WarnIdle,
    Err,
}

impl HealthState {
    pub fn is_busy(&self) -> bool {
        matches!(self, HealthState::WarnBusy)
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthState::Ok => "ok",
            HealthState::WarnBusy => "warn-busy",
            HealthState::WarnIdle => "warn-idle",
            HealthState::Err => "err",
        };
        f.write_str(s)
    }
}

/// Classify a single health reading. PG stats only matter for WARN.
pub fn classify_reading(health: &ClusterHealth, stats: &PgStats) -> HealthState {
    match health.overall {
        OverallStatus::Ok => HealthState::Ok,
        OverallStatus::Err => HealthState::Err,
        OverallStatus::Warn => {
            let moving = stats.by_state.iter().any(|s| is_data_movement(&s.name))
                || health.summary.iter().any(|l| is_data_movement(l));
            if moving {
                HealthState::WarnBusy
            } else {
                HealthState::WarnIdle
            }
        }
    }
}

pub struct HealthGate {
    client: Arc<dyn ClusterInfoClient>,
    clock: Arc<dyn Clock>,
    err_grace: Duration,
    poll: PollWindow,
}

impl HealthGate {
    pub fn new(client: Arc<dyn ClusterInfoClient>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(client, clock, &HealthGateConfig::default())
    }

    pub fn with_config(
        client: Arc<dyn ClusterInfoClient>,
        clock: Arc<dyn Clock>,
        config: &HealthGateConfig,
    ) -> Self {
        Self {
            client,
            clock,
            err_grace: config.err_grace(),
            poll: config.poll,
        }
    }

    /// Classify current health.
    ///
    /// Never returns `HealthState::Err`: an ERR that survives the grace
    /// retry is reported as [`HealthError::Unstable`] instead.
    pub async fn classify(&self) -> HealthResult<HealthState> {
        let mut health = self.client.cluster_health().await?;
        debug!(health = %health.overall, "cluster health");

        if health.overall == OverallStatus::Err {
            warn!(grace = ?self.err_grace, "cluster is HEALTH_ERR, retrying once after grace period");
            self.clock.sleep(self.err_grace).await;
            health = self.client.cluster_health().await?;
            debug!(health = %health.overall, "cluster health after grace");
        }

        match health.overall {
            OverallStatus::Ok => Ok(HealthState::Ok),
            OverallStatus::Warn => self.classify_warn(&health).await,
            OverallStatus::Err => Err(HealthError::Unstable {
                summary: health.summary,
            }),
        }
    }

    async fn classify_warn(&self, health: &ClusterHealth) -> HealthResult<HealthState> {
        let stats = self.client.pg_stats().await?;
        let state = classify_reading(health, &stats);
        if state.is_busy() {
            info!(health = %state, "cluster is moving data");
        } else {
            debug!(health = %state, "cluster is HEALTH_WARN without data movement, not blocking");
        }
        Ok(state)
    }

    /// Whether the caller must wait before changing anything.
    pub async fn is_busy(&self) -> HealthResult<bool> {
        Ok(self.classify().await?.is_busy())
    }

    /// Poll until the cluster is not busy, sleeping a fresh random interval
    /// between checks. Fails once the wait has used up `step_timeout`.
    ///
    /// Returns how long the wait took.
    pub async fn wait_until_idle(&self, step_timeout: Duration) -> HealthResult<Duration> {
        let started = self.clock.now();
        loop {
            if !self.is_busy().await? {
                return Ok(self.clock.elapsed_since(started));
            }
            let waited = self.clock.elapsed_since(started);
            if waited >= step_timeout {
                return Err(HealthError::StepTimeout {
                    waited,
                    budget: step_timeout,
                });
            }
            let pause = self.poll.sample();
            info!(?pause, ?waited, "waiting for cluster health before continuing");
            self.clock.sleep(pause).await;
        }
    }
}
