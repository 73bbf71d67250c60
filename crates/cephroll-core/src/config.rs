//! cephroll.toml configuration parser.
//!
//! Every section is optional; missing values fall back to the protocol
//! constants (10 minute dead-peer threshold, 5-30 s poll jitter, 10 s ERR
//! grace, 5 s settle).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::release::UpgradePaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CephrollConfig {
    pub node: NodeConfig,
    pub ceph: CephConfig,
    pub handoff: HandoffConfig,
    pub rolling: RollingConfig,
    pub health: HealthGateConfig,
    pub reweight: ReweightConfig,
    pub status: StatusConfig,
    /// Extra `from = "to"` release upgrade paths.
    pub upgrade_paths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This node's identity in the roster. Defaults to the hostname.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CephConfig {
    /// Path to the `ceph` CLI.
    pub binary: String,
    /// cephx client id used for queries and reweights.
    pub client_id: String,
    /// cephx client id used for hand-off markers (the upgrade key).
    pub upgrade_client_id: Option<String>,
}

impl Default for CephConfig {
    fn default() -> Self {
        Self {
            binary: "ceph".to_string(),
            client_id: "admin".to_string(),
            upgrade_client_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandoffBackend {
    /// `ceph config-key`, shared by every node through the monitors.
    #[default]
    ConfigKey,
    /// A redb file. Shared only if the path is on shared storage.
    Redb,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffConfig {
    pub backend: HandoffBackend,
    /// Database path for the redb backend.
    pub path: Option<PathBuf>,
}

/// A `[min, max)` range of seconds from which poll delays are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollWindow {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for PollWindow {
    fn default() -> Self {
        Self {
            min_secs: 5,
            max_secs: 30,
        }
    }
}

impl PollWindow {
    /// Draw a fresh random delay from the window.
    pub fn sample(&self) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs(self.min_secs);
        }
        let secs = rand::thread_rng().gen_range(self.min_secs..self.max_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingConfig {
    /// Seconds after a predecessor's start marker before it is presumed dead.
    pub dead_peer_secs: u64,
    pub poll: PollWindow,
    /// Make an OSD roll wait for every monitor to finish first.
    pub osd_waits_for_monitors: bool,
    /// Upper bound on the wait for monitors.
    pub monitor_wait_secs: u64,
    /// Interval between checks while waiting for monitors.
    pub monitor_poll_secs: u64,
    /// Command run to upgrade this node. `{node}`, `{kind}` and `{version}`
    /// are substituted in each argument.
    pub upgrade_command: Vec<String>,
    /// Wait for the health gate to report idle before writing the start
    /// marker.
    pub gate_on_health: bool,
    /// Budget for that health wait.
    pub health_wait_secs: u64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            dead_peer_secs: 600,
            poll: PollWindow::default(),
            osd_waits_for_monitors: true,
            monitor_wait_secs: 600,
            monitor_poll_secs: 30,
            upgrade_command: Vec::new(),
            gate_on_health: false,
            health_wait_secs: 1800,
        }
    }
}

impl RollingConfig {
    pub fn dead_peer_threshold(&self) -> Duration {
        Duration::from_secs(self.dead_peer_secs)
    }

    pub fn monitor_wait(&self) -> Duration {
        Duration::from_secs(self.monitor_wait_secs)
    }

    pub fn monitor_poll(&self) -> Duration {
        Duration::from_secs(self.monitor_poll_secs)
    }

    pub fn health_wait(&self) -> Duration {
        Duration::from_secs(self.health_wait_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthGateConfig {
    /// Pause before re-checking a HEALTH_ERR cluster once.
    pub err_grace_secs: u64,
    pub poll: PollWindow,
}

impl Default for HealthGateConfig {
    fn default() -> Self {
        Self {
            err_grace_secs: 10,
            poll: PollWindow::default(),
        }
    }
}

impl HealthGateConfig {
    pub fn err_grace(&self) -> Duration {
        Duration::from_secs(self.err_grace_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReweightConfig {
    /// Pause after each weight change before re-polling health.
    pub settle_secs: u64,
}

impl Default for ReweightConfig {
    fn default() -> Self {
        Self { settle_secs: 5 }
    }
}

impl ReweightConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Degraded object ratio above which the status check is critical.
    pub degraded_thresh: f64,
    /// Misplaced object ratio above which the status check is critical.
    pub misplaced_thresh: f64,
    /// Status files older than this are not trusted.
    pub max_file_age_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            degraded_thresh: 0.1,
            misplaced_thresh: 0.1,
            max_file_age_secs: 3600,
        }
    }
}

impl CephrollConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CephrollConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the control loops cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, window) in [("rolling.poll", self.rolling.poll), ("health.poll", self.health.poll)] {
            if window.max_secs < window.min_secs {
                anyhow::bail!(
                    "{name}: max_secs ({}) is below min_secs ({})",
                    window.max_secs,
                    window.min_secs
                );
            }
        }
        if self.handoff.backend == HandoffBackend::Redb && self.handoff.path.is_none() {
            anyhow::bail!("handoff.path is required for the redb backend");
        }
        for (label, value) in [
            ("status.degraded_thresh", self.status.degraded_thresh),
            ("status.misplaced_thresh", self.status.misplaced_thresh),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{label} must be within 0.0..=1.0, got {value}");
            }
        }
        Ok(())
    }

    /// Default paths merged with the `[upgrade_paths]` table.
    pub fn upgrade_paths(&self) -> UpgradePaths {
        UpgradePaths::default().with_overrides(&self.upgrade_paths)
    }

    /// cephx id for marker reads and writes.
    pub fn upgrade_client_id(&self) -> &str {
        self.ceph
            .upgrade_client_id
            .as_deref()
            .unwrap_or(&self.ceph.client_id)
    }
}
