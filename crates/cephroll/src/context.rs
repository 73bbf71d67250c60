//! Wiring from configuration to live collaborators.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::{debug, info};

use cephroll_cluster::{CephCli, ClusterInfoClient, CommandUpgradeAction, ConfigKeyStore};
use cephroll_core::clock::{Clock, SystemClock};
use cephroll_core::config::HandoffBackend;
use cephroll_core::{CephrollConfig, NodeIdentity};
use cephroll_health::HealthGate;
use cephroll_state::{HandoffStore, RedbHandoffStore};

const DEFAULT_CONFIG: &str = "/etc/cephroll/cephroll.toml";

pub struct Context {
    pub config: CephrollConfig,
    node: Option<NodeIdentity>,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn load(path: Option<&Path>, node_flag: Option<String>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => CephrollConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None if Path::new(DEFAULT_CONFIG).exists() => {
                CephrollConfig::from_file(Path::new(DEFAULT_CONFIG))
                    .with_context(|| format!("loading {DEFAULT_CONFIG}"))?
            }
            None => {
                debug!("no configuration file, using defaults");
                CephrollConfig::default()
            }
        };
        let node = resolve_node(node_flag, config.node.name.clone(), local_hostname());
        Ok(Self {
            config,
            node,
            clock: Arc::new(SystemClock),
        })
    }

    /// This node's roster identity.
    pub fn node(&self) -> anyhow::Result<NodeIdentity> {
        self.node
            .clone()
            .context("cannot determine this node's name; pass --node or set node.name")
    }

    pub fn ceph(&self) -> CephCli {
        CephCli::new(&self.config.ceph.binary, &self.config.ceph.client_id)
    }

    pub fn client(&self) -> Arc<dyn ClusterInfoClient> {
        Arc::new(self.ceph())
    }

    pub fn health_gate(&self) -> HealthGate {
        HealthGate::with_config(self.client(), self.clock.clone(), &self.config.health)
    }

    pub fn store(&self) -> anyhow::Result<Arc<dyn HandoffStore>> {
        match self.config.handoff.backend {
            HandoffBackend::ConfigKey => {
                let cli = self.ceph().with_client_id(self.config.upgrade_client_id());
                info!(client = %cli.client_id(), "using config-key hand-off store");
                Ok(Arc::new(ConfigKeyStore::new(cli)))
            }
            HandoffBackend::Redb => {
                let path = self
                    .config
                    .handoff
                    .path
                    .as_deref()
                    .context("handoff.path is required for the redb backend")?;
                info!(path = %path.display(), "using redb hand-off store");
                let store = RedbHandoffStore::open(path)
                    .with_context(|| format!("opening {}", path.display()))?;
                Ok(Arc::new(store))
            }
        }
    }

    pub fn upgrade_action(&self) -> anyhow::Result<CommandUpgradeAction> {
        CommandUpgradeAction::new(self.config.rolling.upgrade_command.clone())
    }
}

/// Flag first, then configuration, then the hostname.
fn resolve_node(
    flag: Option<String>,
    configured: Option<String>,
    hostname: Option<String>,
) -> Option<NodeIdentity> {
    [flag, configured, hostname]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .map(NodeIdentity::new)
}

fn local_hostname() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_precedence() {
        let pick = |f: Option<&str>, c: Option<&str>, h: Option<&str>| {
            resolve_node(f.map(String::from), c.map(String::from), h.map(String::from))
                .map(|n| n.as_str().to_string())
        };
        assert_eq!(pick(Some("flag"), Some("conf"), Some("host")).as_deref(), Some("flag"));
        assert_eq!(pick(None, Some("conf"), Some("host")).as_deref(), Some("conf"));
        assert_eq!(pick(None, Some("  "), Some("host\n")).as_deref(), Some("host"));
        assert_eq!(pick(None, None, None), None);
    }

    #[test]
    fn loads_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cephroll.toml");
        std::fs::write(
            &path,
            "[node]\nname = \"stor-1\"\n[handoff]\nbackend = \"redb\"\npath = \"/nonexistent/dir/x.redb\"\n",
        )
        .unwrap();

        let ctx = Context::load(Some(&path), None).unwrap();
        assert_eq!(ctx.node().unwrap().as_str(), "stor-1");
        let ctx = Context::load(Some(&path), Some("override".into())).unwrap();
        assert_eq!(ctx.node().unwrap().as_str(), "override");
        // The redb parent directory does not exist.
        assert!(ctx.store().is_err());
        assert!(ctx.upgrade_action().is_err());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Context::load(Some(&dir.path().join("absent.toml")), None).is_err());
    }

    #[test]
    fn redb_store_opens_under_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CephrollConfig::default();
        config.handoff.backend = HandoffBackend::Redb;
        config.handoff.path = Some(dir.path().join("handoff.redb"));
        let ctx = Context {
            config,
            node: None,
            clock: Arc::new(SystemClock),
        };
        assert!(ctx.store().is_ok());
        assert!(ctx.node().is_err());
    }
}
