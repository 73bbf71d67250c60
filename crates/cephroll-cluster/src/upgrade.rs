//! Per-node upgrade actions.
//!
//! The coordinator treats an upgrade as one opaque pass/fail step. Package
//! installation and daemon restarts live behind [`NodeUpgradeAction`].

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use cephroll_core::{NodeIdentity, OperationKind};

/// Performs the actual upgrade of one node.
#[async_trait]
pub trait NodeUpgradeAction: Send + Sync {
    async fn upgrade(
        &self,
        node: &NodeIdentity,
        kind: OperationKind,
        version: &str,
    ) -> anyhow::Result<()>;
}

/// Runs an external command, substituting `{node}`, `{kind}` and
/// `{version}` in each argument. A non-zero exit is a failed upgrade.
#[derive(Debug, Clone)]
pub struct CommandUpgradeAction {
    argv: Vec<String>,
}

impl CommandUpgradeAction {
    pub fn new(argv: Vec<String>) -> anyhow::Result<Self> {
        if argv.is_empty() {
            anyhow::bail!("upgrade command is empty; set rolling.upgrade_command");
        }
        Ok(Self { argv })
    }

    /// The argv that would run for this node.
    pub fn render(&self, node: &NodeIdentity, kind: OperationKind, version: &str) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{node}", node.as_str())
                    .replace("{kind}", kind.as_str())
                    .replace("{version}", version)
            })
            .collect()
    }
}

#[async_trait]
impl NodeUpgradeAction for CommandUpgradeAction {
    async fn upgrade(
        &self,
        node: &NodeIdentity,
        kind: OperationKind,
        version: &str,
    ) -> anyhow::Result<()> {
        let argv = self.render(node, kind, version);
        info!(%node, %kind, %version, command = %argv.join(" "), "running upgrade command");

        let output = Command::new(&argv[0]).args(&argv[1..]).output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(%node, code = ?output.status.code(), stderr = %stderr.trim(), "upgrade command failed");
            anyhow::bail!(
                "upgrade command exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            );
        }
        Ok(())
    }
}
