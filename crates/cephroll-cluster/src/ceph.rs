//! `ceph` CLI backend for [`ClusterInfoClient`].
//!
//! Each call shells out to `ceph --id <client> ... --format=json` and
//! parses the result with the pure parsers in [`crate::model`].

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use cephroll_core::{NodeIdentity, OperationKind, OsdId};

use crate::client::ClusterInfoClient;
use crate::error::{ClusterError, ClusterResult};
use crate::model::{self, ClusterHealth, ClusterStatus, PgStats};

/// Captured result of one CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Thin wrapper around the `ceph` binary.
#[derive(Debug, Clone)]
pub struct CephCli {
    binary: String,
    client_id: String,
}

impl CephCli {
    pub fn new(binary: &str, client_id: &str) -> Self {
        Self {
            binary: binary.to_string(),
            client_id: client_id.to_string(),
        }
    }

    /// Same binary, different cephx identity.
    pub fn with_client_id(&self, client_id: &str) -> Self {
        Self::new(&self.binary, client_id)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn render(&self, args: &[&str]) -> String {
        format!("{} --id {} {}", self.binary, self.client_id, args.join(" "))
    }

    /// Run a command and capture its output whatever the exit status.
    pub async fn exec(&self, args: &[&str]) -> ClusterResult<CommandOutput> {
        let command = self.render(args);
        debug!(%command, "running ceph command");
        let output = Command::new(&self.binary)
            .arg("--id")
            .arg(&self.client_id)
            .args(args)
            .output()
            .await
            .map_err(|source| ClusterError::Spawn {
                command: command.clone(),
                source,
            })?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run a command and fail on a non-zero exit.
    pub async fn run(&self, args: &[&str]) -> ClusterResult<CommandOutput> {
        let output = self.exec(args).await?;
        if !output.success() {
            let command = self.render(args);
            warn!(%command, code = ?output.code, stderr = %output.stderr.trim(), "ceph command failed");
            return Err(ClusterError::Exit {
                command,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    async fn run_json(&self, args: &[&str]) -> ClusterResult<String> {
        let mut full: Vec<&str> = args.to_vec();
        full.push("--format=json");
        Ok(self.run(&full).await?.stdout)
    }
}

#[async_trait]
impl ClusterInfoClient for CephCli {
    async fn cluster_health(&self) -> ClusterResult<ClusterHealth> {
        let text = self.run_json(&["health"]).await?;
        model::parse_health(&text)
    }

    async fn pg_stats(&self) -> ClusterResult<PgStats> {
        let text = self.run_json(&["pg", "stat"]).await?;
        model::parse_pg_stat(&text)
    }

    async fn osd_weight(&self, osd: OsdId) -> ClusterResult<f64> {
        let text = self.run_json(&["osd", "tree"]).await?;
        model::parse_osd_weight(&text, osd)
    }

    async fn set_osd_weight(&self, osd: OsdId, weight: f64) -> ClusterResult<bool> {
        let name = osd.to_string();
        let weight = weight.to_string();
        let output = self
            .run(&["osd", "crush", "reweight", &name, &weight])
            .await?;
        // The acknowledgement is printed on stderr by most releases.
        let combined = format!("{}{}", output.stdout, output.stderr);
        let acked = model::reweight_acknowledged(&combined, osd, &weight);
        debug!(osd = %name, %weight, acked, output = %combined.trim(), "crush reweight issued");
        Ok(acked)
    }

    async fn roster(&self, kind: OperationKind) -> ClusterResult<Vec<NodeIdentity>> {
        match kind {
            OperationKind::Mon => {
                let text = self.run_json(&["mon", "dump"]).await?;
                model::parse_mon_roster(&text)
            }
            OperationKind::Osd => {
                let text = self.run_json(&["osd", "tree"]).await?;
                model::parse_osd_roster(&text)
            }
        }
    }

    async fn cluster_status(&self) -> ClusterResult<ClusterStatus> {
        let text = self.run_json(&["status"]).await?;
        model::parse_status(&text)
    }
}
