//! [`HandoffStore`] over the monitors' `ceph config-key` store.
//!
//! The monitors replicate config-key writes through their own quorum, so a
//! `put` that returns is visible to every node's later `get`.

use async_trait::async_trait;
use tracing::debug;

use cephroll_state::{HandoffStore, StateError, StateResult};

use crate::ceph::CephCli;

/// `ceph config-key` exits with ENOENT when a key is absent.
const ENOENT: i32 = 2;

#[derive(Debug, Clone)]
pub struct ConfigKeyStore {
    cli: CephCli,
}

impl ConfigKeyStore {
    /// `cli` should carry the cephx identity allowed to write upgrade keys.
    pub fn new(cli: CephCli) -> Self {
        Self { cli }
    }
}

fn backend(e: impl std::fmt::Display) -> StateError {
    StateError::Backend(e.to_string())
}

#[async_trait]
impl HandoffStore for ConfigKeyStore {
    async fn put(&self, key: &str, value: &str) -> StateResult<()> {
        self.cli
            .run(&["config-key", "put", key, value])
            .await
            .map_err(backend)?;
        debug!(%key, %value, "config-key marker stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> StateResult<Option<String>> {
        let out = self
            .cli
            .exec(&["config-key", "get", key])
            .await
            .map_err(backend)?;
        match out.code {
            Some(0) => Ok(Some(out.stdout.trim().to_string())),
            Some(ENOENT) => Ok(None),
            code => Err(StateError::Backend(format!(
                "config-key get {key} exited with {code:?}: {}",
                out.stderr.trim()
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StateResult<bool> {
        let out = self
            .cli
            .exec(&["config-key", "exists", key])
            .await
            .map_err(backend)?;
        match out.code {
            Some(0) => Ok(true),
            Some(ENOENT) => Ok(false),
            code => Err(StateError::Backend(format!(
                "config-key exists {key} exited with {code:?}: {}",
                out.stderr.trim()
            ))),
        }
    }
}
