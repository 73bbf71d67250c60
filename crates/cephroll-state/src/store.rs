//! The shared key-value namespace for coordination markers.
//!
//! Only start/done timestamps live here, never cluster data. Each node
//! writes only its own keys, so concurrent writers never collide. The
//! backend must make a completed `put` visible to every later `get`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use redb::{Database, ReadableDatabase};
use tracing::debug;

use cephroll_core::{HandoffKey, Marker, parse_timestamp};

use crate::error::{StateError, StateResult};
use crate::tables::MARKERS;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Durable, read-after-write key-value store for hand-off markers.
#[async_trait]
pub trait HandoffStore: Send + Sync {
    async fn put(&self, key: &str, value: &str) -> StateResult<()>;

    async fn get(&self, key: &str) -> StateResult<Option<String>>;

    async fn exists(&self, key: &str) -> StateResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Read a marker as fractional Unix seconds.
    ///
    /// A present but unparseable value is an error rather than "absent":
    /// treating it as missing would stall waiters forever.
    async fn marker_timestamp(&self, key: &HandoffKey, marker: Marker) -> StateResult<Option<f64>> {
        let name = key.marker(marker);
        match self.get(&name).await? {
            Some(value) => parse_timestamp(&value)
                .map(Some)
                .ok_or(StateError::Malformed { key: name, value }),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<S: HandoffStore + ?Sized> HandoffStore for Arc<S> {
    async fn put(&self, key: &str, value: &str) -> StateResult<()> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &str) -> StateResult<Option<String>> {
        (**self).get(key).await
    }

    async fn exists(&self, key: &str) -> StateResult<bool> {
        (**self).exists(key).await
    }
}

/// In-process store. Clones share the same map, so several simulated nodes
/// can coordinate through one instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandoffStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    writes: Vec<String>,
}

impl MemoryHandoffStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order they were written.
    pub fn write_log(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HandoffStore for MemoryHandoffStore {
    async fn put(&self, key: &str, value: &str) -> StateResult<()> {
        let mut state = self.lock();
        state.values.insert(key.to_string(), value.to_string());
        state.writes.push(key.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> StateResult<Option<String>> {
        Ok(self.lock().values.get(key).cloned())
    }
}

/// Marker store backed by a redb file.
#[derive(Clone)]
pub struct RedbHandoffStore {
    db: Arc<Database>,
}

impl RedbHandoffStore {
    /// Open (or create) a marker database at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "handoff store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory database (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory handoff store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(MARKERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

#[async_trait]
impl HandoffStore for RedbHandoffStore {
    async fn put(&self, key: &str, value: &str) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(MARKERS).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        // Commit is durable before returning, which gives read-after-write.
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, %value, "marker stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> StateResult<Option<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(MARKERS).map_err(map_err!(Table))?;
        let value = table
            .get(key)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }
}
