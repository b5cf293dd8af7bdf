//! Snapshot persistence for the in-memory store.
//!
//! A snapshot file holds every order plus the id allocator. Files are written
//! to a temporary sibling first and renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::Order;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::{InMemoryOrderStore, Result};

/// The full state of an order store at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// The id the next created order will get.
    pub next_id: u64,

    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,

    /// Every order in ascending id order.
    pub orders: Vec<Order>,
}

impl StoreSnapshot {
    /// Writes the snapshot to `path` atomically.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = temp_path(path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Reads a snapshot from `path`.
    ///
    /// Returns `None` if the file does not exist.
    pub async fn load(path: &Path) -> Result<Option<Self>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes store snapshots to a file whenever the store has changed.
///
/// Cloning shares the writer; writes through any clone are serialized.
#[derive(Clone)]
pub struct SnapshotWriter {
    store: InMemoryOrderStore,
    path: Arc<PathBuf>,
    written_revision: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl SnapshotWriter {
    /// Creates a writer for `store`. The store's current state counts as
    /// already written.
    pub fn new(store: InMemoryOrderStore, path: impl Into<PathBuf>) -> Self {
        let revision = store.revision();
        Self {
            store,
            path: Arc::new(path.into()),
            written_revision: Arc::new(AtomicU64::new(revision)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a snapshot if the store changed since the last write.
    ///
    /// Returns true if a file was written.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn flush(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let revision = self.store.revision();
        if revision == self.written_revision.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let snapshot = self.store.snapshot().await;
        snapshot.save(&self.path).await?;
        self.written_revision.store(revision, Ordering::SeqCst);

        metrics::counter!("store_snapshots_written_total").increment(1);
        tracing::debug!(orders = snapshot.orders.len(), revision, "snapshot written");
        Ok(true)
    }

    /// Spawns a task that flushes every `period`.
    ///
    /// Write failures are logged and retried on the next tick.
    pub fn spawn_periodic(&self, period: Duration) -> JoinHandle<()> {
        let writer = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = writer.flush().await {
                    tracing::error!(error = %e, "failed to write snapshot");
                }
            }
        })
    }
}
