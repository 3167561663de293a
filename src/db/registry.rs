//! Connection registry.
//!
//! Maps a worker id to that worker's single physical connection. A connection
//! is opened on the worker's first call and reused until `release`. There is
//! no pool, no maximum, no idle timeout and no health check.

use crate::db::connection::{DbConnection, WorkerConnection};
use crate::error::DbResult;
use crate::models::ConnectionConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tracing::{debug, info, warn};

/// Shared handle to one worker's connection.
pub type WorkerHandle = Arc<Mutex<WorkerConnection>>;

/// Per-worker slot. Installing the slot and opening the connection are
/// separate steps so a slow connect never holds the map lock.
type Slot = Arc<OnceCell<WorkerHandle>>;

#[derive(Debug)]
pub struct ConnectionRegistry {
    config: ConnectionConfig,
    connections: RwLock<HashMap<String, Slot>>,
}

impl ConnectionRegistry {
    /// Create an empty registry; nothing connects until a worker asks.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get the worker's connection, opening it on first use.
    ///
    /// Concurrent first calls for the same worker open exactly one connection;
    /// a failed open drops the empty slot so the next call retries. The
    /// returned handle was tracked by the registry when this call finished.
    pub async fn connection_for(&self, worker_id: &str) -> DbResult<WorkerHandle> {
        loop {
            let slot = self.slot(worker_id).await;

            let opened = slot
                .get_or_try_init(|| async {
                    info!(
                        worker_id = %worker_id,
                        db_type = %self.config.db_type,
                        url = %self.config.masked_connection_string(),
                        "Opening worker connection"
                    );
                    let conn = DbConnection::open(&self.config).await?;
                    Ok::<_, crate::error::DbError>(Arc::new(Mutex::new(WorkerConnection::new(
                        worker_id, conn,
                    ))))
                })
                .await
                .map(Arc::clone);

            let handle = match opened {
                Ok(handle) => handle,
                Err(e) => {
                    self.discard_empty_slot(worker_id, &slot).await;
                    return Err(e);
                }
            };

            if self.is_tracked(worker_id, &slot).await {
                return Ok(handle);
            }

            // Released while opening; close the orphan and start over
            let orphan = handle.lock().await.take();
            if let Some(conn) = orphan {
                if let Err(e) = conn.close().await {
                    warn!(worker_id = %worker_id, error = %e, "Failed to close connection");
                }
            }
            debug!(worker_id = %worker_id, "Worker released during open, reopening");
        }
    }

    async fn is_tracked(&self, worker_id: &str, slot: &Slot) -> bool {
        let connections = self.connections.read().await;
        connections
            .get(worker_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    /// Fetch or install the slot for `worker_id`.
    async fn slot(&self, worker_id: &str) -> Slot {
        {
            let connections = self.connections.read().await;
            if let Some(slot) = connections.get(worker_id) {
                return Arc::clone(slot);
            }
        }

        let mut connections = self.connections.write().await;
        Arc::clone(connections.entry(worker_id.to_string()).or_default())
    }

    /// Remove `slot` after a failed open, unless another caller holds it and
    /// may still initialize it.
    async fn discard_empty_slot(&self, worker_id: &str, slot: &Slot) {
        let mut connections = self.connections.write().await;
        // held by the map and by this caller only
        let unused = connections.get(worker_id).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && !current.initialized() && Arc::strong_count(slot) == 2
        });
        if unused {
            connections.remove(worker_id);
            debug!(worker_id = %worker_id, "Dropped slot after failed open");
        }
    }

    /// Close the worker's connection and forget it.
    ///
    /// An open still in flight for the worker is awaited and its connection
    /// closed. Returns false when the worker had no connection.
    pub async fn release(&self, worker_id: &str) -> DbResult<bool> {
        let slot = {
            let mut connections = self.connections.write().await;
            connections.remove(worker_id)
        };

        let handle = match slot {
            Some(slot) => settled(&slot).await,
            None => None,
        };
        let Some(handle) = handle else {
            debug!(worker_id = %worker_id, "No connection to release");
            return Ok(false);
        };

        let conn = handle.lock().await.take();
        if let Some(conn) = conn {
            conn.close().await?;
        }

        info!(worker_id = %worker_id, "Worker connection closed");
        Ok(true)
    }

    /// Whether `worker_id` currently owns an open connection.
    pub async fn contains(&self, worker_id: &str) -> bool {
        let connections = self.connections.read().await;
        connections
            .get(worker_id)
            .is_some_and(|slot| slot.initialized())
    }

    /// Number of workers with an open connection.
    pub async fn worker_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.values().filter(|s| s.initialized()).count()
    }

    /// Close every connection. Close failures are logged, not returned.
    pub async fn close_all(&self) {
        let drained: Vec<(String, Slot)> = {
            let mut connections = self.connections.write().await;
            connections.drain().collect()
        };

        for (worker_id, slot) in drained {
            let Some(handle) = settled(&slot).await else {
                continue;
            };
            let conn = handle.lock().await.take();
            if let Some(conn) = conn {
                if let Err(e) = conn.close().await {
                    warn!(worker_id = %worker_id, error = %e, "Failed to close connection");
                }
            }
            info!(worker_id = %worker_id, "Closing connection");
        }
        info!("All connections closed");
    }
}

/// The slot's handle once any in-flight open has finished; `None` when the
/// slot is empty or that open failed.
async fn settled(slot: &Slot) -> Option<WorkerHandle> {
    slot.get_or_try_init(|| async { Err::<WorkerHandle, ()>(()) })
        .await
        .ok()
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    fn memory_registry() -> ConnectionRegistry {
        ConnectionRegistry::new(ConnectionConfig::new("sqlite::memory:").unwrap())
    }

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = memory_registry();
        assert_eq!(registry.worker_count().await, 0);
        assert!(!registry.contains("w1").await);
    }

    #[tokio::test]
    async fn test_connection_is_reused_per_worker() {
        let registry = memory_registry();
        let first = registry.connection_for("w1").await.unwrap();
        let second = registry.connection_for("w1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.worker_count().await, 1);
    }

    #[tokio::test]
    async fn test_workers_get_distinct_connections() {
        let registry = memory_registry();
        let a = registry.connection_for("w1").await.unwrap();
        let b = registry.connection_for("w2").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.worker_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_opens_one_connection() {
        let registry = Arc::new(memory_registry());
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.connection_for("shared").await.unwrap()
            }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.worker_count().await, 1);
    }

    #[tokio::test]
    async fn test_release_closes_and_removes() {
        let registry = memory_registry();
        let handle = registry.connection_for("w1").await.unwrap();

        assert!(registry.release("w1").await.unwrap());
        assert!(!registry.contains("w1").await);
        assert!(!handle.lock().await.is_open());

        // Unknown worker
        assert!(!registry.release("w1").await.unwrap());

        // A later call opens a fresh connection
        let fresh = registry.connection_for("w1").await.unwrap();
        assert!(!Arc::ptr_eq(&handle, &fresh));
        assert!(fresh.lock().await.is_open());
    }

    #[tokio::test]
    async fn test_failed_open_is_connection_error_and_not_cached() {
        let registry = ConnectionRegistry::new(
            ConnectionConfig::new("sqlite:/nonexistent-dir/sub/db.sqlite").unwrap(),
        );
        let err = registry.connection_for("w1").await.unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(!registry.contains("w1").await);
        assert_eq!(registry.worker_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_no_slot_behind() {
        let registry = ConnectionRegistry::new(
            ConnectionConfig::new("sqlite:/nonexistent-dir/sub/db.sqlite").unwrap(),
        );
        for i in 0..5 {
            let worker_id = format!("w{}", i);
            assert!(registry.connection_for(&worker_id).await.is_err());
            assert!(registry.connection_for(&worker_id).await.is_err());
        }
        assert!(registry.connections.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_release_during_open_closes_the_new_connection() {
        let registry = memory_registry();
        for i in 0..10 {
            let worker_id = format!("w{}", i);
            let (opened, released) = tokio::join!(
                registry.connection_for(&worker_id),
                registry.release(&worker_id)
            );
            let opened = opened.unwrap();
            released.unwrap();

            if opened.lock().await.is_open() {
                // open won the race: the map still tracks this handle
                let again = registry.connection_for(&worker_id).await.unwrap();
                assert!(Arc::ptr_eq(&opened, &again));
            } else {
                assert!(!registry.contains(&worker_id).await);
            }
        }
        registry.close_all().await;
        assert!(registry.connections.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_close_all() {
        let registry = memory_registry();
        registry.connection_for("w1").await.unwrap();
        registry.connection_for("w2").await.unwrap();
        registry.close_all().await;
        assert_eq!(registry.worker_count().await, 0);
    }
}
