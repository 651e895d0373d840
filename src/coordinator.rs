// Application state: live task views plus the transient "last updated" marker

use crate::config::Config;
use crate::filter::TaskFilter;
use crate::live::{LiveQuery, LiveStore};
use crate::store::Store;
use crate::task::Task;
use eyre::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Last-updated marker with a generation counter
///
/// Every `set` bumps the generation; a clear only applies to the generation
/// that scheduled it. Both run under the watch channel's lock.
struct Marker {
    tx: watch::Sender<Option<i64>>,
    generation: AtomicU64,
}

impl Marker {
    fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
            generation: AtomicU64::new(0),
        }
    }

    fn set(&self, id: i64) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|current| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *current = Some(id);
        });
        generation
    }

    fn clear_if_current(&self, generation: u64) -> bool {
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) == generation && current.is_some() {
                *current = None;
                true
            } else {
                false
            }
        })
    }
}

/// Mediates between the task store and whatever renders it
pub struct TaskCoordinator {
    store: LiveStore,
    marker: Arc<Marker>,
    marker_delay: Duration,
}

impl TaskCoordinator {
    pub fn new(store: LiveStore, config: &Config) -> Self {
        Self {
            store,
            marker: Arc::new(Marker::new()),
            marker_delay: config.marker_delay,
        }
    }

    /// Open the on-disk store named by `config` and wrap it
    pub fn open(config: &Config) -> Result<Self> {
        let store = LiveStore::new(Store::open(&config.store_path)?)?;
        Ok(Self::new(store, config))
    }

    pub fn store(&self) -> &LiveStore {
        &self.store
    }

    pub fn all_tasks(&self) -> LiveQuery {
        self.store.query_all()
    }

    pub fn pending_tasks(&self) -> LiveQuery {
        self.store.query_pending()
    }

    pub fn done_tasks(&self) -> LiveQuery {
        self.store.query_done()
    }

    /// Live view picked by a filter selection
    pub fn tasks(&self, filter: TaskFilter) -> LiveQuery {
        self.store.query(filter)
    }

    /// Id of the most recently updated task, `None` once the marker expires
    pub fn last_updated_id(&self) -> watch::Receiver<Option<i64>> {
        self.marker.tx.subscribe()
    }

    pub async fn add_task(&self, description: impl Into<String>, done: bool) -> Result<()> {
        let id = self.store.insert(description, done).await?;
        debug!(id, "add_task: added");
        Ok(())
    }

    /// Write `task` back and flag it as recently updated
    pub async fn update_task(&self, task: &Task) -> Result<()> {
        self.store.update(task.id, task.description.clone(), task.done).await?;

        let generation = self.marker.set(task.id);
        debug!(id = task.id, generation, "update_task: marker set");

        let marker: Weak<Marker> = Arc::downgrade(&self.marker);
        let delay = self.marker_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Coordinator gone: nothing to clear
            if let Some(marker) = marker.upgrade() {
                if marker.clear_if_current(generation) {
                    debug!(generation, "update_task: marker cleared");
                }
            }
        });

        Ok(())
    }

    pub async fn delete_task(&self, task: &Task) -> Result<()> {
        self.store.delete(task.id).await?;
        debug!(id = task.id, "delete_task: deleted");
        Ok(())
    }
}
