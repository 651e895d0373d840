// Async store handle with live query subscriptions

use crate::filter::TaskFilter;
use crate::store::Store;
use crate::task::Task;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

/// A subscription to one filtered view of the task table
///
/// Always holds the full ordered result; every write that changes it pushes a
/// new value.
#[derive(Debug, Clone)]
pub struct LiveQuery {
    filter: TaskFilter,
    rx: watch::Receiver<Vec<Task>>,
}

impl LiveQuery {
    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    /// Current result set
    pub fn current(&self) -> Vec<Task> {
        self.rx.borrow().clone()
    }

    /// Wait for the next emission and return it
    ///
    /// Errors once the store has been dropped.
    pub async fn changed(&mut self) -> Result<Vec<Task>> {
        self.rx
            .changed()
            .await
            .map_err(|_| eyre!("Live query closed: store dropped"))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Underlying watch receiver, for `tokio::select!` and friends
    pub fn receiver(&self) -> watch::Receiver<Vec<Task>> {
        self.rx.clone()
    }
}

struct Inner {
    store: Mutex<Store>,
    all: watch::Sender<Vec<Task>>,
    pending: watch::Sender<Vec<Task>>,
    done: watch::Sender<Vec<Task>>,
}

impl Inner {
    fn sender(&self, filter: TaskFilter) -> &watch::Sender<Vec<Task>> {
        match filter {
            TaskFilter::All => &self.all,
            TaskFilter::Pending => &self.pending,
            TaskFilter::Done => &self.done,
        }
    }

    /// Run `f` against the store, then republish the queries it changed
    ///
    /// Publishing happens while the store lock is held so emissions follow
    /// write order. Once `f` has succeeded the write is committed, so a failed
    /// republish is logged and the write still reports success.
    fn write<T>(&self, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        let mut store = self.store.lock().map_err(|_| eyre!("Task store lock poisoned"))?;
        let out = f(&mut store)?;

        if let Err(e) = self.republish(&store) {
            warn!(error = ?e, "write: failed to republish live queries");
        }

        Ok(out)
    }

    fn republish(&self, store: &Store) -> Result<()> {
        // Query everything first so a failure leaves every view on the old result
        let mut results = Vec::with_capacity(TaskFilter::ALL.len());
        for filter in TaskFilter::ALL {
            results.push((filter, store.list(filter)?));
        }

        for (filter, tasks) in results {
            let changed = self.sender(filter).send_if_modified(|current| {
                if *current == tasks {
                    false
                } else {
                    *current = tasks;
                    true
                }
            });
            if changed {
                debug!(%filter, "write: republished live query");
            }
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Store) -> Result<T>) -> Result<T> {
        let store = self.store.lock().map_err(|_| eyre!("Task store lock poisoned"))?;
        f(&store)
    }
}

/// Cloneable async handle over a [`Store`]
///
/// Every operation runs on tokio's blocking pool. Writes are serialized by an
/// internal lock.
#[derive(Clone)]
pub struct LiveStore {
    inner: Arc<Inner>,
}

impl LiveStore {
    /// Wrap an opened store, seeding every live query with its current contents
    pub fn new(store: Store) -> Result<Self> {
        let all = watch::Sender::new(store.list(TaskFilter::All)?);
        let pending = watch::Sender::new(store.list(TaskFilter::Pending)?);
        let done = watch::Sender::new(store.list(TaskFilter::Done)?);

        Ok(Self {
            inner: Arc::new(Inner {
                store: Mutex::new(store),
                all,
                pending,
                done,
            }),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(inner.as_ref()))
            .await
            .map_err(|e| eyre!("Store task failed: {}", e))?
    }

    // ========================================================================
    // Live queries
    // ========================================================================

    pub fn query(&self, filter: TaskFilter) -> LiveQuery {
        LiveQuery {
            filter,
            rx: self.inner.sender(filter).subscribe(),
        }
    }

    pub fn query_all(&self) -> LiveQuery {
        self.query(TaskFilter::All)
    }

    pub fn query_pending(&self) -> LiveQuery {
        self.query(TaskFilter::Pending)
    }

    pub fn query_done(&self) -> LiveQuery {
        self.query(TaskFilter::Done)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn insert(&self, description: impl Into<String>, done: bool) -> Result<i64> {
        let description = description.into();
        self.blocking(move |inner| inner.write(|store| store.insert(&description, done)))
            .await
    }

    pub async fn update(&self, id: i64, description: impl Into<String>, done: bool) -> Result<bool> {
        let description = description.into();
        self.blocking(move |inner| inner.write(|store| store.update(id, &description, done)))
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        self.blocking(move |inner| inner.write(|store| store.delete(id))).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Task>> {
        self.blocking(move |inner| inner.read(|store| store.get(id))).await
    }

    pub async fn export_jsonl(&self, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        self.blocking(move |inner| inner.read(|store| store.export_jsonl(&path)))
            .await
    }

    pub async fn import_jsonl(&self, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        self.blocking(move |inner| inner.write(|store| store.import_jsonl(&path)))
            .await
    }
}
