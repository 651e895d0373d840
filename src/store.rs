// SQLite-backed task store

use crate::filter::TaskFilter;
use crate::jsonl;
use crate::task::Task;
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Database file name inside the store directory
pub const DB_FILE_NAME: &str = "tasklist.db";

const SCHEMA_TASKS: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    description TEXT,
    done BOOLEAN
);";

const INSERT_TASK: &str = "INSERT OR REPLACE INTO tasks (description, done) VALUES (?1, ?2)";
const UPSERT_TASK: &str = "INSERT OR REPLACE INTO tasks (id, description, done) VALUES (?1, ?2, ?3)";
const UPDATE_TASK: &str = "UPDATE tasks SET description = ?1, done = ?2 WHERE id = ?3";
const DELETE_TASK: &str = "DELETE FROM tasks WHERE id = ?1";
const SELECT_TASK: &str = "SELECT * FROM tasks WHERE id = ?1";
const SELECT_TASKS_ASC: &str = "SELECT * FROM tasks ORDER BY id ASC";

/// Persistent task table
pub struct Store {
    db_path: Option<PathBuf>,
    db: Connection,
}

impl Store {
    /// Open or create a store in the given directory
    ///
    /// The database lives at `{dir}/tasklist.db`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();

        fs::create_dir_all(dir).context("Failed to create store directory")?;

        let db_path = dir.join(DB_FILE_NAME);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )
        .context("Failed to configure SQLite database")?;

        let store = Self {
            db_path: Some(db_path),
            db,
        };
        store.create_schema()?;

        info!(path = ?store.db_path, "Opened task store");
        Ok(store)
    }

    /// Open a store backed by an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let store = Self { db_path: None, db };
        store.create_schema()?;
        Ok(store)
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Get a reference to the SQLite database connection
    pub fn db(&self) -> &Connection {
        &self.db
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");
        self.db.execute_batch(SCHEMA_TASKS).context("Failed to create tasks table")?;
        Ok(())
    }

    fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get("id")?,
            description: row.get::<_, Option<String>>("description")?.unwrap_or_default(),
            done: row.get::<_, Option<bool>>("done")?.unwrap_or(false),
        })
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Insert a new task and return its assigned id
    pub fn insert(&mut self, description: &str, done: bool) -> Result<i64> {
        self.db
            .execute(INSERT_TASK, params![description, done])
            .context("Failed to insert task")?;
        let id = self.db.last_insert_rowid();
        debug!(id, done, "insert: task created");
        Ok(id)
    }

    /// Insert or replace a task keeping its id
    pub fn upsert(&mut self, task: &Task) -> Result<()> {
        Self::upsert_on(&self.db, task)
    }

    fn upsert_on(conn: &Connection, task: &Task) -> Result<()> {
        conn.execute(UPSERT_TASK, params![task.id, task.description, task.done])
            .context("Failed to upsert task")?;
        debug!(id = task.id, "upsert: task stored");
        Ok(())
    }

    /// Replace description and done flag of the task with `id`
    ///
    /// Returns `false` when no such task exists; that is not an error.
    pub fn update(&mut self, id: i64, description: &str, done: bool) -> Result<bool> {
        let rows = self
            .db
            .execute(UPDATE_TASK, params![description, done, id])
            .context("Failed to update task")?;
        debug!(id, done, rows, "update: called");
        Ok(rows > 0)
    }

    /// Delete the task with `id`
    ///
    /// Returns `false` when no such task exists; that is not an error.
    pub fn delete(&mut self, id: i64) -> Result<bool> {
        let rows = self.db.execute(DELETE_TASK, params![id]).context("Failed to delete task")?;
        debug!(id, rows, "delete: called");
        Ok(rows > 0)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Get a task by id
    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .db
            .query_row(SELECT_TASK, params![id], Self::row_to_task)
            .optional()
            .context("Failed to query task")?;
        Ok(task)
    }

    /// List tasks matching `filter`, newest first
    pub fn list(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        self.collect(filter.to_sql())
    }

    fn collect(&self, sql: &str) -> Result<Vec<Task>> {
        let mut stmt = self.db.prepare_cached(sql)?;
        let rows = stmt.query_map([], Self::row_to_task)?;

        let mut tasks = Vec::new();
        for row_result in rows {
            tasks.push(row_result.context("Failed to read task row")?);
        }
        Ok(tasks)
    }

    // ========================================================================
    // Export / import
    // ========================================================================

    /// Write every task to a JSONL file in ascending id order
    pub fn export_jsonl(&self, path: &Path) -> Result<usize> {
        let tasks = self.collect(SELECT_TASKS_ASC)?;
        jsonl::write_jsonl(path, &tasks)
    }

    /// Load tasks from a JSONL file, keeping their ids
    ///
    /// Existing tasks with the same id are replaced. Runs in one transaction.
    pub fn import_jsonl(&mut self, path: &Path) -> Result<usize> {
        let tasks: Vec<Task> = jsonl::read_jsonl(path)?;

        let tx = self.db.transaction()?;
        for task in &tasks {
            Self::upsert_on(&tx, task)?;
        }
        tx.commit()?;

        info!(file = ?path, count = tasks.len(), "Imported tasks");
        Ok(tasks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn ids(tasks: &[Task]) -> HashSet<i64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_store_open_creates_database() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested");

        let store = Store::open(&dir).unwrap();
        assert!(dir.join(DB_FILE_NAME).exists());
        assert_eq!(store.db_path(), Some(dir.join(DB_FILE_NAME).as_path()));
    }

    #[test]
    fn test_store_reopen_keeps_tasks() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = Store::open(temp.path()).unwrap();
            store.insert("Persisted", false).unwrap();
        }

        let store = Store::open(temp.path()).unwrap();
        let tasks = store.list(TaskFilter::All).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Persisted");
    }

    #[test]
    fn test_insert_then_list_first_is_newest() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert("First", true).unwrap();
        store.insert("Buy milk", false).unwrap();

        let tasks = store.list(TaskFilter::All).unwrap();
        assert_eq!(tasks[0].description, "Buy milk");
        assert!(!tasks[0].done);
        assert!(tasks[0].id > tasks[1].id);
    }

    #[test]
    fn test_insert_assigns_increasing_ids() {
        let mut store = Store::open_in_memory().unwrap();
        let a = store.insert("a", false).unwrap();
        let b = store.insert("b", false).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert("a", false).unwrap();
        let b = store.insert("b", false).unwrap();
        store.delete(b).unwrap();

        let c = store.insert("c", false).unwrap();
        assert!(c > b);
    }

    #[test]
    fn test_store_accepts_empty_description() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert("", false).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().description, "");
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert("Original", false).unwrap();

        assert!(store.update(id, "Updated", true).unwrap());

        let task = store.get(id).unwrap().unwrap();
        assert_eq!(task, Task::new(id, "Updated", true));
    }

    #[test]
    fn test_update_nonexistent_is_noop() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert("Only", false).unwrap();

        assert!(!store.update(99, "Ghost", true).unwrap());
        assert_eq!(store.list(TaskFilter::All).unwrap(), vec![Task::new(1, "Only", false)]);
    }

    #[test]
    fn test_delete_removes_from_all_queries() {
        let mut store = Store::open_in_memory().unwrap();
        let pending = store.insert("Pending", false).unwrap();
        let done = store.insert("Done", true).unwrap();

        assert!(store.delete(pending).unwrap());
        assert!(store.delete(done).unwrap());

        for filter in TaskFilter::ALL {
            assert!(store.list(filter).unwrap().is_empty());
        }
    }

    #[test]
    fn test_delete_nonexistent_is_noop() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert("Keep", false).unwrap();
        let before: Vec<_> = TaskFilter::ALL.iter().map(|f| store.list(*f).unwrap()).collect();

        assert!(!store.delete(42).unwrap());

        let after: Vec<_> = TaskFilter::ALL.iter().map(|f| store.list(*f).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_count_is_inserts_minus_deletes() {
        let mut store = Store::open_in_memory().unwrap();
        let mut inserted = Vec::new();
        for i in 0..10 {
            inserted.push(store.insert(&format!("task {}", i), i % 3 == 0).unwrap());
        }

        let mut deleted = 0;
        for id in inserted.iter().step_by(3) {
            if store.delete(*id).unwrap() {
                deleted += 1;
            }
        }
        // Second delete of the same id does not count
        assert!(!store.delete(inserted[0]).unwrap());

        assert_eq!(store.list(TaskFilter::All).unwrap().len(), 10 - deleted);
    }

    #[test]
    fn test_pending_and_done_partition_all() {
        let mut store = Store::open_in_memory().unwrap();
        for i in 0..8 {
            store.insert(&format!("task {}", i), i % 2 == 1).unwrap();
        }
        store.update(1, "task 0", true).unwrap();

        let all = ids(&store.list(TaskFilter::All).unwrap());
        let pending = ids(&store.list(TaskFilter::Pending).unwrap());
        let done = ids(&store.list(TaskFilter::Done).unwrap());

        assert!(pending.is_disjoint(&done));
        assert_eq!(pending.union(&done).copied().collect::<HashSet<_>>(), all);
    }

    #[test]
    fn test_toggle_moves_between_pending_and_done() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert("Toggle me", false).unwrap();
        assert!(ids(&store.list(TaskFilter::Pending).unwrap()).contains(&id));

        store.update(id, "Toggle me", true).unwrap();
        assert!(!ids(&store.list(TaskFilter::Pending).unwrap()).contains(&id));
        assert!(ids(&store.list(TaskFilter::Done).unwrap()).contains(&id));

        store.update(id, "Toggle me", false).unwrap();
        assert!(ids(&store.list(TaskFilter::Pending).unwrap()).contains(&id));
        assert!(!ids(&store.list(TaskFilter::Done).unwrap()).contains(&id));
    }

    #[test]
    fn test_buy_milk_scenario() {
        let mut store = Store::open_in_memory().unwrap();

        let id = store.insert("Buy milk", false).unwrap();
        assert_eq!(store.list(TaskFilter::All).unwrap(), vec![Task::new(1, "Buy milk", false)]);

        store.update(id, "Buy milk", true).unwrap();
        assert_eq!(store.list(TaskFilter::Done).unwrap(), vec![Task::new(1, "Buy milk", true)]);
        assert!(store.list(TaskFilter::Pending).unwrap().is_empty());

        store.delete(id).unwrap();
        assert!(store.list(TaskFilter::All).unwrap().is_empty());
    }

    #[test]
    fn test_export_import_keeps_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");

        let mut source = Store::open_in_memory().unwrap();
        source.insert("a", false).unwrap();
        let b = source.insert("b", true).unwrap();
        source.insert("c", false).unwrap();
        source.delete(b).unwrap();
        assert_eq!(source.export_jsonl(&path).unwrap(), 2);

        let mut target = Store::open_in_memory().unwrap();
        assert_eq!(target.import_jsonl(&path).unwrap(), 2);
        assert_eq!(target.list(TaskFilter::All).unwrap(), source.list(TaskFilter::All).unwrap());

        // New inserts continue after the highest imported id
        let next = target.insert("d", false).unwrap();
        assert_eq!(next, 4);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.insert("old", false).unwrap();

        store.upsert(&Task::new(id, "new", true)).unwrap();
        assert_eq!(store.list(TaskFilter::All).unwrap(), vec![Task::new(id, "new", true)]);
    }
}
