// Tasklist - local task tracking with a SQLite store and live queries

pub mod config;
pub mod coordinator;
pub mod filter;
pub mod jsonl;
pub mod live;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use config::Config;
pub use coordinator::TaskCoordinator;
pub use filter::TaskFilter;
pub use live::{LiveQuery, LiveStore};
pub use store::Store;
pub use task::Task;
