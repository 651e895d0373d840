// Status filter for task queries

use eyre::{Result, eyre};
use std::str::FromStr;

/// Which subset of tasks a query selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Done,
}

impl TaskFilter {
    /// Every filter, in the order the live store publishes them
    pub const ALL: [TaskFilter; 3] = [TaskFilter::All, TaskFilter::Pending, TaskFilter::Done];

    pub(crate) fn to_sql(self) -> &'static str {
        match self {
            TaskFilter::All => "SELECT * FROM tasks ORDER BY id DESC",
            TaskFilter::Pending => "SELECT * FROM tasks WHERE done=false ORDER BY id DESC",
            TaskFilter::Done => "SELECT * FROM tasks WHERE done=true ORDER BY id DESC",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskFilter {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TaskFilter::All),
            "pending" => Ok(TaskFilter::Pending),
            "done" => Ok(TaskFilter::Done),
            other => Err(eyre!("Unknown filter: {} (expected all, pending or done)", other)),
        }
    }
}
