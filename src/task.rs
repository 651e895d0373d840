// Data model for the task list

use serde::{Deserialize, Serialize};

/// A stored task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the store on insert, never reused
    pub id: i64,
    pub description: String,
    pub done: bool,
}

impl Task {
    pub fn new(id: i64, description: impl Into<String>, done: bool) -> Self {
        Self {
            id,
            description: description.into(),
            done,
        }
    }

    /// Copy of this task with the done flag replaced
    pub fn with_done(&self, done: bool) -> Self {
        Self {
            done,
            ..self.clone()
        }
    }

    /// Copy of this task with the description replaced
    pub fn with_description(&self, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..self.clone()
        }
    }
}
