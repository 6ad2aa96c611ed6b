use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::TaskId;

/// Task urgency bucket. Stored and serialized by its capitalized name.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Task lifecycle state.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// A persisted task. `id` and `created_at` are assigned by the store at
/// insert time and never change afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub created_at: String,
}

/// Creation input. `title` stays optional here so that a missing title is a
/// validation failure with its own message rather than a deserialization
/// error; everything else falls back to a default when absent.
#[derive(Clone, Debug, Default)]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<TaskStatus>,
}

/// Partial update. Status and priority are the only updatable fields; an
/// all-`None` patch is rejected by the store rather than treated as a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none()
    }
}

/// Conjunctive selection over the task relation. Absent fields impose no
/// constraint.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub sort: SortOrder,
}

/// List ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Due date ascending. Rows without a due date sort wherever the
    /// datastore puts NULLs.
    DueDate,
    /// Creation time descending, newest first.
    #[default]
    Newest,
}

impl SortOrder {
    /// Map the `sort` query parameter. Only the literal "due_date" selects
    /// due-date ordering; anything else falls back to newest-first.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("due_date") => Self::DueDate,
            _ => Self::Newest,
        }
    }
}
