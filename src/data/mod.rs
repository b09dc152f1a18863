//! Core data models for the Memtime API
//!
//! This module contains the entities served by the time-tracking API
//! (clients, projects, tasks and time entries), the request bodies used to
//! create and update time entries, and the HTTP client that talks to it.

pub mod memtime;
pub mod page;

pub use memtime::{extract_error_message, ApiError, MemtimeClient, DEFAULT_BASE_URL};
pub use page::{Page, PageRequest};

use serde::{Deserialize, Serialize};

/// Identifier type shared by every API entity
pub type EntityId = u64;

/// A client (customer) owning a set of projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique identifier
    pub id: EntityId,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Lifecycle status as reported by the API (e.g. "active")
    #[serde(default)]
    pub status: String,
    /// ISO 8601 creation timestamp
    #[serde(default)]
    pub created_at: String,
    /// ISO 8601 last update timestamp
    #[serde(default)]
    pub updated_at: String,
}

/// A project belonging to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: EntityId,
    /// The owning client
    pub client_id: EntityId,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// A task belonging to a project, optionally nested under another task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: EntityId,
    /// Parent task ID, 0 for root-level tasks
    #[serde(default)]
    pub parent: EntityId,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Task {
    /// Returns true when the task sits directly under its project
    pub fn is_root(&self) -> bool {
        self.parent == 0
    }
}

/// A tracked span of work on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntityId,
    /// The task this time was spent on
    pub task_id: EntityId,
    /// Owner of the entry (the API key of the user)
    #[serde(default)]
    pub user_id: String,
    pub comment: String,
    /// ISO 8601 start timestamp
    pub start: String,
    /// ISO 8601 end timestamp
    pub end: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl TimeEntry {
    /// Elapsed time formatted for display ("1h 30m", "45m", "0m")
    pub fn duration_label(&self) -> String {
        crate::datetime::format_duration(&self.start, &self.end)
    }
}

/// Body for creating or updating a time entry
///
/// The API accepts the same shape for `POST /time-entries` and
/// `PUT /time-entries/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryInput {
    pub task_id: EntityId,
    pub comment: String,
    /// ISO 8601 start timestamp
    pub start: String,
    /// ISO 8601 end timestamp
    pub end: String,
}

/// A task annotated with the names of its project and client
///
/// Used by the task picker in the time entry form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOption {
    pub task: Task,
    pub project_name: String,
    pub client_name: String,
}

impl TaskOption {
    /// Label shown in the picker, e.g. "Acme / Website / Design"
    pub fn label(&self) -> String {
        format!("{} / {} / {}", self.client_name, self.project_name, self.task.name)
    }
}
