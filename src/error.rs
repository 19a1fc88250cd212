//! Error types of this crate

use thiserror::Error;

use crate::task::TaskId;
use crate::task_list::TaskListId;

/// Errors from the task model and from the backends it talks to
#[derive(Debug, Error)]
pub enum Error {
    /// A backend (source registry, calendar client, accounts service) failed to perform an operation
    #[error("Backend operation failed: {0}")]
    Backend(String),

    /// The operation has been cancelled before it completed
    #[error("Operation cancelled")]
    Cancelled,

    #[error("No task list with id {0}")]
    UnknownList(TaskListId),

    #[error("No task with id {0}")]
    UnknownTask(TaskId),

    #[error("No storage with id {0}")]
    UnknownStorage(String),

    #[error("No source with uid {0}")]
    UnknownSource(String),

    /// The source of this list has not been connected (yet)
    #[error("No connected client for source {0}")]
    NoClient(String),

    /// The task does not belong to any task list
    #[error("Task {0} has no parent list")]
    Orphan(TaskId),

    #[error("Invalid iCal data: {0}")]
    Ical(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error only tells the operation has been cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
