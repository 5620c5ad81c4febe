//! Errors raised by core operations.
//!
//! Most user-facing results (not found, refused, already stopped) are reported
//! through outcome enums rather than errors; `CoreError` covers the cases a
//! caller has to handle as a failed operation.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task {0} is already tracked")]
    AlreadyTracked(TaskId),
    #[error("user {user} is not allowed to act on task {task}")]
    Unauthorized { user: i64, task: TaskId },
    #[error("engine call failed for task {task}: {source}")]
    Engine {
        task: TaskId,
        #[source]
        source: anyhow::Error,
    },
    #[error("operation not supported by engine: {0}")]
    Unsupported(&'static str),
}
