//! Task identity, lifecycle status and tag groups.

mod record;
mod status;
mod tags;

pub use record::{Phase, TaskLocation, TaskRecord, TaskSnapshot};
pub use status::{StatusFilter, TaskStatus};
pub use tags::{parse_tag, TagGroups, TagStop, TagToken};

/// Identifier of the request that started the task (the command message id).
pub type TaskId = i64;

/// Chat user identifier.
pub type UserId = i64;

/// Chat identifier; one status view per chat.
pub type ChatId = i64;

/// Six-digit multi-link batch tag.
pub type TagId = u32;

/// How a command names its target task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRef {
    /// Engine gid (or a prefix of it) given in the command text.
    Gid(String),
    /// The originating request the command message replies to.
    Request(TaskId),
}
