//! Cancellation: one task, one tag group, or everything with a given status.
//!
//! The service only removes bookkeeping; engine teardown is the adapter's
//! `cancel()`. Membership is re-checked under the registry lock right before
//! acting, so a task promoted or cancelled in the meantime is reported as not
//! found instead of being processed twice.

mod bulk;
mod command;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::admission::AdmissionController;
use crate::command::{target_of, CommandContext};
use crate::error::CoreError;
use crate::permissions::Permissions;
use crate::registry::Registry;
use crate::task::{TagId, TagStop, TaskId, TaskRef, UserId};

pub use bulk::{BulkAction, BulkCancelReply};
pub use command::CancelCommand;

/// Reply to a `/cancel` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum CancelReply {
    Cancelled { id: TaskId },
    /// Bookkeeping removed but the engine call failed.
    EngineError { id: TaskId },
    TagStopped { tag: TagId },
    TagAlreadyStopped { tag: TagId },
    /// Explicit gid that matches nothing.
    NotFound { target: String },
    /// Replied-to message is not an active task.
    NotActive,
    Unauthorized,
    /// No gid and no reply: show usage.
    Usage,
    /// Command addressed to another bot.
    Ignored,
}

/// Reply to a "stop batch" callback (`stopm <starter> <tag>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopBatchReply {
    NotYours,
    Stopped,
    AlreadyStopped,
    Invalid,
}

pub struct CancelService {
    registry: Arc<Registry>,
    admission: Arc<AdmissionController>,
    permissions: Arc<dyn Permissions>,
    bot_name: String,
    pacing: Duration,
}

impl CancelService {
    pub fn new(
        admission: Arc<AdmissionController>,
        permissions: Arc<dyn Permissions>,
        bot_name: impl Into<String>,
        pacing: Duration,
    ) -> Self {
        Self {
            registry: Arc::clone(admission.registry()),
            admission,
            permissions,
            bot_name: bot_name.into(),
            pacing,
        }
    }

    /// Handle a `/cancel` command: explicit id > reply context > usage.
    pub async fn cancel_command(&self, requester: UserId, ctx: &CommandContext) -> CancelReply {
        let gid = match CancelCommand::parse(&ctx.text, &self.bot_name) {
            CancelCommand::OtherBot => return CancelReply::Ignored,
            CancelCommand::Tag(tag) => {
                return match self.cancel_tag(tag).await {
                    TagStop::Stopped => CancelReply::TagStopped { tag },
                    TagStop::AlreadyStopped => CancelReply::TagAlreadyStopped { tag },
                };
            }
            CancelCommand::Gid(gid) => Some(gid),
            CancelCommand::Bare => None,
        };
        match target_of(gid.as_deref(), ctx.reply_to) {
            Some(target) => self.cancel_task(requester, &target).await,
            None => CancelReply::Usage,
        }
    }

    /// Cancel one task after checking that `requester` may do so.
    pub async fn cancel_task(&self, requester: UserId, target: &TaskRef) -> CancelReply {
        let resolved = self
            .registry
            .resolve(target)
            .await
            .map(|(rec, _)| (rec.id, rec.owner_user_id));
        let Some((id, owner)) = resolved else {
            return missing(target);
        };
        if !self.permissions.may_act_on(requester, owner) {
            tracing::info!(task = id, user = requester, "cancel refused");
            return CancelReply::Unauthorized;
        }
        self.cancel_resolved(id, target).await
    }

    /// Second half of [`cancel_task`](Self::cancel_task): `id` was resolved
    /// from `target` but may have left the registry since.
    pub(crate) async fn cancel_resolved(&self, id: TaskId, target: &TaskRef) -> CancelReply {
        match self.cancel_by_id(id).await {
            Ok(()) => CancelReply::Cancelled { id },
            Err(CoreError::Engine { .. }) => CancelReply::EngineError { id },
            Err(_) => {
                tracing::debug!(task = id, "task left the registry before cancel");
                missing(target)
            }
        }
    }

    /// Remove `id` from the registry/queues and ask its engine to stop.
    ///
    /// The removal stands even if the engine call fails, so no stale entry
    /// is left behind. A freed slot is handed to the next queued task.
    pub(crate) async fn cancel_by_id(&self, id: TaskId) -> Result<(), CoreError> {
        let Some((record, location)) = self.registry.lock().await.take(id) else {
            return Err(CoreError::NotFound(id.to_string()));
        };
        tracing::info!(task = id, ?location, "cancelling task");
        let result = record.adapter.cancel().await.map_err(|source| {
            tracing::warn!(task = id, "engine cancel failed: {:#}", source);
            CoreError::Engine { task: id, source }
        });
        self.admission.promote_next().await;
        result
    }

    /// Stop a multi-link batch. Members notice at their next safe point;
    /// no member's cancel operation is invoked from here.
    pub async fn cancel_tag(&self, tag: TagId) -> TagStop {
        let stop = self.registry.lock().await.tags.cancel(tag);
        tracing::info!(tag, ?stop, "tag group cancel");
        stop
    }

    /// Handle `stopm <starter> <tag>`: only the batch starter or a privileged user.
    pub async fn stop_batch_callback(&self, requester: UserId, data: &str) -> StopBatchReply {
        let parts: Vec<&str> = data.split_whitespace().collect();
        let (Some(starter), Some(tag)) = (
            parts.get(1).and_then(|s| s.parse::<UserId>().ok()),
            parts.get(2).and_then(|s| s.parse::<TagId>().ok()),
        ) else {
            return StopBatchReply::Invalid;
        };
        if requester != starter && !self.permissions.is_sudo(requester) {
            return StopBatchReply::NotYours;
        }
        match self.cancel_tag(tag).await {
            TagStop::Stopped => StopBatchReply::Stopped,
            TagStop::AlreadyStopped => StopBatchReply::AlreadyStopped,
        }
    }
}

fn missing(target: &TaskRef) -> CancelReply {
    match target {
        TaskRef::Gid(gid) => CancelReply::NotFound {
            target: gid.clone(),
        },
        TaskRef::Request(_) => CancelReply::NotActive,
    }
}
