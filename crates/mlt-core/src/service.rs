//! `TaskCore`: every service wired together from one [`MltConfig`], plus
//! dispatch of bot commands and button callbacks to the right service.

use serde::Serialize;
use std::sync::Arc;

use crate::admission::{AdmissionController, ForceOutcome, LimitChecker, NoLimits};
use crate::batch::BatchRunner;
use crate::cancel::{BulkCancelReply, CancelReply, CancelService, StopBatchReply};
use crate::command::{split_bot_suffix, CommandContext};
use crate::config::MltConfig;
use crate::engine::AggregateSpeed;
use crate::permissions::{ConfigPermissions, Permissions};
use crate::registry::Registry;
use crate::select::{ConfirmReply, FileSelector, SelectReply};
use crate::status::{StatusBoard, StatusReply};
use crate::task::{ChatId, UserId};

/// Reply to a chat command, by command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "command", content = "reply")]
pub enum CommandReply {
    Cancel(CancelReply),
    CancelAll(BulkCancelReply),
    ForceStart(ForceOutcome),
    Status(StatusReply),
    Select(SelectReply),
    /// Not a command this core handles, or addressed to another bot.
    Ignored,
}

/// Reply to a button callback, by payload prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "callback", content = "reply")]
pub enum CallbackReply {
    Status(StatusReply),
    CancelAll(BulkCancelReply),
    StopBatch(StopBatchReply),
    Select(ConfirmReply),
    Unknown,
}

pub struct TaskCore {
    pub registry: Arc<Registry>,
    pub admission: Arc<AdmissionController>,
    pub cancel: Arc<CancelService>,
    pub status: StatusBoard,
    pub selector: FileSelector,
    pub batches: BatchRunner,
    bot_name: String,
}

impl TaskCore {
    pub fn from_config(cfg: &MltConfig) -> Self {
        Self::with_checker(cfg, Arc::new(NoLimits))
    }

    /// Wire the services with an external limit checker.
    pub fn with_checker(cfg: &MltConfig, checker: Arc<dyn LimitChecker>) -> Self {
        let permissions: Arc<dyn Permissions> = Arc::new(ConfigPermissions::from_config(cfg));
        let registry = Arc::new(Registry::new());
        let admission = Arc::new(AdmissionController::new(
            Arc::clone(&registry),
            cfg.queue_limits(),
            checker,
            Arc::clone(&permissions),
        ));
        let cancel = Arc::new(CancelService::new(
            Arc::clone(&admission),
            Arc::clone(&permissions),
            cfg.bot_name.clone(),
            cfg.bulk_cancel_delay(),
        ));
        let status = StatusBoard::new(
            Arc::clone(&registry),
            Arc::clone(&permissions),
            cfg.status_limit,
            cfg.status_update_interval(),
        );
        let selector = FileSelector::new(
            Arc::clone(&registry),
            Arc::clone(&cancel),
            Arc::clone(&permissions),
            cfg.base_url.clone(),
        );
        let batches = BatchRunner::new(Arc::clone(&admission), cfg.multi_link_delay());
        tracing::debug!(limits = ?cfg.queue_limits(), "task core ready");
        Self {
            registry,
            admission,
            cancel,
            status,
            selector,
            batches,
            bot_name: cfg.bot_name.clone(),
        }
    }

    pub fn with_speed_source(mut self, source: Arc<dyn AggregateSpeed>) -> Self {
        self.status = self.status.with_source(source);
        self
    }

    /// Route a chat command to its service.
    pub async fn handle_command(
        &self,
        requester: UserId,
        chat_id: ChatId,
        ctx: &CommandContext,
    ) -> CommandReply {
        let Some(word) = ctx.text.split_whitespace().next() else {
            return CommandReply::Ignored;
        };
        let Some(word) = word.strip_prefix('/') else {
            return CommandReply::Ignored;
        };
        let (word, bot) = split_bot_suffix(word);
        if bot.is_some_and(|b| !b.is_empty() && !self.bot_name.is_empty() && b != self.bot_name) {
            return CommandReply::Ignored;
        }
        // `/cancel_<gid>` carries its argument in the command word.
        let name = word.split_once('_').map_or(word, |(head, _)| head);
        match name {
            "cancel" | "c" => CommandReply::Cancel(self.cancel.cancel_command(requester, ctx).await),
            "cancelall" => CommandReply::CancelAll(self.cancel.cancel_all_buttons(requester).await),
            "forcestart" | "fs" => {
                CommandReply::ForceStart(self.admission.force_start_command(requester, ctx).await)
            }
            "status" | "s" => {
                CommandReply::Status(self.status.status_command(requester, chat_id, ctx).await)
            }
            "sel" | "select" => {
                CommandReply::Select(self.selector.select_command(requester, ctx).await)
            }
            _ => CommandReply::Ignored,
        }
    }

    /// Route a button callback by its payload prefix.
    pub async fn handle_callback(&self, requester: UserId, data: &str) -> CallbackReply {
        match data.split_whitespace().next() {
            Some("status") => CallbackReply::Status(self.status.callback(data).await),
            Some("canall") => CallbackReply::CancelAll(self.cancel.bulk_callback(requester, data).await),
            Some("stopm") => {
                CallbackReply::StopBatch(self.cancel.stop_batch_callback(requester, data).await)
            }
            Some("sel") => {
                CallbackReply::Select(self.selector.confirm_selection(requester, data).await)
            }
            _ => CallbackReply::Unknown,
        }
    }
}
