//! File selection: pause a torrent/NZB/download-manager task so its owner can
//! pick files, then resume or cancel it.


use serde::Serialize;
use std::sync::Arc;

use crate::button::Button;
use crate::cancel::CancelService;
use crate::command::{split_bot_suffix, target_of, CommandContext};
use crate::error::CoreError;
use crate::permissions::Permissions;
use crate::registry::{snapshot_of, Registry};
use crate::task::{TaskLocation, TaskRef, TaskStatus, UserId};

/// Reply to `/sel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reply")]
pub enum SelectReply {
    /// No base URL configured, so there is no selection page to send users to.
    Disabled,
    Usage,
    NotFound { target: String },
    NotActive,
    Unauthorized,
    /// Not downloading, paused or waiting in the download queue.
    WrongStatus { status: TaskStatus },
    /// Engine still fetching metadata.
    MetadataPending,
    /// Engine cannot pause for selection.
    Unsupported,
    EngineFailed,
    Prompt {
        gid: String,
        link: String,
        buttons: Vec<Button>,
    },
}

/// Reply to a `sel …` button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reply")]
pub enum ConfirmReply {
    /// Task no longer tracked.
    Gone,
    NotYours,
    Pin { code: String },
    Resumed,
    /// Selection closed but the engine refused to resume.
    ResumeFailed,
    Cancelled,
    Invalid,
}

pub struct FileSelector {
    registry: Arc<Registry>,
    cancel: Arc<CancelService>,
    permissions: Arc<dyn Permissions>,
    base_url: Option<String>,
}

/// First four digits of the gid; shown to the user to unlock the selection page.
pub fn pin_code(gid: &str) -> String {
    gid.chars().filter(char::is_ascii_digit).take(4).collect()
}

impl FileSelector {
    pub fn new(
        registry: Arc<Registry>,
        cancel: Arc<CancelService>,
        permissions: Arc<dyn Permissions>,
        base_url: Option<String>,
    ) -> Self {
        Self {
            registry,
            cancel,
            permissions,
            base_url: base_url.filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Handle `/sel [gid]`.
    pub async fn select_command(&self, requester: UserId, ctx: &CommandContext) -> SelectReply {
        let gid = ctx.args().first().map(|a| split_bot_suffix(a).0.to_string());
        match target_of(gid.as_deref(), ctx.reply_to) {
            Some(target) => self.select(requester, &target).await,
            None if !self.enabled() => SelectReply::Disabled,
            None => SelectReply::Usage,
        }
    }

    /// Pause `target` for file selection and return the selection prompt.
    pub async fn select(&self, requester: UserId, target: &TaskRef) -> SelectReply {
        let Some(base_url) = self.base_url.as_deref() else {
            return SelectReply::Disabled;
        };
        let Some((record, location)) = self.registry.resolve(target).await else {
            return match target {
                TaskRef::Gid(gid) => SelectReply::NotFound {
                    target: gid.clone(),
                },
                TaskRef::Request(_) => SelectReply::NotActive,
            };
        };
        if !self.permissions.may_act_on(requester, record.owner_user_id) {
            return SelectReply::Unauthorized;
        }

        let snap = snapshot_of(&record, location).await;
        if !matches!(
            snap.status,
            TaskStatus::Download | TaskStatus::Paused | TaskStatus::QueuedDownload
        ) {
            return SelectReply::WrongStatus {
                status: snap.status,
            };
        }
        if snap.name.starts_with("[METADATA]") || snap.name.starts_with("Trying") {
            return SelectReply::MetadataPending;
        }
        let Some(gid) = snap.gid.filter(|_| record.engine_kind.supports_selection()) else {
            return SelectReply::Unsupported;
        };

        if location == TaskLocation::Active {
            if let Err(e) = record.adapter.pause().await {
                tracing::warn!(task = record.id, "pause for selection failed: {:#}", e);
                return match e.downcast_ref::<CoreError>() {
                    Some(CoreError::Unsupported(_)) => SelectReply::Unsupported,
                    _ => SelectReply::EngineFailed,
                };
            }
        }
        match self.registry.lock().await.record_mut(record.id) {
            Some(r) => r.selecting = true,
            None => return SelectReply::NotActive,
        }
        tracing::info!(task = record.id, %gid, "file selection started");

        let code = pin_code(&gid);
        SelectReply::Prompt {
            link: format!("{}/app/files?gid={}", base_url.trim_end_matches('/'), gid),
            buttons: vec![
                Button::new("Pincode", format!("sel pin {gid} {code}")),
                Button::new("Done Selecting", format!("sel done {gid} {gid}")),
                Button::new("Cancel", format!("sel cancel {gid}")),
            ],
            gid,
        }
    }

    /// Handle `sel pin|done|cancel <gid> [arg]`.
    pub async fn confirm_selection(&self, requester: UserId, data: &str) -> ConfirmReply {
        let parts: Vec<&str> = data.split_whitespace().collect();
        let (Some(&action), Some(&gid)) = (parts.get(1), parts.get(2)) else {
            return ConfirmReply::Invalid;
        };
        let Some((record, location)) = self.registry.get_by_gid(gid).await else {
            return ConfirmReply::Gone;
        };
        if record.owner_user_id != requester {
            return ConfirmReply::NotYours;
        }
        match action {
            "pin" => ConfirmReply::Pin {
                code: parts
                    .get(3)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| pin_code(gid)),
            },
            "done" => {
                if let Some(r) = self.registry.lock().await.record_mut(record.id) {
                    r.selecting = false;
                }
                if location != TaskLocation::Active {
                    return ConfirmReply::Resumed;
                }
                match record.adapter.resume().await {
                    Ok(()) => ConfirmReply::Resumed,
                    Err(e) => {
                        tracing::warn!(task = record.id, "resume after selection failed: {:#}", e);
                        ConfirmReply::ResumeFailed
                    }
                }
            }
            "cancel" => match self.cancel.cancel_by_id(record.id).await {
                Ok(()) | Err(CoreError::Engine { .. }) => ConfirmReply::Cancelled,
                Err(_) => ConfirmReply::Gone,
            },
            _ => ConfirmReply::Invalid,
        }
    }
}
