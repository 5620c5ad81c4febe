//! Force-start: let one task skip the queue.
//!
//! Force flags only ever go from false to true. A queued task is promoted at
//! once; a task that is not queued keeps the flag for the next decision point
//! (e.g. `begin_upload` honours `force_upload`).

use serde::Serialize;

use crate::command::{target_of, CommandContext};
use crate::task::{TaskLocation, TaskRef, UserId};

use super::AdmissionController;

/// Which phase(s) to force: `fd`, `fu`, or both when no flag is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceMode {
    Download,
    Upload,
    Both,
}

impl ForceMode {
    pub fn parse(flag: &str) -> Option<Self> {
        match flag {
            "fd" => Some(ForceMode::Download),
            "fu" => Some(ForceMode::Upload),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "outcome")]
pub enum ForceOutcome {
    /// No target given and not a reply.
    Usage,
    NotFound { target: String },
    Unauthorized,
    /// Was waiting in the upload queue; now uploading.
    ForcedUpload,
    /// Was waiting in the download queue; upload will queue normally.
    ForcedDownload,
    /// Was waiting in the download queue; upload will also skip the queue.
    ForcedDownloadAndUpload,
    /// Not queued; force upload remembered for the upload phase.
    UploadFlagSet,
    NotInDownloadQueue,
    NotInAnyQueue,
    /// Promoted, but the engine refused to start.
    EngineFailed,
}

/// Parsed `/forcestart [fd|fu] [gid]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceCommand {
    pub mode: ForceMode,
    pub target: Option<TaskRef>,
}

impl ForceCommand {
    pub fn parse(ctx: &CommandContext) -> Self {
        let args = ctx.args();
        let (mode, rest) = match args.first().and_then(|a| ForceMode::parse(a)) {
            Some(mode) => (mode, &args[1..]),
            None => (ForceMode::Both, &args[..]),
        };
        Self {
            mode,
            target: target_of(rest.first().copied(), ctx.reply_to),
        }
    }
}

impl AdmissionController {
    /// Force-start the task named by `target`.
    pub async fn force_start(
        &self,
        requester: UserId,
        target: &TaskRef,
        mode: ForceMode,
    ) -> ForceOutcome {
        let (id, outcome, adapter) = {
            let mut st = self.registry.lock().await;
            let Some((rec, location)) = st.resolve(target) else {
                return ForceOutcome::NotFound {
                    target: describe(target),
                };
            };
            let id = rec.id;
            if !self.permissions.may_act_on(requester, rec.owner_user_id) {
                tracing::info!(task = id, user = requester, "force-start refused");
                return ForceOutcome::Unauthorized;
            }

            if let Some(rec) = st.record_mut(id) {
                if matches!(mode, ForceMode::Download | ForceMode::Both) {
                    rec.force_download = true;
                }
                if matches!(mode, ForceMode::Upload | ForceMode::Both) {
                    rec.force_upload = true;
                }
            }

            let (outcome, promote) = match (mode, location) {
                (ForceMode::Upload, TaskLocation::UploadQueue) => (ForceOutcome::ForcedUpload, true),
                (ForceMode::Upload, _) => (ForceOutcome::UploadFlagSet, false),
                (ForceMode::Download, TaskLocation::DownloadQueue) => {
                    (ForceOutcome::ForcedDownload, true)
                }
                (ForceMode::Download, _) => (ForceOutcome::NotInDownloadQueue, false),
                (ForceMode::Both, TaskLocation::UploadQueue) => (ForceOutcome::ForcedUpload, true),
                (ForceMode::Both, TaskLocation::DownloadQueue) => {
                    (ForceOutcome::ForcedDownloadAndUpload, true)
                }
                (ForceMode::Both, TaskLocation::Active) => (ForceOutcome::NotInAnyQueue, false),
            };
            let adapter = if promote {
                Self::promote_locked(&mut st, id)
            } else {
                None
            };
            (id, outcome, adapter)
        };

        tracing::info!(task = id, ?mode, ?outcome, "force-start");
        if let Some(adapter) = adapter {
            if self.launch(id, adapter).await.is_err() {
                self.promote_next().await;
                return ForceOutcome::EngineFailed;
            }
        }
        outcome
    }

    /// Handle a `/forcestart` command.
    pub async fn force_start_command(&self, requester: UserId, ctx: &CommandContext) -> ForceOutcome {
        let cmd = ForceCommand::parse(ctx);
        match cmd.target {
            Some(target) => self.force_start(requester, &target, cmd.mode).await,
            None => ForceOutcome::Usage,
        }
    }
}

pub(crate) fn describe(target: &TaskRef) -> String {
    match target {
        TaskRef::Gid(gid) => gid.clone(),
        TaskRef::Request(id) => id.to_string(),
    }
}
