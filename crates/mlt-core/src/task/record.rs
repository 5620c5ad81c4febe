//! Task record and the snapshots handed to renderers.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::engine::{EngineAdapter, EngineKind};

use super::{TagId, TaskId, TaskStatus, UserId};

/// Which half of the transfer the task is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Download,
    Upload,
}

/// Where a task currently lives. A task is in exactly one place until it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskLocation {
    Active,
    DownloadQueue,
    UploadQueue,
}

/// One unit of work: identity, ownership, force flags and the adapter that drives it.
#[derive(Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub owner_user_id: UserId,
    pub engine_kind: EngineKind,
    /// Size in bytes when known up front; used by limit checks.
    pub size: Option<u64>,
    pub tag_group: Option<TagId>,
    pub force_download: bool,
    pub force_upload: bool,
    pub phase: Phase,
    /// Set while the owner is choosing files (task paused by the selector).
    pub selecting: bool,
    pub(crate) seq: u64,
    pub(crate) adapter: Arc<dyn EngineAdapter>,
}

impl TaskRecord {
    pub fn new(
        id: TaskId,
        owner_user_id: UserId,
        engine_kind: EngineKind,
        adapter: Arc<dyn EngineAdapter>,
    ) -> Self {
        Self {
            id,
            owner_user_id,
            engine_kind,
            size: None,
            tag_group: None,
            force_download: false,
            force_upload: false,
            phase: Phase::Download,
            selecting: false,
            seq: 0,
            adapter,
        }
    }

    /// Engine-assigned id; absent until the engine has accepted the task.
    pub fn gid(&self) -> Option<String> {
        self.adapter.identifier()
    }

    pub fn name(&self) -> String {
        self.adapter.name()
    }

    pub fn adapter(&self) -> &Arc<dyn EngineAdapter> {
        &self.adapter
    }

    /// True if `gid` identifies this task. Shortened gids (prefixes) are accepted.
    pub(crate) fn matches_gid(&self, gid: &str) -> bool {
        !gid.is_empty() && self.gid().is_some_and(|own| own.starts_with(gid))
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("gid", &self.gid())
            .field("owner_user_id", &self.owner_user_id)
            .field("engine_kind", &self.engine_kind)
            .field("tag_group", &self.tag_group)
            .field("force_download", &self.force_download)
            .field("force_upload", &self.force_upload)
            .field("phase", &self.phase)
            .finish()
    }
}

/// Point-in-time view of a task, with its status already queried from the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub gid: Option<String>,
    pub name: String,
    pub owner_user_id: UserId,
    pub engine_kind: EngineKind,
    pub status: TaskStatus,
    /// Per-task speed, if the engine reports one.
    pub speed: Option<u64>,
    pub location: TaskLocation,
}
