//! Engine adapter boundary.
//!
//! Every task is driven by one adapter (torrent daemon, NZB daemon, download
//! manager, cloud API, sync tool, ...). The core only ever talks to engines
//! through [`EngineAdapter`]; daemon-wide throughput figures are provided by
//! [`AggregateSpeed`] strategies so the status aggregator never branches on
//! engine type.

mod throughput;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::task::TaskStatus;

pub use throughput::{AggregateSpeed, Throughput};

/// Backend that drives a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    Torrent,
    Nzb,
    DownloadManager,
    Direct,
    CloudApi,
    SyncTool,
    Telegram,
    YtDlp,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Torrent => "torrent",
            EngineKind::Nzb => "nzb",
            EngineKind::DownloadManager => "download-manager",
            EngineKind::Direct => "direct",
            EngineKind::CloudApi => "cloud-api",
            EngineKind::SyncTool => "sync-tool",
            EngineKind::Telegram => "telegram",
            EngineKind::YtDlp => "yt-dlp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "torrent" => Some(EngineKind::Torrent),
            "nzb" => Some(EngineKind::Nzb),
            "download-manager" | "jd" => Some(EngineKind::DownloadManager),
            "direct" => Some(EngineKind::Direct),
            "cloud-api" | "gdrive" => Some(EngineKind::CloudApi),
            "sync-tool" | "rclone" => Some(EngineKind::SyncTool),
            "telegram" => Some(EngineKind::Telegram),
            "yt-dlp" => Some(EngineKind::YtDlp),
            _ => None,
        }
    }

    /// Engines whose tasks can be paused for file selection.
    pub fn supports_selection(self) -> bool {
        matches!(
            self,
            EngineKind::Torrent | EngineKind::Nzb | EngineKind::DownloadManager
        )
    }
}

/// Per-task handle into an engine.
///
/// `cancel` must tolerate being called on a task that already finished.
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Begin (or continue) work for the task's current phase.
    async fn start(&self) -> anyhow::Result<()>;

    /// Stop the task and release engine resources.
    async fn cancel(&self) -> anyhow::Result<()>;

    /// Current lifecycle status, queried from the engine.
    async fn status(&self) -> TaskStatus;

    /// Per-task speed in bytes/sec, for engines that report one.
    /// Daemon-backed engines return `None` and are covered by an [`AggregateSpeed`].
    fn speed(&self) -> Option<u64> {
        None
    }

    /// Engine-assigned id (gid / info hash), once known.
    fn identifier(&self) -> Option<String>;

    /// Display name of the transfer.
    fn name(&self) -> String;

    async fn pause(&self) -> anyhow::Result<()> {
        Err(CoreError::Unsupported("pause").into())
    }

    async fn resume(&self) -> anyhow::Result<()> {
        Err(CoreError::Unsupported("resume").into())
    }
}
