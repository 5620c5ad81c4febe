//! Daemon-wide throughput contribution.

use async_trait::async_trait;
use serde::Serialize;

use super::EngineKind;

/// Bytes/sec totals used by the status overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Throughput {
    pub download: u64,
    pub upload: u64,
    pub seed: u64,
}

impl Throughput {
    pub fn add(&mut self, other: Throughput) {
        self.download = self.download.saturating_add(other.download);
        self.upload = self.upload.saturating_add(other.upload);
        self.seed = self.seed.saturating_add(other.seed);
    }
}

/// Source of a daemon-wide speed figure (torrent daemon combined down/seed
/// speed, NZB queue speed, download-manager controller speed).
///
/// The aggregator asks each source at most once per render, and only when a
/// task of a covered engine is present.
#[async_trait]
pub trait AggregateSpeed: Send + Sync {
    /// Engines whose per-task speed is folded into this source.
    fn covers(&self, kind: EngineKind) -> bool;

    async fn current(&self) -> anyhow::Result<Throughput>;
}
