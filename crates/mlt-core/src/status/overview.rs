//! Overview mode: counts per status bucket and combined throughput.

use serde::Serialize;
use std::sync::Arc;

use crate::button::Button;
use crate::engine::{AggregateSpeed, Throughput};
use crate::task::{TaskSnapshot, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub status: TaskStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    /// Every bucket, in [`TaskStatus::ALL`] order, zeros included.
    pub counts: Vec<BucketCount>,
    pub throughput: Throughput,
    pub buttons: Vec<Button>,
}

impl Overview {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts
            .iter()
            .find(|b| b.status == status)
            .map_or(0, |b| b.count)
    }
}

/// Fold snapshots and daemon-wide sources into an overview.
///
/// Tasks of engines covered by a source contribute through that source only,
/// once, however many of them are present. Other tasks add their own speed.
pub(crate) async fn compute(
    snapshots: &[TaskSnapshot],
    sources: &[Arc<dyn AggregateSpeed>],
) -> (Vec<BucketCount>, Throughput) {
    let mut counts: Vec<BucketCount> = TaskStatus::ALL
        .into_iter()
        .map(|status| BucketCount { status, count: 0 })
        .collect();
    let mut total = Throughput::default();

    for snap in snapshots {
        if let Some(bucket) = counts.iter_mut().find(|b| b.status == snap.status) {
            bucket.count += 1;
        }
        if sources.iter().any(|s| s.covers(snap.engine_kind)) {
            continue;
        }
        let speed = snap.speed.unwrap_or(0);
        match snap.status {
            TaskStatus::Download => total.download = total.download.saturating_add(speed),
            TaskStatus::Upload => total.upload = total.upload.saturating_add(speed),
            _ => {}
        }
    }

    for source in sources {
        if !snapshots.iter().any(|s| source.covers(s.engine_kind)) {
            continue;
        }
        match source.current().await {
            Ok(t) => total.add(t),
            Err(e) => tracing::warn!("daemon speed query failed: {:#}", e),
        }
    }

    (counts, total)
}
