//! Download and upload queues: FIFO lists of tasks waiting for admission.

use serde::Serialize;
use std::collections::VecDeque;

use crate::task::{TaskId, TaskLocation, TaskRecord};

/// Which queue an entry sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Download,
    Upload,
}

impl QueueKind {
    pub fn location(self) -> TaskLocation {
        match self {
            QueueKind::Download => TaskLocation::DownloadQueue,
            QueueKind::Upload => TaskLocation::UploadQueue,
        }
    }
}

/// Why admission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueReason {
    DownloadLimit,
    UploadLimit,
    SizeLimit,
    UserLimit,
}

/// A queued task and the reason it waits.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub record: TaskRecord,
    pub reason: QueueReason,
}

/// Both queues. Only reachable through the registry lock.
#[derive(Debug, Default)]
pub struct QueueStore {
    download: VecDeque<QueueEntry>,
    upload: VecDeque<QueueEntry>,
}

impl QueueStore {
    fn list(&self, kind: QueueKind) -> &VecDeque<QueueEntry> {
        match kind {
            QueueKind::Download => &self.download,
            QueueKind::Upload => &self.upload,
        }
    }

    fn list_mut(&mut self, kind: QueueKind) -> &mut VecDeque<QueueEntry> {
        match kind {
            QueueKind::Download => &mut self.download,
            QueueKind::Upload => &mut self.upload,
        }
    }

    pub fn push(&mut self, kind: QueueKind, entry: QueueEntry) {
        self.list_mut(kind).push_back(entry);
    }

    /// Queue holding `id`, if any.
    pub fn kind_of(&self, id: TaskId) -> Option<QueueKind> {
        [QueueKind::Download, QueueKind::Upload]
            .into_iter()
            .find(|k| self.list(*k).iter().any(|e| e.record.id == id))
    }

    pub fn get(&self, id: TaskId) -> Option<(QueueKind, &QueueEntry)> {
        let kind = self.kind_of(id)?;
        self.list(kind)
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| (kind, e))
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut QueueEntry> {
        let kind = self.kind_of(id)?;
        self.list_mut(kind).iter_mut().find(|e| e.record.id == id)
    }

    pub fn remove(&mut self, id: TaskId) -> Option<(QueueKind, QueueEntry)> {
        let kind = self.kind_of(id)?;
        let list = self.list_mut(kind);
        let pos = list.iter().position(|e| e.record.id == id)?;
        list.remove(pos).map(|e| (kind, e))
    }

    /// Entries of one queue in admission (FIFO) order.
    pub fn iter(&self, kind: QueueKind) -> impl Iterator<Item = &QueueEntry> {
        self.list(kind).iter()
    }

    pub fn len(&self, kind: QueueKind) -> usize {
        self.list(kind).len()
    }

    pub fn total(&self) -> usize {
        self.download.len() + self.upload.len()
    }
}
