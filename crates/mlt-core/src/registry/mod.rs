//! Task registry: the single source of truth for what is active or queued.
//!
//! Active tasks, both queues, the tag group set and the per-chat status views
//! all live in one [`RegistryState`] behind one `tokio::sync::Mutex`, so moving
//! a task between the queues and the active map is atomic. Engine calls never
//! happen while the lock is held: callers copy the adapter handles they need,
//! drop the guard, then call out.

mod queue;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use tokio::sync::{Mutex, MutexGuard};

use crate::status::StatusView;
use crate::task::{
    ChatId, Phase, StatusFilter, TagGroups, TaskId, TaskLocation, TaskRecord, TaskRef,
    TaskSnapshot, TaskStatus, UserId,
};

pub use queue::{QueueEntry, QueueKind, QueueReason, QueueStore};

/// Everything guarded by the registry mutex.
#[derive(Debug, Default)]
pub struct RegistryState {
    tasks: HashMap<TaskId, TaskRecord>,
    pub(crate) queues: QueueStore,
    pub(crate) tags: TagGroups,
    pub(crate) views: HashMap<ChatId, StatusView>,
    next_seq: u64,
}

impl RegistryState {
    /// Where `id` lives, if anywhere.
    pub fn location(&self, id: TaskId) -> Option<TaskLocation> {
        if self.tasks.contains_key(&id) {
            return Some(TaskLocation::Active);
        }
        self.queues.kind_of(id).map(QueueKind::location)
    }

    /// Stamp a new record with its display order. Records moving between
    /// queue and registry keep their original stamp.
    pub(crate) fn stamp(&mut self, record: &mut TaskRecord) {
        if record.seq == 0 {
            self.next_seq += 1;
            record.seq = self.next_seq;
        }
    }

    /// Insert into the active map. Refused if the id is already tracked anywhere.
    pub(crate) fn insert_active(&mut self, mut record: TaskRecord) -> bool {
        if self.location(record.id).is_some() {
            return false;
        }
        self.stamp(&mut record);
        self.tasks.insert(record.id, record);
        true
    }

    /// Append to a queue. Refused if the id is already tracked anywhere.
    pub(crate) fn enqueue(&mut self, kind: QueueKind, mut entry: QueueEntry) -> bool {
        if self.location(entry.record.id).is_some() {
            return false;
        }
        self.stamp(&mut entry.record);
        self.queues.push(kind, entry);
        true
    }

    pub fn active(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(&id)
    }

    pub(crate) fn active_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord> {
        self.tasks.get_mut(&id)
    }

    pub(crate) fn remove_active(&mut self, id: TaskId) -> Option<TaskRecord> {
        self.tasks.remove(&id)
    }

    /// Record for `id`, whether active or queued.
    pub fn record(&self, id: TaskId) -> Option<(&TaskRecord, TaskLocation)> {
        if let Some(r) = self.tasks.get(&id) {
            return Some((r, TaskLocation::Active));
        }
        self.queues
            .get(id)
            .map(|(kind, e)| (&e.record, kind.location()))
    }

    pub(crate) fn record_mut(&mut self, id: TaskId) -> Option<&mut TaskRecord> {
        if self.tasks.contains_key(&id) {
            return self.tasks.get_mut(&id);
        }
        self.queues.get_mut(id).map(|e| &mut e.record)
    }

    /// Linear scan by engine gid over active and queued records.
    pub fn find_gid(&self, gid: &str) -> Option<(&TaskRecord, TaskLocation)> {
        self.ordered(None)
            .into_iter()
            .find(|(r, _)| r.matches_gid(gid))
    }

    pub fn resolve(&self, target: &TaskRef) -> Option<(&TaskRecord, TaskLocation)> {
        match target {
            TaskRef::Gid(gid) => self.find_gid(gid),
            TaskRef::Request(id) => self.record(*id),
        }
    }

    /// Remove `id` from wherever it lives.
    pub(crate) fn take(&mut self, id: TaskId) -> Option<(TaskRecord, TaskLocation)> {
        if let Some(r) = self.tasks.remove(&id) {
            return Some((r, TaskLocation::Active));
        }
        self.queues
            .remove(id)
            .map(|(kind, e)| (e.record, kind.location()))
    }

    /// Active tasks per phase: (downloading, uploading).
    pub fn active_counts(&self) -> (usize, usize) {
        self.tasks.values().fold((0, 0), |(dl, up), r| match r.phase {
            Phase::Download => (dl + 1, up),
            Phase::Upload => (dl, up + 1),
        })
    }

    /// Active plus queued tasks.
    pub fn total(&self) -> usize {
        self.tasks.len() + self.queues.total()
    }

    /// All tracked tasks (optionally of one owner) in submission order.
    pub fn ordered(&self, owner: Option<UserId>) -> Vec<(&TaskRecord, TaskLocation)> {
        let mut all: Vec<(&TaskRecord, TaskLocation)> = self
            .tasks
            .values()
            .map(|r| (r, TaskLocation::Active))
            .chain(
                self.queues
                    .iter(QueueKind::Download)
                    .map(|e| (&e.record, TaskLocation::DownloadQueue)),
            )
            .chain(
                self.queues
                    .iter(QueueKind::Upload)
                    .map(|e| (&e.record, TaskLocation::UploadQueue)),
            )
            .filter(|(r, _)| owner.map_or(true, |o| r.owner_user_id == o))
            .collect();
        all.sort_by_key(|(r, _)| r.seq);
        all
    }

    /// Owned copies of [`RegistryState::ordered`], for use after the lock is released.
    pub(crate) fn handles(&self, owner: Option<UserId>) -> Vec<(TaskRecord, TaskLocation)> {
        self.ordered(owner)
            .into_iter()
            .map(|(r, loc)| (r.clone(), loc))
            .collect()
    }
}

/// Process-wide registry service.
#[derive(Debug, Default)]
pub struct Registry {
    state: Mutex<RegistryState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the registry lock for a multi-step operation.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().await
    }

    /// Register an active task. Returns false if the id is already tracked.
    pub async fn register(&self, record: TaskRecord) -> bool {
        let id = record.id;
        let inserted = self.lock().await.insert_active(record);
        if !inserted {
            tracing::debug!(task = id, "register refused: task already tracked");
        }
        inserted
    }

    pub async fn get(&self, id: TaskId) -> Option<(TaskRecord, TaskLocation)> {
        self.lock().await.record(id).map(|(r, loc)| (r.clone(), loc))
    }

    pub async fn get_by_gid(&self, gid: &str) -> Option<(TaskRecord, TaskLocation)> {
        self.lock()
            .await
            .find_gid(gid)
            .map(|(r, loc)| (r.clone(), loc))
    }

    pub async fn resolve(&self, target: &TaskRef) -> Option<(TaskRecord, TaskLocation)> {
        self.lock()
            .await
            .resolve(target)
            .map(|(r, loc)| (r.clone(), loc))
    }

    pub async fn remove(&self, id: TaskId) -> Option<TaskRecord> {
        self.lock().await.take(id).map(|(r, _)| r)
    }

    pub async fn location(&self, id: TaskId) -> Option<TaskLocation> {
        self.lock().await.location(id)
    }

    pub async fn total(&self) -> usize {
        self.lock().await.total()
    }

    /// True while the batch tag is registered.
    pub async fn tag_active(&self, tag: crate::task::TagId) -> bool {
        self.lock().await.tags.contains(tag)
    }

    /// Snapshot of tracked tasks matching `filter` and `owner`.
    ///
    /// The membership snapshot is taken under the lock; engine statuses are
    /// queried after it is released. Tasks added afterwards are not included.
    pub async fn list(&self, filter: StatusFilter, owner: Option<UserId>) -> Vec<TaskSnapshot> {
        let handles = self.lock().await.handles(owner);
        let mut out = Vec::with_capacity(handles.len());
        for (record, location) in handles {
            let snap = snapshot_of(&record, location).await;
            if filter.matches(snap.status) {
                out.push(snap);
            }
        }
        out
    }
}

/// Query the engine for one task's status. Queued tasks report their queue
/// without touching the engine.
pub(crate) async fn snapshot_of(record: &TaskRecord, location: TaskLocation) -> TaskSnapshot {
    let status = match location {
        TaskLocation::Active => record.adapter.status().await,
        TaskLocation::DownloadQueue => TaskStatus::QueuedDownload,
        TaskLocation::UploadQueue => TaskStatus::QueuedUpload,
    };
    TaskSnapshot {
        id: record.id,
        gid: record.gid(),
        name: record.name(),
        owner_user_id: record.owner_user_id,
        engine_kind: record.engine_kind,
        status,
        speed: record.adapter.speed(),
        location,
    }
}
