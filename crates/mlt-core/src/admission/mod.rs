//! Admission: decide whether a submitted task starts now or waits in a queue.
//!
//! Decisions are taken under the registry lock so a task moves between queue
//! and active map atomically. Engine `start()` calls happen after the lock is
//! released. Every time a slot frees up (task finished, cancelled, moved to
//! its upload phase) the controller promotes queued entries in FIFO order,
//! upload queue first.

mod force;


use serde::Serialize;
use std::sync::Arc;

use crate::config::QueueLimits;
use crate::engine::{EngineAdapter, EngineKind};
use crate::error::CoreError;
use crate::permissions::Permissions;
use crate::registry::{QueueEntry, QueueKind, QueueReason, Registry, RegistryState};
use crate::task::{Phase, TaskId, TaskRecord};

pub use force::{ForceMode, ForceOutcome};

/// External quota checks (duplicate in progress, size, per-user limits).
///
/// Called with the registry lock held, on submission and again for each
/// queued download at promotion, so implementations must not block.
pub trait LimitChecker: Send + Sync {
    /// `None` if the task may run, otherwise why it has to wait.
    fn check(&self, record: &TaskRecord) -> Option<QueueReason>;
}

/// Limit checker that never refuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimits;

impl LimitChecker for NoLimits {
    fn check(&self, _record: &TaskRecord) -> Option<QueueReason> {
        None
    }
}

/// A task offered for admission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub record: TaskRecord,
    /// Skip every queue check (the submitter asked to run immediately).
    pub force_run: bool,
}

impl Submission {
    pub fn new(record: TaskRecord) -> Self {
        Self {
            record,
            force_run: false,
        }
    }

    pub fn force_run(mut self) -> Self {
        self.force_run = true;
        self
    }
}

/// Outcome of a submission or phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "admission", content = "reason")]
pub enum Admission {
    Started,
    Queued(QueueReason),
}

pub struct AdmissionController {
    registry: Arc<Registry>,
    limits: QueueLimits,
    checker: Arc<dyn LimitChecker>,
    permissions: Arc<dyn Permissions>,
}

impl AdmissionController {
    pub fn new(
        registry: Arc<Registry>,
        limits: QueueLimits,
        checker: Arc<dyn LimitChecker>,
        permissions: Arc<dyn Permissions>,
    ) -> Self {
        Self {
            registry,
            limits,
            checker,
            permissions,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// True if another task may run in `kind`'s phase. `exclude` is left out
    /// of the counts (the task asking for the slot).
    fn slot_free(&self, st: &RegistryState, kind: QueueKind, exclude: Option<TaskId>) -> bool {
        let (mut dl, mut up) = st.active_counts();
        if let Some(rec) = exclude.and_then(|id| st.active(id)) {
            match rec.phase {
                Phase::Download => dl -= 1,
                Phase::Upload => up -= 1,
            }
        }
        if self.limits.all.is_some_and(|all| dl + up >= all) {
            return false;
        }
        match kind {
            QueueKind::Download => !self.limits.download.is_some_and(|max| dl >= max),
            QueueKind::Upload => !self.limits.upload.is_some_and(|max| up >= max),
        }
    }

    /// Admit a new task: start it now, or queue it with the first failing reason.
    pub async fn submit(&self, submission: Submission) -> Result<Admission, CoreError> {
        let Submission { record, force_run } = submission;
        let id = record.id;
        let bypass = force_run || record.force_download;

        let decision = {
            let mut st = self.registry.lock().await;
            if st.location(id).is_some() {
                return Err(CoreError::AlreadyTracked(id));
            }
            let reason = if bypass {
                None
            } else {
                self.checker.check(&record).or_else(|| {
                    (!self.slot_free(&st, QueueKind::Download, None))
                        .then_some(QueueReason::DownloadLimit)
                })
            };
            match reason {
                Some(reason) => {
                    st.enqueue(QueueKind::Download, QueueEntry { record, reason });
                    Admission::Queued(reason)
                }
                None => {
                    let adapter = Arc::clone(&record.adapter);
                    st.insert_active(record);
                    drop(st);
                    if let Err(e) = self.launch(id, adapter).await {
                        self.promote_next().await;
                        return Err(e);
                    }
                    Admission::Started
                }
            }
        };

        match decision {
            Admission::Started => tracing::info!(task = id, "task admitted"),
            Admission::Queued(reason) => {
                tracing::info!(task = id, ?reason, "task queued for download")
            }
        }
        Ok(decision)
    }

    /// Download finished: hand the task to its uploader. The task keeps running
    /// if it was force-started for upload or an upload slot is free; otherwise
    /// it moves to the upload queue. Either way a download slot frees up.
    ///
    /// From here on the record reports `upload_kind`, so throughput is
    /// attributed to the uploader rather than the download daemon.
    pub async fn begin_upload(
        &self,
        id: TaskId,
        uploader: Arc<dyn EngineAdapter>,
        upload_kind: EngineKind,
    ) -> Result<Admission, CoreError> {
        let decision = {
            let mut st = self.registry.lock().await;
            let Some(force_upload) = st.active(id).map(|r| r.force_upload) else {
                return Err(CoreError::NotFound(id.to_string()));
            };
            if force_upload || self.slot_free(&st, QueueKind::Upload, Some(id)) {
                if let Some(rec) = st.active_mut(id) {
                    rec.phase = Phase::Upload;
                    rec.engine_kind = upload_kind;
                    rec.adapter = Arc::clone(&uploader);
                }
                Admission::Started
            } else {
                if let Some(mut rec) = st.remove_active(id) {
                    rec.phase = Phase::Upload;
                    rec.engine_kind = upload_kind;
                    rec.adapter = Arc::clone(&uploader);
                    st.enqueue(
                        QueueKind::Upload,
                        QueueEntry {
                            record: rec,
                            reason: QueueReason::UploadLimit,
                        },
                    );
                }
                Admission::Queued(QueueReason::UploadLimit)
            }
        };

        let result = match decision {
            Admission::Started => {
                tracing::info!(task = id, "upload started");
                self.launch(id, uploader).await.map(|()| decision)
            }
            Admission::Queued(_) => {
                tracing::info!(task = id, "task queued for upload");
                Ok(decision)
            }
        };
        self.promote_next().await;
        result
    }

    /// Task reached a terminal state: drop it and admit whatever can run now.
    pub async fn finish(&self, id: TaskId) -> Option<TaskRecord> {
        let removed = self.registry.lock().await.take(id).map(|(r, _)| r);
        if removed.is_some() {
            tracing::info!(task = id, "task finished");
            self.promote_next().await;
        }
        removed
    }

    /// Promote queued entries whose slot and limits now allow them to run.
    /// Returns the ids that were started.
    pub async fn promote_next(&self) -> Vec<TaskId> {
        let mut started = Vec::new();
        loop {
            let batch = self.pick_promotable().await;
            if batch.is_empty() {
                break;
            }
            let mut any_failed = false;
            for (id, adapter) in batch {
                tracing::info!(task = id, "promoted from queue");
                match self.launch(id, adapter).await {
                    Ok(()) => started.push(id),
                    Err(_) => any_failed = true,
                }
            }
            if !any_failed {
                break;
            }
        }
        started
    }

    async fn pick_promotable(&self) -> Vec<(TaskId, Arc<dyn EngineAdapter>)> {
        let mut st = self.registry.lock().await;
        let mut picked = Vec::new();
        for kind in [QueueKind::Upload, QueueKind::Download] {
            let waiting: Vec<TaskId> = st.queues.iter(kind).map(|e| e.record.id).collect();
            for id in waiting {
                if !self.slot_free(&st, kind, None) {
                    break;
                }
                let still_limited = st.queues.get(id).is_some_and(|(_, e)| {
                    kind == QueueKind::Download && self.checker.check(&e.record).is_some()
                });
                if still_limited {
                    continue;
                }
                if let Some((_, entry)) = st.queues.remove(id) {
                    picked.push((id, Arc::clone(&entry.record.adapter)));
                    st.insert_active(entry.record);
                }
            }
        }
        picked
    }

    /// Move a queued task straight into the registry, ignoring limits.
    /// Returns the adapter to start, or None if `id` is not queued.
    pub(crate) fn promote_locked(
        st: &mut RegistryState,
        id: TaskId,
    ) -> Option<Arc<dyn EngineAdapter>> {
        let (_, entry) = st.queues.remove(id)?;
        let adapter = Arc::clone(&entry.record.adapter);
        st.insert_active(entry.record);
        Some(adapter)
    }

    /// Call the engine's `start()`. On failure the task is dropped from the
    /// registry so it does not hold a slot.
    ///
    /// A task with a file selection pending is paused again right away; it
    /// stays paused until the selection is confirmed.
    async fn launch(&self, id: TaskId, adapter: Arc<dyn EngineAdapter>) -> Result<(), CoreError> {
        if let Err(source) = adapter.start().await {
            tracing::warn!(task = id, "engine start failed: {:#}", source);
            self.registry.lock().await.take(id);
            return Err(CoreError::Engine { task: id, source });
        }
        let selecting = self
            .registry
            .lock()
            .await
            .active(id)
            .is_some_and(|r| r.selecting);
        if selecting {
            tracing::debug!(task = id, "holding task for file selection");
            if let Err(e) = adapter.pause().await {
                tracing::warn!(task = id, "pause for file selection failed: {:#}", e);
            }
        }
        Ok(())
    }
}
