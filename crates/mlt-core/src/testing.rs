//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::admission::{LimitChecker, Submission};
use crate::engine::{EngineAdapter, EngineKind};
use crate::permissions::ConfigPermissions;
use crate::registry::QueueReason;
use crate::task::{TaskId, TaskRecord, TaskStatus, UserId};

pub(crate) const OWNER: UserId = 1;
pub(crate) const SUDO: UserId = 2;

pub(crate) fn perms() -> Arc<ConfigPermissions> {
    Arc::new(ConfigPermissions::new(OWNER, vec![SUDO]))
}

/// Engine that records every call it receives.
pub(crate) struct FakeEngine {
    gid: String,
    name: String,
    status: Mutex<TaskStatus>,
    speed: Option<u64>,
    fail_cancel: bool,
    pub starts: AtomicUsize,
    pub cancels: AtomicUsize,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
    pub cancel_times: Mutex<Vec<tokio::time::Instant>>,
}

impl FakeEngine {
    pub fn new(gid: &str, status: TaskStatus) -> Self {
        Self {
            gid: gid.to_string(),
            name: format!("file-{gid}"),
            status: Mutex::new(status),
            speed: None,
            fail_cancel: false,
            starts: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
            resumes: AtomicUsize::new(0),
            cancel_times: Mutex::new(Vec::new()),
        }
    }

    pub fn with_speed(mut self, speed: u64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn failing_cancel(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    pub fn set_status(&self, status: TaskStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineAdapter for FakeEngine {
    async fn start(&self) -> anyhow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cancel(&self) -> anyhow::Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.cancel_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        if self.fail_cancel {
            anyhow::bail!("daemon unreachable");
        }
        Ok(())
    }

    async fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap()
    }

    fn speed(&self) -> Option<u64> {
        self.speed
    }

    fn identifier(&self) -> Option<String> {
        Some(self.gid.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn pause(&self) -> anyhow::Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resume(&self) -> anyhow::Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) fn engine(gid: &str, status: TaskStatus) -> Arc<FakeEngine> {
    Arc::new(FakeEngine::new(gid, status))
}

pub(crate) fn record(
    id: TaskId,
    owner: UserId,
    kind: EngineKind,
    engine: &Arc<FakeEngine>,
) -> TaskRecord {
    TaskRecord::new(id, owner, kind, Arc::clone(engine) as Arc<dyn EngineAdapter>)
}

pub(crate) fn submission(id: TaskId, owner: UserId, engine: &Arc<FakeEngine>) -> Submission {
    Submission::new(record(id, owner, EngineKind::Direct, engine))
}

/// Limit checker that refuses submissions larger than `max_size`.
pub(crate) struct SizeCap {
    pub max_size: Mutex<u64>,
}

impl SizeCap {
    pub fn new(max_size: u64) -> Arc<Self> {
        Arc::new(Self {
            max_size: Mutex::new(max_size),
        })
    }
}

impl LimitChecker for SizeCap {
    fn check(&self, record: &TaskRecord) -> Option<QueueReason> {
        let max = *self.max_size.lock().unwrap();
        match record.size {
            Some(size) if size > max => Some(QueueReason::SizeLimit),
            _ => None,
        }
    }
}
