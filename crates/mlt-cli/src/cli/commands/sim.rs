//! Simulated engine used by the console in place of real daemons.

use async_trait::async_trait;
use mlt_core::engine::EngineAdapter;
use mlt_core::task::TaskStatus;
use std::sync::Mutex;

pub struct SimEngine {
    gid: String,
    status: Mutex<TaskStatus>,
    /// Status to restore on resume.
    before_pause: Mutex<Option<TaskStatus>>,
}

impl SimEngine {
    pub fn new(gid: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            gid: gid.into(),
            status: Mutex::new(status),
            before_pause: Mutex::new(None),
        }
    }

    pub fn set_status(&self, status: TaskStatus) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }

    fn current(&self) -> TaskStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(TaskStatus::Download)
    }
}

#[async_trait]
impl EngineAdapter for SimEngine {
    async fn start(&self) -> anyhow::Result<()> {
        tracing::debug!(gid = %self.gid, "sim engine start");
        Ok(())
    }

    async fn cancel(&self) -> anyhow::Result<()> {
        tracing::debug!(gid = %self.gid, "sim engine cancel");
        Ok(())
    }

    async fn status(&self) -> TaskStatus {
        self.current()
    }

    fn speed(&self) -> Option<u64> {
        match self.current() {
            TaskStatus::Download | TaskStatus::Upload => Some(1 << 20),
            _ => None,
        }
    }

    fn identifier(&self) -> Option<String> {
        Some(self.gid.clone())
    }

    fn name(&self) -> String {
        format!("sim-{}", self.gid)
    }

    async fn pause(&self) -> anyhow::Result<()> {
        let prev = self.current();
        if let Ok(mut saved) = self.before_pause.lock() {
            *saved = Some(prev);
        }
        self.set_status(TaskStatus::Paused);
        Ok(())
    }

    async fn resume(&self) -> anyhow::Result<()> {
        let restored = self
            .before_pause
            .lock()
            .ok()
            .and_then(|mut saved| saved.take())
            .unwrap_or(TaskStatus::Download);
        self.set_status(restored);
        Ok(())
    }
}
