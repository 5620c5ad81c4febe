//! Multi-link batches: members are submitted one at a time under a shared tag.
//!
//! The tag token is checked before every submission. Once `/cancel_<tag>` (or
//! the stop button) removes the tag, no further member is submitted; members
//! already running are left to finish on their own.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::admission::{Admission, AdmissionController, Submission};
use crate::button::Button;
use crate::task::{TagId, TagToken, TaskId, UserId};

/// A batch that has a tag but has not submitted anything yet.
#[derive(Debug, Clone)]
pub struct BatchTicket {
    pub starter: UserId,
    pub token: TagToken,
}

impl BatchTicket {
    pub fn tag(&self) -> TagId {
        self.token.tag()
    }

    /// Button that stops the batch (`stopm <starter> <tag>`).
    pub fn stop_button(&self) -> Button {
        Button::new("Stop", format!("stopm {} {}", self.starter, self.tag()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub tag: TagId,
    pub admitted: Vec<(TaskId, Admission)>,
    /// Members whose submission failed (duplicate or engine start error).
    pub failed: Vec<TaskId>,
    /// Members never submitted because the batch was stopped.
    pub skipped: usize,
    pub stopped: bool,
}

pub struct BatchRunner {
    admission: Arc<AdmissionController>,
    delay: Duration,
}

impl BatchRunner {
    pub fn new(admission: Arc<AdmissionController>, delay: Duration) -> Self {
        Self { admission, delay }
    }

    /// Register a fresh tag for a batch started by `starter`.
    pub async fn open(&self, starter: UserId) -> BatchTicket {
        let token = self.admission.registry().lock().await.tags.open();
        tracing::info!(tag = token.tag(), user = starter, "batch opened");
        BatchTicket { starter, token }
    }

    /// Open a tag and submit every member.
    pub async fn run_batch(&self, starter: UserId, submissions: Vec<Submission>) -> BatchReport {
        let ticket = self.open(starter).await;
        self.run(&ticket, submissions).await
    }

    /// Submit members in order, pausing `delay` between them. Stops at the
    /// first safe point after the tag is cancelled. The tag is closed at the end.
    pub async fn run(&self, ticket: &BatchTicket, submissions: Vec<Submission>) -> BatchReport {
        let tag = ticket.tag();
        let mut report = BatchReport {
            tag,
            admitted: Vec::new(),
            failed: Vec::new(),
            skipped: 0,
            stopped: false,
        };
        let total = submissions.len();
        for (i, mut sub) in submissions.into_iter().enumerate() {
            if !ticket.token.is_active() {
                report.stopped = true;
                report.skipped = total - i;
                tracing::info!(tag, skipped = report.skipped, "batch stopped");
                break;
            }
            sub.record.tag_group = Some(tag);
            let id = sub.record.id;
            match self.admission.submit(sub).await {
                Ok(admission) => report.admitted.push((id, admission)),
                Err(e) => {
                    tracing::warn!(tag, task = id, "batch member not submitted: {}", e);
                    report.failed.push(id);
                }
            }
            if i + 1 < total && !self.delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => {}
                    _ = ticket.token.stopped() => {}
                }
            }
        }
        self.admission.registry().lock().await.tags.close(tag);
        report
    }
}
