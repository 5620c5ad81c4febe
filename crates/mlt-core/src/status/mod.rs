//! Status aggregation and paginated status views.
//!
//! Views live in the registry state, keyed by chat, so every cursor or filter
//! change happens under the registry mutex. Rendering copies the view and the
//! task handles out, releases the lock, and only then asks engines for their
//! status.

mod callback;
mod overview;
mod view;

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::button::Button;
use crate::command::CommandContext;
use crate::engine::AggregateSpeed;
use crate::permissions::Permissions;
use crate::registry::{snapshot_of, Registry};
use crate::task::{ChatId, StatusFilter, TaskSnapshot, TaskStatus, UserId};

pub use callback::{StatusAction, StatusCallback};
pub use overview::{BucketCount, Overview};
pub use view::{page_count, StatusView};

/// Page step choices offered as buttons.
const PAGE_STEPS: [u32; 4] = [1, 2, 4, 8];

/// One rendered page of a status view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPage {
    pub chat_id: ChatId,
    /// 1-based page actually shown.
    pub page: usize,
    pub pages: usize,
    pub page_step: u32,
    pub filter: StatusFilter,
    pub user_scope: Option<UserId>,
    /// Tasks matching the filter across all pages.
    pub total: usize,
    pub tasks: Vec<TaskSnapshot>,
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reply")]
pub enum StatusReply {
    /// Nothing tracked at all.
    Idle { uptime_secs: u64, owner: bool },
    Page(StatusPage),
    Overview(Overview),
    /// Non-forced refresh inside the update interval; keep the current message.
    Unchanged,
    /// The chat has no status view.
    NoView,
    Invalid,
}

pub struct StatusBoard {
    registry: Arc<Registry>,
    permissions: Arc<dyn Permissions>,
    sources: Vec<Arc<dyn AggregateSpeed>>,
    status_limit: usize,
    update_interval: Duration,
    started: Instant,
}

impl StatusBoard {
    pub fn new(
        registry: Arc<Registry>,
        permissions: Arc<dyn Permissions>,
        status_limit: usize,
        update_interval: Duration,
    ) -> Self {
        Self {
            registry,
            permissions,
            sources: Vec::new(),
            status_limit: status_limit.max(1),
            update_interval,
            started: Instant::now(),
        }
    }

    /// Add a daemon-wide speed source for the overview.
    pub fn with_source(mut self, source: Arc<dyn AggregateSpeed>) -> Self {
        self.sources.push(source);
        self
    }

    /// `/status [me|<user_id>]`.
    pub async fn status_command(
        &self,
        requester: UserId,
        chat_id: ChatId,
        ctx: &CommandContext,
    ) -> StatusReply {
        if self.registry.total().await == 0 {
            return StatusReply::Idle {
                uptime_secs: self.started.elapsed().as_secs(),
                owner: self.permissions.is_owner(requester),
            };
        }
        let scope = match ctx.args().first() {
            Some(&"me") => Some(requester),
            Some(arg) => match arg.parse::<UserId>() {
                Ok(user) => Some(user),
                Err(_) => return StatusReply::Invalid,
            },
            None => None,
        };
        self.open(chat_id, scope).await
    }

    /// Create (or replace) the chat's view and render its first page.
    pub async fn open(&self, chat_id: ChatId, user_scope: Option<UserId>) -> StatusReply {
        self.registry
            .lock()
            .await
            .views
            .insert(chat_id, StatusView::new(chat_id, user_scope));
        tracing::debug!(chat = chat_id, ?user_scope, "status view opened");
        self.refresh(chat_id, true).await
    }

    pub async fn close(&self, chat_id: ChatId) -> bool {
        self.registry.lock().await.views.remove(&chat_id).is_some()
    }

    /// Associate the rendered message with the view for in-place edits.
    pub async fn set_message_ref(&self, chat_id: ChatId, message_ref: i64) -> bool {
        self.with_view(chat_id, |v| v.message_ref = Some(message_ref))
            .await
    }

    pub async fn next(&self, chat_id: ChatId) -> bool {
        self.with_view(chat_id, StatusView::next).await
    }

    pub async fn previous(&self, chat_id: ChatId) -> bool {
        self.with_view(chat_id, StatusView::previous).await
    }

    pub async fn set_page_step(&self, chat_id: ChatId, step: u32) -> bool {
        self.with_view(chat_id, |v| v.page_step = step).await
    }

    pub async fn set_filter(&self, chat_id: ChatId, filter: StatusFilter) -> bool {
        self.with_view(chat_id, |v| v.filter = filter).await
    }

    async fn with_view(&self, chat_id: ChatId, f: impl FnOnce(&mut StatusView)) -> bool {
        match self.registry.lock().await.views.get_mut(&chat_id) {
            Some(view) => {
                f(view);
                true
            }
            None => false,
        }
    }

    /// Handle one `status …` callback.
    pub async fn callback(&self, data: &str) -> StatusReply {
        let Some(cb) = StatusCallback::parse(data) else {
            return StatusReply::Invalid;
        };
        let chat = cb.chat_id;
        let found = match cb.action {
            StatusAction::Refresh => return self.refresh(chat, true).await,
            StatusAction::Overview => return self.overview(chat).await,
            StatusAction::Next => self.next(chat).await,
            StatusAction::Previous => self.previous(chat).await,
            StatusAction::Filter(filter) => {
                if !self.set_filter(chat, filter).await {
                    return StatusReply::NoView;
                }
                return self.refresh(chat, true).await;
            }
            // New step applies from the next render on.
            StatusAction::PageStep(step) => {
                return if self.set_page_step(chat, step).await {
                    StatusReply::Unchanged
                } else {
                    StatusReply::NoView
                };
            }
        };
        if !found {
            return StatusReply::NoView;
        }
        self.refresh(chat, true).await
    }

    /// Re-render the chat's view. Without `force`, a render inside the update
    /// interval is skipped.
    pub async fn refresh(&self, chat_id: ChatId, force: bool) -> StatusReply {
        let now = Instant::now();
        let (view, handles) = {
            let st = self.registry.lock().await;
            let Some(view) = st.views.get(&chat_id) else {
                return StatusReply::NoView;
            };
            if !force && view.throttled(now, self.update_interval) {
                return StatusReply::Unchanged;
            }
            (view.clone(), st.handles(view.user_scope))
        };

        let mut snapshots = Vec::with_capacity(handles.len());
        for (record, location) in &handles {
            snapshots.push(snapshot_of(record, *location).await);
        }
        let present: Vec<TaskStatus> = TaskStatus::ALL
            .into_iter()
            .filter(|st| snapshots.iter().any(|s| s.status == *st))
            .collect();
        let matching: Vec<TaskSnapshot> = snapshots
            .into_iter()
            .filter(|s| view.filter.matches(s.status))
            .collect();

        let total = matching.len();
        let pages = page_count(total, self.status_limit);
        let page = view.current_page(pages);
        let tasks: Vec<TaskSnapshot> = matching
            .into_iter()
            .skip((page - 1) * self.status_limit)
            .take(self.status_limit)
            .collect();

        if let Some(v) = self.registry.lock().await.views.get_mut(&chat_id) {
            v.last_render = Some(now);
        }

        StatusReply::Page(StatusPage {
            chat_id,
            page,
            pages,
            page_step: view.page_step,
            filter: view.filter,
            user_scope: view.user_scope,
            total,
            tasks,
            buttons: page_buttons(chat_id, pages, view.filter, &present),
        })
    }

    /// Counts per status bucket and combined throughput over every tracked task.
    pub async fn overview(&self, chat_id: ChatId) -> StatusReply {
        let handles = self.registry.lock().await.handles(None);
        let mut snapshots = Vec::with_capacity(handles.len());
        for (record, location) in &handles {
            snapshots.push(snapshot_of(record, *location).await);
        }
        let (counts, throughput) = overview::compute(&snapshots, &self.sources).await;
        StatusReply::Overview(Overview {
            counts,
            throughput,
            buttons: vec![Button::new(
                "Back",
                StatusCallback::new(chat_id, StatusAction::Refresh).encode(),
            )],
        })
    }
}

fn page_buttons(
    chat_id: ChatId,
    pages: usize,
    filter: StatusFilter,
    present: &[TaskStatus],
) -> Vec<Button> {
    let action = |a| StatusCallback::new(chat_id, a).encode();
    let mut buttons = Vec::new();
    if pages > 1 {
        buttons.push(Button::new("<<", action(StatusAction::Previous)));
        buttons.push(Button::new(">>", action(StatusAction::Next)));
        for step in PAGE_STEPS {
            buttons.push(Button::new(step.to_string(), action(StatusAction::PageStep(step))));
        }
    }
    if present.len() > 1 {
        for st in present {
            buttons.push(Button::new(
                st.label(),
                action(StatusAction::Filter(StatusFilter::Only(*st))),
            ));
        }
    }
    if filter != StatusFilter::All {
        buttons.push(Button::new("All", action(StatusAction::Filter(StatusFilter::All))));
    }
    buttons.push(Button::new("Refresh", action(StatusAction::Refresh)));
    buttons.push(Button::new("Overview", action(StatusAction::Overview)));
    buttons
}
