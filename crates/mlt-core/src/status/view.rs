//! Per-chat status view state.

use tokio::time::Instant;

use crate::task::{ChatId, StatusFilter, UserId};

/// Pagination cursor and filter for one chat's status message.
///
/// `page_no` is stored as moved and only wrapped into range when a page is
/// rendered, so a `next` followed by a `previous` always lands where it started.
#[derive(Debug, Clone)]
pub struct StatusView {
    pub chat_id: ChatId,
    pub page_no: i64,
    pub page_step: u32,
    pub filter: StatusFilter,
    /// Message the renderer edits in place.
    pub message_ref: Option<i64>,
    /// Only this owner's tasks, when set.
    pub user_scope: Option<UserId>,
    pub last_render: Option<Instant>,
}

impl StatusView {
    pub fn new(chat_id: ChatId, user_scope: Option<UserId>) -> Self {
        Self {
            chat_id,
            page_no: 1,
            page_step: 1,
            filter: StatusFilter::All,
            message_ref: None,
            user_scope,
            last_render: None,
        }
    }

    pub fn next(&mut self) {
        self.page_no = self.page_no.saturating_add(i64::from(self.page_step));
    }

    pub fn previous(&mut self) {
        self.page_no = self.page_no.saturating_sub(i64::from(self.page_step));
    }

    /// The stored cursor mapped into `1..=pages`.
    pub fn current_page(&self, pages: usize) -> usize {
        let pages = pages.max(1) as i64;
        ((self.page_no - 1).rem_euclid(pages) + 1) as usize
    }

    /// True when a non-forced refresh should be skipped.
    pub(crate) fn throttled(&self, now: Instant, interval: std::time::Duration) -> bool {
        match self.last_render {
            Some(at) => now.saturating_duration_since(at) < interval,
            None => false,
        }
    }
}

/// Number of pages needed for `entries` at `per_page` entries each (at least one).
pub fn page_count(entries: usize, per_page: usize) -> usize {
    let per_page = per_page.max(1);
    entries.div_ceil(per_page).max(1)
}
