//! Bulk cancel by status, and its choose → confirm → execute button flow.
//!
//! The flow keeps no server-side session: every step is encoded in the
//! callback payload (`canall <a> <b> [user]`).

use serde::Serialize;

use crate::button::Button;
use crate::task::{StatusFilter, TaskStatus, UserId};

use super::CancelService;

/// Decoded `canall` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Close,
    /// Back from the confirm prompt to the category menu.
    Back,
    /// Privileged user widens the scope to every user's tasks.
    ScopeAll,
    /// Privileged user narrows the scope to their own tasks.
    ScopeMine,
    /// Category picked; ask for confirmation.
    Choose(StatusFilter),
    /// Confirmed; cancel everything matching.
    Execute(StatusFilter),
    /// Unrecognised payload; redraw the menu.
    Menu,
}

impl BulkAction {
    /// Parses a payload; returns the action and the user scope it carries.
    pub fn parse(data: &str) -> (Self, Option<UserId>) {
        let parts: Vec<&str> = data.split_whitespace().collect();
        let a = parts.get(1).copied().unwrap_or("");
        let b = parts.get(2).copied().unwrap_or("");
        let user = parts.get(3).and_then(|s| s.parse::<UserId>().ok());
        let action = match (a, b) {
            ("close", _) => BulkAction::Close,
            ("back", _) => BulkAction::Back,
            ("bot", _) => BulkAction::ScopeAll,
            ("user", _) => BulkAction::ScopeMine,
            ("ms", status) => StatusFilter::parse(status)
                .map(BulkAction::Choose)
                .unwrap_or(BulkAction::Menu),
            (status, "confirm") => StatusFilter::parse(status)
                .map(BulkAction::Execute)
                .unwrap_or(BulkAction::Menu),
            _ => BulkAction::Menu,
        };
        (action, user)
    }
}

/// What to show after a bulk-cancel step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reply")]
pub enum BulkCancelReply {
    NoActiveTasks,
    NotYours,
    /// Category menu; `user` is the scope (None = every user's tasks).
    Menu {
        user: Option<UserId>,
        buttons: Vec<Button>,
    },
    Confirm {
        filter: StatusFilter,
        user: Option<UserId>,
        buttons: Vec<Button>,
    },
    Closed,
    /// Bulk cancel ran; `matched` is false when nothing had that status.
    Done { filter: StatusFilter, matched: bool },
}

fn scope_arg(user: Option<UserId>) -> String {
    user.map(|u| u.to_string()).unwrap_or_default()
}

/// Category menu: one button per status, "All", the scope toggle for
/// privileged users, and "Close".
pub fn menu_buttons(is_sudo: bool, user: Option<UserId>) -> Vec<Button> {
    let scope = scope_arg(user);
    let mut buttons: Vec<Button> = TaskStatus::ALL
        .into_iter()
        .map(|st| Button::new(st.label(), format!("canall ms {} {}", st.as_str(), scope)))
        .collect();
    buttons.push(Button::new("All", format!("canall ms All {}", scope)));
    if is_sudo {
        match user {
            Some(u) => buttons.push(Button::new("All Added Tasks", format!("canall bot ms {}", u))),
            None => buttons.push(Button::new("My Tasks", "canall user ms")),
        }
    }
    buttons.push(Button::new("Close", format!("canall close ms {}", scope)));
    buttons
}

fn confirm_buttons(filter: StatusFilter, user: Option<UserId>) -> Vec<Button> {
    let scope = scope_arg(user);
    vec![
        Button::new("Yes!", format!("canall {} confirm {}", filter.as_str(), scope)),
        Button::new("Back", format!("canall back confirm {}", scope)),
        Button::new("Close", format!("canall close confirm {}", scope)),
    ]
}

impl CancelService {
    /// Cancel every task matching `filter` (and `owner`, if given).
    ///
    /// Targets are snapshotted once; tasks that appear or change status
    /// afterwards are left alone. Cancels run one at a time with the pacing
    /// delay between them. Returns false if nothing matched.
    pub async fn cancel_all(&self, filter: StatusFilter, owner: Option<UserId>) -> bool {
        let targets = self.registry.list(filter, owner).await;
        if targets.is_empty() {
            return false;
        }
        tracing::info!(count = targets.len(), %filter, ?owner, "bulk cancel");
        for (i, target) in targets.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            if let Err(e) = self.cancel_by_id(target.id).await {
                tracing::debug!(task = target.id, "bulk cancel skipped: {}", e);
            }
        }
        true
    }

    /// Entry point of the flow (`/cancelall`).
    pub async fn cancel_all_buttons(&self, requester: UserId) -> BulkCancelReply {
        if self.registry.total().await == 0 {
            return BulkCancelReply::NoActiveTasks;
        }
        BulkCancelReply::Menu {
            user: Some(requester),
            buttons: menu_buttons(self.permissions.is_sudo(requester), Some(requester)),
        }
    }

    /// Handle one `canall …` callback.
    pub async fn bulk_callback(&self, requester: UserId, data: &str) -> BulkCancelReply {
        let (action, user) = BulkAction::parse(data);
        let is_sudo = self.permissions.is_sudo(requester);
        let owns_scope = user == Some(requester);
        // Acting on another user's scope, or on every user's tasks, needs privilege.
        if !is_sudo && !owns_scope && action != BulkAction::Close {
            return BulkCancelReply::NotYours;
        }
        match action {
            BulkAction::Close => {
                if !is_sudo && user.is_some() && !owns_scope {
                    return BulkCancelReply::NotYours;
                }
                BulkCancelReply::Closed
            }
            BulkAction::Back | BulkAction::Menu => BulkCancelReply::Menu {
                user,
                buttons: menu_buttons(is_sudo, user),
            },
            BulkAction::ScopeAll if !is_sudo => BulkCancelReply::NotYours,
            BulkAction::ScopeAll => BulkCancelReply::Menu {
                user: None,
                buttons: menu_buttons(is_sudo, None),
            },
            BulkAction::ScopeMine => BulkCancelReply::Menu {
                user: Some(requester),
                buttons: menu_buttons(is_sudo, Some(requester)),
            },
            BulkAction::Choose(filter) => BulkCancelReply::Confirm {
                filter,
                user,
                buttons: confirm_buttons(filter, user),
            },
            BulkAction::Execute(filter) => {
                let matched = self.cancel_all(filter, user).await;
                BulkCancelReply::Done { filter, matched }
            }
        }
    }
}
