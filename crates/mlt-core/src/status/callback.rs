//! `status <chat> <action> [arg]` callback payloads.

use crate::task::{ChatId, StatusFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Refresh,
    Next,
    Previous,
    PageStep(u32),
    Filter(StatusFilter),
    Overview,
}

impl StatusAction {
    fn token(self) -> String {
        match self {
            StatusAction::Refresh => "ref".to_string(),
            StatusAction::Next => "nex".to_string(),
            StatusAction::Previous => "pre".to_string(),
            StatusAction::PageStep(n) => format!("ps {n}"),
            StatusAction::Filter(f) => format!("st {}", f.as_str()),
            StatusAction::Overview => "ov".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCallback {
    pub chat_id: ChatId,
    pub action: StatusAction,
}

impl StatusCallback {
    pub fn new(chat_id: ChatId, action: StatusAction) -> Self {
        Self { chat_id, action }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split_whitespace();
        if parts.next()? != "status" {
            return None;
        }
        let chat_id = parts.next()?.parse().ok()?;
        let action = match parts.next()? {
            "ref" => StatusAction::Refresh,
            "nex" => StatusAction::Next,
            "pre" => StatusAction::Previous,
            "ov" => StatusAction::Overview,
            "ps" => StatusAction::PageStep(parts.next()?.parse().ok()?),
            "st" => StatusAction::Filter(StatusFilter::parse(parts.next()?)?),
            _ => return None,
        };
        Some(Self { chat_id, action })
    }

    /// Payload string for a button.
    pub fn encode(&self) -> String {
        format!("status {} {}", self.chat_id, self.action.token())
    }
}
