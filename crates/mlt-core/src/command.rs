//! Splitting bot command text into a target reference and arguments.

use crate::task::{TaskId, TaskRef};

/// A chat command as received: its text and the request it replies to, if any.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub text: String,
    pub reply_to: Option<TaskId>,
}

impl CommandContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_to: None,
        }
    }

    pub fn replying_to(mut self, id: TaskId) -> Self {
        self.reply_to = Some(id);
        self
    }

    /// Whitespace-separated arguments after the command word.
    pub fn args(&self) -> Vec<&str> {
        self.text.split_whitespace().skip(1).collect()
    }
}

/// Target precedence shared by cancel, force-start and select:
/// explicit gid first, then the replied-to request.
pub fn target_of(gid: Option<&str>, reply_to: Option<TaskId>) -> Option<TaskRef> {
    match (gid, reply_to) {
        (Some(gid), _) => Some(TaskRef::Gid(gid.to_string())),
        (None, Some(id)) => Some(TaskRef::Request(id)),
        (None, None) => None,
    }
}

/// Splits `word@bot` into the word and the addressed bot name.
pub fn split_bot_suffix(word: &str) -> (&str, Option<&str>) {
    match word.split_once('@') {
        Some((w, bot)) => (w, Some(bot.trim())),
        None => (word, None),
    }
}
