//! Parsing of `/cancel` command text.

use crate::command::split_bot_suffix;
use crate::task::{parse_tag, TagId};

/// What a `/cancel` command asks for, before the reply context is considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelCommand {
    /// `/cancel_<gid>` or `/cancel <gid>`.
    Gid(String),
    /// `/cancel_<six digits>`: stop a multi-link batch.
    Tag(TagId),
    /// Addressed to a different bot; ignore silently.
    OtherBot,
    /// No argument.
    Bare,
}

impl CancelCommand {
    /// Parses the command word and its argument. Accepts both the
    /// `/cancel_<arg>[@bot]` form and `/cancel <arg>`.
    pub fn parse(text: &str, bot_name: &str) -> Self {
        let text = text.trim();
        let (head, tail) = match text.split_once(char::is_whitespace) {
            Some((h, t)) => (h, t.trim()),
            None => (text, ""),
        };
        let arg = match head.split_once('_') {
            Some((_, arg)) => arg,
            None => tail.split_whitespace().next().unwrap_or(""),
        };
        let (arg, bot) = split_bot_suffix(arg);
        if let Some(bot) = bot {
            if !bot.is_empty() && !bot_name.is_empty() && bot != bot_name {
                return CancelCommand::OtherBot;
            }
        }
        if arg.is_empty() {
            return CancelCommand::Bare;
        }
        match parse_tag(arg) {
            Some(tag) => CancelCommand::Tag(tag),
            None => CancelCommand::Gid(arg.to_string()),
        }
    }
}
