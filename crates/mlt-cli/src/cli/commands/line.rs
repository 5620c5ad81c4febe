//! Console input lines.

use anyhow::{anyhow, bail, Result};
use mlt_core::engine::EngineKind;
use mlt_core::task::{TaskId, TaskStatus, UserId};

pub const HELP: &str = "\
add <id> <engine> <gid> [size]    submit a task (engines: torrent nzb jd direct gdrive rclone telegram yt-dlp)
batch <engine> <gid>...           submit a multi-link batch
set <id> <status>                 change a simulated engine's status (Download, Seed, Pause, ...)
upload <id> [engine]              move a task to its upload phase (default uploader: gdrive)
done <id>                         finish a task
as <user>                         act as another user
reply <id> /command ...           send a command replying to task <id>
/command ...                      send a bot command (/status, /cancel, /fs, /sel, /cancelall)
cb <payload>                      press a button (status 1 nex, canall ms All 1, ...)
list                              list tracked tasks
help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Add {
        id: TaskId,
        engine: EngineKind,
        gid: String,
        size: Option<u64>,
    },
    Batch {
        engine: EngineKind,
        gids: Vec<String>,
    },
    Set {
        id: TaskId,
        status: TaskStatus,
    },
    Upload {
        id: TaskId,
        engine: EngineKind,
    },
    Done(TaskId),
    As(UserId),
    Command {
        text: String,
        reply_to: Option<TaskId>,
    },
    Callback(String),
    List,
    Help,
    Quit,
    Empty,
}

fn int<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T> {
    let word = word.ok_or_else(|| anyhow!("missing {what}"))?;
    word.parse()
        .map_err(|_| anyhow!("invalid {what}: {word}"))
}

fn engine(word: Option<&str>) -> Result<EngineKind> {
    let word = word.ok_or_else(|| anyhow!("missing engine"))?;
    EngineKind::parse(word).ok_or_else(|| anyhow!("unknown engine: {word}"))
}

impl ConsoleLine {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.starts_with('/') {
            return Ok(ConsoleLine::Command {
                text: line.to_string(),
                reply_to: None,
            });
        }
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(ConsoleLine::Empty);
        };
        let parsed = match head {
            "add" => ConsoleLine::Add {
                id: int(words.next(), "task id")?,
                engine: engine(words.next())?,
                gid: words
                    .next()
                    .ok_or_else(|| anyhow!("missing gid"))?
                    .to_string(),
                size: words.next().map(|w| int(Some(w), "size")).transpose()?,
            },
            "batch" => {
                let engine = engine(words.next())?;
                let gids: Vec<String> = words.map(str::to_string).collect();
                if gids.is_empty() {
                    bail!("batch needs at least one gid");
                }
                ConsoleLine::Batch { engine, gids }
            }
            "set" => {
                let id = int(words.next(), "task id")?;
                let word = words.next().ok_or_else(|| anyhow!("missing status"))?;
                let status =
                    TaskStatus::parse(word).ok_or_else(|| anyhow!("unknown status: {word}"))?;
                ConsoleLine::Set { id, status }
            }
            "upload" => ConsoleLine::Upload {
                id: int(words.next(), "task id")?,
                engine: match words.next() {
                    Some(word) => engine(Some(word))?,
                    None => EngineKind::CloudApi,
                },
            },
            "done" => ConsoleLine::Done(int(words.next(), "task id")?),
            "as" => ConsoleLine::As(int(words.next(), "user id")?),
            "reply" => {
                let id = int(words.next(), "task id")?;
                let text = words.collect::<Vec<_>>().join(" ");
                if !text.starts_with('/') {
                    bail!("reply needs a /command");
                }
                ConsoleLine::Command {
                    text,
                    reply_to: Some(id),
                }
            }
            "cb" => {
                let payload = words.collect::<Vec<_>>().join(" ");
                if payload.is_empty() {
                    bail!("missing callback payload");
                }
                ConsoleLine::Callback(payload)
            }
            "list" | "ls" => ConsoleLine::List,
            "help" | "?" => ConsoleLine::Help,
            "quit" | "exit" => ConsoleLine::Quit,
            other => bail!("unknown input: {other} (try `help`)"),
        };
        Ok(parsed)
    }
}
