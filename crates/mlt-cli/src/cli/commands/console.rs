//! `mlt console` – feed commands and button presses into the task core.

use anyhow::Result;
use mlt_core::admission::Submission;
use mlt_core::command::CommandContext;
use mlt_core::config::MltConfig;
use mlt_core::engine::{EngineAdapter, EngineKind};
use mlt_core::task::{ChatId, StatusFilter, TaskId, TaskRecord, TaskStatus, UserId};
use mlt_core::TaskCore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::line::{ConsoleLine, HELP};
use super::sim::SimEngine;

struct Console {
    core: Arc<TaskCore>,
    engines: HashMap<TaskId, Arc<SimEngine>>,
    user: UserId,
    chat: ChatId,
    json: bool,
    next_batch_id: TaskId,
    /// Batch members not yet submitted; their engines survive pruning.
    pending: Arc<Mutex<HashSet<TaskId>>>,
}

pub async fn run_console(cfg: &MltConfig, user: UserId, chat: ChatId, json: bool) -> Result<()> {
    let mut console = Console::new(cfg, user, chat, json);
    tracing::info!(user, chat, "console started");
    if !json {
        println!("mlt console as user {user} in chat {chat}; `help` for commands");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match ConsoleLine::parse(&line) {
            Ok(ConsoleLine::Quit) => break,
            Ok(parsed) => console.handle(parsed).await,
            Err(e) => eprintln!("error: {e:#}"),
        }
    }
    Ok(())
}

impl Console {
    fn new(cfg: &MltConfig, user: UserId, chat: ChatId, json: bool) -> Self {
        Self {
            core: Arc::new(TaskCore::from_config(cfg)),
            engines: HashMap::new(),
            user,
            chat,
            json,
            next_batch_id: 1_000_000,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn emit<T: Serialize + Debug>(&self, value: &T) {
        if self.json {
            match serde_json::to_string(value) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("error: {e}"),
            }
        } else {
            println!("{value:#?}");
        }
    }

    /// Drop simulated engines whose task was cancelled or never admitted.
    async fn prune(&mut self) {
        let pending = self
            .pending
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default();
        let mut gone = Vec::new();
        for &id in self.engines.keys() {
            if !pending.contains(&id) && self.core.registry.location(id).await.is_none() {
                gone.push(id);
            }
        }
        for id in gone {
            tracing::debug!(task = id, "dropping simulated engine");
            self.engines.remove(&id);
        }
    }

    fn record(&mut self, id: TaskId, engine: EngineKind, gid: &str) -> TaskRecord {
        let sim = Arc::new(SimEngine::new(gid, TaskStatus::Download));
        self.engines.insert(id, Arc::clone(&sim));
        TaskRecord::new(id, self.user, engine, sim as Arc<dyn EngineAdapter>)
    }

    async fn handle(&mut self, line: ConsoleLine) {
        match line {
            ConsoleLine::Add {
                id,
                engine,
                gid,
                size,
            } => {
                if self.core.registry.location(id).await.is_some() {
                    eprintln!("error: task {id} is already tracked");
                    return;
                }
                let mut record = self.record(id, engine, &gid);
                record.size = size;
                match self.core.admission.submit(Submission::new(record)).await {
                    Ok(admission) => self.emit(&admission),
                    Err(e) => {
                        eprintln!("error: {e}");
                        self.prune().await;
                    }
                }
            }
            ConsoleLine::Batch { engine, gids } => {
                let mut members = Vec::with_capacity(gids.len());
                for gid in &gids {
                    let id = self.next_batch_id;
                    self.next_batch_id += 1;
                    members.push(Submission::new(self.record(id, engine, gid)));
                }
                if let Ok(mut pending) = self.pending.lock() {
                    pending.extend(members.iter().map(|m| m.record.id));
                }
                let ticket = self.core.batches.open(self.user).await;
                self.emit(&ticket.stop_button());
                // Runs in the background so /cancel_<tag> can interrupt it.
                let core = Arc::clone(&self.core);
                let json = self.json;
                let pending = Arc::clone(&self.pending);
                let ids: Vec<TaskId> = members.iter().map(|m| m.record.id).collect();
                tokio::spawn(async move {
                    let report = core.batches.run(&ticket, members).await;
                    if let Ok(mut pending) = pending.lock() {
                        for id in &ids {
                            pending.remove(id);
                        }
                    }
                    if json {
                        if let Ok(s) = serde_json::to_string(&report) {
                            println!("{s}");
                        }
                    } else {
                        println!("{report:#?}");
                    }
                });
            }
            ConsoleLine::Set { id, status } => {
                self.prune().await;
                match self.engines.get(&id) {
                    Some(sim) => sim.set_status(status),
                    None => eprintln!("error: no simulated engine for task {id}"),
                }
            }
            ConsoleLine::Upload { id, engine } => {
                let gid = format!("up{id}");
                let sim = Arc::new(SimEngine::new(gid, TaskStatus::Upload));
                let previous = self.engines.insert(id, Arc::clone(&sim));
                let result = self.core.admission.begin_upload(id, sim, engine).await;
                if result.is_err() {
                    // Phase change refused: the download engine stays in charge.
                    match previous {
                        Some(prev) => self.engines.insert(id, prev),
                        None => self.engines.remove(&id),
                    };
                    self.prune().await;
                }
                match result {
                    Ok(admission) => self.emit(&admission),
                    Err(e) => eprintln!("error: {e}"),
                }
            }
            ConsoleLine::Done(id) => {
                let finished = self.core.admission.finish(id).await.is_some();
                self.engines.remove(&id);
                if !finished {
                    eprintln!("error: task {id} is not active");
                }
            }
            ConsoleLine::As(user) => {
                self.user = user;
                if !self.json {
                    println!("acting as user {user}");
                }
            }
            ConsoleLine::Command { text, reply_to } => {
                let mut ctx = CommandContext::new(text);
                ctx.reply_to = reply_to;
                let reply = self.core.handle_command(self.user, self.chat, &ctx).await;
                self.emit(&reply);
                self.prune().await;
            }
            ConsoleLine::Callback(data) => {
                let reply = self.core.handle_callback(self.user, &data).await;
                self.emit(&reply);
                self.prune().await;
            }
            ConsoleLine::List => {
                let tasks = self.core.registry.list(StatusFilter::All, None).await;
                if self.json {
                    self.emit(&tasks);
                } else if tasks.is_empty() {
                    println!("No tasks.");
                } else {
                    println!("{:<10} {:<8} {:<14} {:<16} {}", "ID", "OWNER", "STATUS", "ENGINE", "GID");
                    for t in tasks {
                        println!(
                            "{:<10} {:<8} {:<14} {:<16} {}",
                            t.id,
                            t.owner_user_id,
                            t.status.as_str(),
                            t.engine_kind.as_str(),
                            t.gid.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
            ConsoleLine::Help => println!("{HELP}"),
            ConsoleLine::Quit | ConsoleLine::Empty => {}
        }
    }
}
