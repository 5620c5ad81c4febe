//! Tests for status views, pagination and the overview.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::admission::{AdmissionController, NoLimits, Submission};
use crate::command::CommandContext;
use crate::config::QueueLimits;
use crate::engine::{AggregateSpeed, EngineKind, Throughput};
use crate::registry::{QueueEntry, QueueKind, QueueReason, Registry};
use crate::status::{StatusBoard, StatusPage, StatusReply};
use crate::task::{StatusFilter, TaskStatus};
use crate::testing::{engine, perms, record, FakeEngine, OWNER};

const CHAT: i64 = -100;

fn board(registry: &Arc<Registry>, limit: usize) -> StatusBoard {
    StatusBoard::new(Arc::clone(registry), perms(), limit, Duration::from_secs(10))
}

async fn add(registry: &Registry, id: i64, owner: i64, status: TaskStatus) -> Arc<FakeEngine> {
    let e = engine(&format!("g{id}"), status);
    assert!(registry.register(record(id, owner, EngineKind::Direct, &e)).await);
    e
}

fn page(reply: StatusReply) -> StatusPage {
    match reply {
        StatusReply::Page(p) => p,
        other => panic!("expected a page, got {other:?}"),
    }
}

fn ids(p: &StatusPage) -> Vec<i64> {
    p.tasks.iter().map(|t| t.id).collect()
}

#[tokio::test]
async fn pages_wrap_and_next_previous_round_trip() {
    let registry = Arc::new(Registry::new());
    for id in 1..=5 {
        add(&registry, id, 10, TaskStatus::Download).await;
    }
    let b = board(&registry, 2);

    let first = page(b.open(CHAT, None).await);
    assert_eq!((first.page, first.pages, first.total), (1, 3, 5));
    assert_eq!(ids(&first), vec![1, 2]);

    let second = page(b.callback(&format!("status {CHAT} nex")).await);
    assert_eq!(second.page, 2);
    assert_eq!(ids(&second), vec![3, 4]);

    assert_eq!(
        b.callback(&format!("status {CHAT} ps 2")).await,
        StatusReply::Unchanged
    );
    let wrapped = page(b.callback(&format!("status {CHAT} nex")).await);
    assert_eq!(wrapped.page, 1);
    assert_eq!(wrapped.page_step, 2);

    let back = page(b.callback(&format!("status {CHAT} pre")).await);
    assert_eq!(back.page, 2);
    assert_eq!(ids(&back), vec![3, 4]);

    let last = page(b.callback(&format!("status {CHAT} pre")).await);
    assert_eq!(last.page, 3);
    assert_eq!(ids(&last), vec![5]);
}

#[tokio::test]
async fn round_trip_survives_registry_shrinking() {
    let registry = Arc::new(Registry::new());
    for id in 1..=9 {
        add(&registry, id, 10, TaskStatus::Download).await;
    }
    let b = board(&registry, 2);
    b.open(CHAT, None).await;
    b.set_page_step(CHAT, 3).await;
    b.next(CHAT).await;
    for id in 4..=9 {
        registry.remove(id).await;
    }
    b.previous(CHAT).await;
    assert_eq!(registry.lock().await.views[&CHAT].page_no, 1);
    assert_eq!(page(b.refresh(CHAT, true).await).page, 1);
}

#[tokio::test]
async fn filter_restricts_and_offers_all() {
    let registry = Arc::new(Registry::new());
    add(&registry, 1, 10, TaskStatus::Download).await;
    add(&registry, 2, 10, TaskStatus::Seed).await;
    add(&registry, 3, 10, TaskStatus::Download).await;
    let b = board(&registry, 4);

    let all = page(b.open(CHAT, None).await);
    assert_eq!(all.total, 3);
    assert!(crate::button::find(&all.buttons, "Seeding").is_some());
    assert!(crate::button::find(&all.buttons, "All").is_none());
    assert!(crate::button::find(&all.buttons, ">>").is_none());

    let seeds = page(b.callback(&format!("status {CHAT} st Seed")).await);
    assert_eq!(ids(&seeds), vec![2]);
    assert_eq!(seeds.filter, StatusFilter::Only(TaskStatus::Seed));
    assert_eq!(
        crate::button::find(&seeds.buttons, "All").unwrap().action,
        format!("status {CHAT} st All")
    );

    let reset = page(b.callback(&format!("status {CHAT} st All")).await);
    assert_eq!(reset.total, 3);
}

#[tokio::test]
async fn queued_tasks_are_listed_with_queue_status() {
    let registry = Arc::new(Registry::new());
    add(&registry, 1, 10, TaskStatus::Download).await;
    let waiting = engine("w", TaskStatus::Download);
    registry.lock().await.enqueue(
        QueueKind::Download,
        QueueEntry {
            record: record(2, 10, EngineKind::Direct, &waiting),
            reason: QueueReason::DownloadLimit,
        },
    );
    let b = board(&registry, 4);
    let p = page(b.open(CHAT, None).await);
    assert_eq!(p.tasks[1].status, TaskStatus::QueuedDownload);

    let q = page(b.callback(&format!("status {CHAT} st QueueDl")).await);
    assert_eq!(ids(&q), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn unforced_refresh_is_throttled() {
    let registry = Arc::new(Registry::new());
    add(&registry, 1, 10, TaskStatus::Download).await;
    let b = board(&registry, 4);

    page(b.open(CHAT, None).await);
    assert_eq!(b.refresh(CHAT, false).await, StatusReply::Unchanged);
    page(b.refresh(CHAT, true).await);

    tokio::time::advance(Duration::from_secs(11)).await;
    page(b.refresh(CHAT, false).await);
    assert_eq!(b.refresh(CHAT, false).await, StatusReply::Unchanged);
}

#[tokio::test]
async fn status_command_scopes_and_idles() {
    let registry = Arc::new(Registry::new());
    let b = board(&registry, 4);

    match b.status_command(OWNER, CHAT, &CommandContext::new("/status")).await {
        StatusReply::Idle { owner, .. } => assert!(owner),
        other => panic!("expected idle, got {other:?}"),
    }
    match b.status_command(10, CHAT, &CommandContext::new("/status")).await {
        StatusReply::Idle { owner, .. } => assert!(!owner),
        other => panic!("expected idle, got {other:?}"),
    }

    add(&registry, 1, 10, TaskStatus::Download).await;
    add(&registry, 2, 11, TaskStatus::Download).await;

    let mine = page(b.status_command(10, CHAT, &CommandContext::new("/status me")).await);
    assert_eq!(mine.user_scope, Some(10));
    assert_eq!(ids(&mine), vec![1]);

    let theirs = page(b.status_command(10, CHAT, &CommandContext::new("/status 11")).await);
    assert_eq!(ids(&theirs), vec![2]);

    let everyone = page(b.status_command(10, CHAT, &CommandContext::new("/status")).await);
    assert_eq!(everyone.total, 2);

    assert_eq!(
        b.status_command(10, 5, &CommandContext::new("/status foo")).await,
        StatusReply::Invalid
    );
    assert_eq!(b.refresh(5, true).await, StatusReply::NoView);
}

#[tokio::test]
async fn callbacks_without_view_or_malformed() {
    let registry = Arc::new(Registry::new());
    add(&registry, 1, 10, TaskStatus::Download).await;
    let b = board(&registry, 4);

    assert_eq!(b.callback("status 7 nex").await, StatusReply::NoView);
    assert_eq!(b.callback("status 7 ps 3").await, StatusReply::NoView);
    assert_eq!(b.callback("status 7 st Seed").await, StatusReply::NoView);
    assert_eq!(b.callback("status 7 bogus").await, StatusReply::Invalid);

    b.open(7, None).await;
    assert!(b.close(7).await);
    assert_eq!(b.refresh(7, true).await, StatusReply::NoView);
}

struct DaemonSpeed {
    kind: EngineKind,
    calls: AtomicUsize,
    fail: bool,
}

impl DaemonSpeed {
    fn new(kind: EngineKind, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait]
impl AggregateSpeed for DaemonSpeed {
    fn covers(&self, kind: EngineKind) -> bool {
        kind == self.kind
    }

    async fn current(&self) -> anyhow::Result<Throughput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("daemon offline");
        }
        Ok(Throughput {
            download: 1000,
            upload: 0,
            seed: 300,
        })
    }
}

#[tokio::test]
async fn overview_counts_once_per_daemon() {
    let registry = Arc::new(Registry::new());
    for id in 1..=3 {
        let e = Arc::new(FakeEngine::new(&format!("t{id}"), TaskStatus::Download).with_speed(999));
        registry.register(record(id, 10, EngineKind::Torrent, &e)).await;
    }
    let seed = engine("t4", TaskStatus::Seed);
    registry.register(record(4, 10, EngineKind::Torrent, &seed)).await;
    let direct = Arc::new(FakeEngine::new("d", TaskStatus::Download).with_speed(50));
    registry.register(record(5, 10, EngineKind::Direct, &direct)).await;
    let up = Arc::new(FakeEngine::new("u", TaskStatus::Upload).with_speed(70));
    registry.register(record(6, 10, EngineKind::CloudApi, &up)).await;

    let torrents = DaemonSpeed::new(EngineKind::Torrent, false);
    let nzb = DaemonSpeed::new(EngineKind::Nzb, false);
    let b = board(&registry, 4)
        .with_source(torrents.clone())
        .with_source(nzb.clone());

    let StatusReply::Overview(ov) = b.overview(CHAT).await else {
        panic!("expected overview");
    };
    assert_eq!(ov.count(TaskStatus::Download), 4);
    assert_eq!(ov.count(TaskStatus::Seed), 1);
    assert_eq!(ov.count(TaskStatus::Upload), 1);
    assert_eq!(ov.count(TaskStatus::FFmpeg), 0);
    assert_eq!(ov.counts.len(), TaskStatus::ALL.len());
    assert_eq!(
        ov.throughput,
        Throughput {
            download: 1050,
            upload: 70,
            seed: 300
        }
    );
    assert_eq!(torrents.calls.load(Ordering::SeqCst), 1);
    assert_eq!(nzb.calls.load(Ordering::SeqCst), 0);
    assert_eq!(ov.buttons[0].action, format!("status {CHAT} ref"));
}

#[tokio::test]
async fn failing_daemon_contributes_zero() {
    let registry = Arc::new(Registry::new());
    let e = engine("t", TaskStatus::Download);
    registry.register(record(1, 10, EngineKind::Torrent, &e)).await;
    let b = board(&registry, 4).with_source(DaemonSpeed::new(EngineKind::Torrent, true));

    let StatusReply::Overview(ov) = b.callback(&format!("status {CHAT} ov")).await else {
        panic!("expected overview");
    };
    assert_eq!(ov.count(TaskStatus::Download), 1);
    assert_eq!(ov.throughput, Throughput::default());
}

#[tokio::test]
async fn uploading_task_leaves_its_download_daemon() {
    let registry = Arc::new(Registry::new());
    let admission = AdmissionController::new(
        Arc::clone(&registry),
        QueueLimits::default(),
        Arc::new(NoLimits),
        perms(),
    );
    let dl = Arc::new(FakeEngine::new("t1", TaskStatus::Download).with_speed(999));
    admission
        .submit(Submission::new(record(1, 10, EngineKind::Torrent, &dl)))
        .await
        .unwrap();
    let up = Arc::new(FakeEngine::new("u1", TaskStatus::Upload).with_speed(700));
    admission
        .begin_upload(1, up, EngineKind::CloudApi)
        .await
        .unwrap();

    let torrents = DaemonSpeed::new(EngineKind::Torrent, false);
    let b = board(&registry, 4).with_source(torrents.clone());
    let StatusReply::Overview(ov) = b.overview(CHAT).await else {
        panic!("expected overview");
    };
    assert_eq!(ov.count(TaskStatus::Upload), 1);
    assert_eq!(
        ov.throughput,
        Throughput {
            download: 0,
            upload: 700,
            seed: 0
        }
    );
    assert_eq!(torrents.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        registry.get(1).await.unwrap().0.engine_kind,
        EngineKind::CloudApi
    );
}
