//! Tests for registry membership, lookup and snapshots.

use crate::engine::EngineKind;
use crate::registry::{QueueEntry, QueueKind, QueueReason, Registry};
use crate::task::{StatusFilter, TaskLocation, TaskRef, TaskStatus};
use crate::testing::{engine, record};

#[tokio::test]
async fn register_get_remove() {
    let reg = Registry::new();
    let e = engine("a1b2c3", TaskStatus::Download);
    assert!(reg.register(record(10, 5, EngineKind::Direct, &e)).await);

    let (rec, loc) = reg.get(10).await.unwrap();
    assert_eq!(rec.owner_user_id, 5);
    assert_eq!(loc, TaskLocation::Active);

    assert!(reg.remove(10).await.is_some());
    assert!(reg.get(10).await.is_none());
    assert!(reg.remove(10).await.is_none());
}

#[tokio::test]
async fn id_is_tracked_in_one_place_only() {
    let reg = Registry::new();
    let e = engine("g1", TaskStatus::Download);
    {
        let mut st = reg.lock().await;
        assert!(st.enqueue(
            QueueKind::Download,
            QueueEntry {
                record: record(1, 5, EngineKind::Direct, &e),
                reason: QueueReason::DownloadLimit,
            },
        ));
        assert!(!st.enqueue(
            QueueKind::Upload,
            QueueEntry {
                record: record(1, 5, EngineKind::Direct, &e),
                reason: QueueReason::UploadLimit,
            },
        ));
    }
    assert!(!reg.register(record(1, 5, EngineKind::Direct, &e)).await);
    assert_eq!(reg.location(1).await, Some(TaskLocation::DownloadQueue));
    assert_eq!(reg.total().await, 1);
}

#[tokio::test]
async fn get_by_gid_accepts_prefix() {
    let reg = Registry::new();
    let e = engine("deadbeef42", TaskStatus::Seed);
    reg.register(record(3, 5, EngineKind::Torrent, &e)).await;

    assert_eq!(reg.get_by_gid("deadbeef42").await.unwrap().0.id, 3);
    assert_eq!(reg.get_by_gid("deadb").await.unwrap().0.id, 3);
    assert!(reg.get_by_gid("beef").await.is_none());
    assert!(reg.get_by_gid("").await.is_none());
    assert_eq!(
        reg.resolve(&TaskRef::Gid("dead".into())).await.unwrap().0.id,
        3
    );
    assert_eq!(reg.resolve(&TaskRef::Request(3)).await.unwrap().0.id, 3);
}

#[tokio::test]
async fn list_filters_by_status_and_owner_in_submission_order() {
    let reg = Registry::new();
    let a = engine("a", TaskStatus::Download);
    let b = engine("b", TaskStatus::Upload);
    let c = engine("c", TaskStatus::Download);
    reg.register(record(30, 7, EngineKind::Direct, &a)).await;
    reg.register(record(10, 8, EngineKind::Direct, &b)).await;
    reg.register(record(20, 7, EngineKind::Direct, &c)).await;
    {
        let q = engine("q", TaskStatus::Download);
        let mut st = reg.lock().await;
        st.enqueue(
            QueueKind::Download,
            QueueEntry {
                record: record(40, 7, EngineKind::Direct, &q),
                reason: QueueReason::DownloadLimit,
            },
        );
    }

    let all: Vec<_> = reg
        .list(StatusFilter::All, None)
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(all, vec![30, 10, 20, 40]);

    let downloads: Vec<_> = reg
        .list(StatusFilter::Only(TaskStatus::Download), Some(7))
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(downloads, vec![30, 20]);

    let queued = reg
        .list(StatusFilter::Only(TaskStatus::QueuedDownload), None)
        .await;
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].location, TaskLocation::DownloadQueue);
}

#[tokio::test]
async fn active_counts_split_by_phase() {
    let reg = Registry::new();
    let e = engine("x", TaskStatus::Download);
    reg.register(record(1, 5, EngineKind::Direct, &e)).await;
    let mut up = record(2, 5, EngineKind::Direct, &e);
    up.phase = crate::task::Phase::Upload;
    reg.register(up).await;
    assert_eq!(reg.lock().await.active_counts(), (1, 1));
}
