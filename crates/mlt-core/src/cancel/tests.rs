//! Tests for single, tag and bulk cancellation.

use std::sync::Arc;
use std::time::Duration;

use crate::admission::{AdmissionController, NoLimits};
use crate::cancel::{BulkCancelReply, CancelReply, CancelService, StopBatchReply};
use crate::command::CommandContext;
use crate::config::QueueLimits;
use crate::registry::Registry;
use crate::task::{StatusFilter, TagStop, TaskLocation, TaskRef, TaskStatus};
use crate::testing::{engine, perms, submission, FakeEngine, SUDO};

const PACING: Duration = Duration::from_millis(2000);

fn service(limits: QueueLimits) -> CancelService {
    let admission = Arc::new(AdmissionController::new(
        Arc::new(Registry::new()),
        limits,
        Arc::new(NoLimits),
        perms(),
    ));
    CancelService::new(admission, perms(), "mltbot", PACING)
}

async fn submit(svc: &CancelService, id: i64, owner: i64, gid: &str) -> Arc<FakeEngine> {
    let e = engine(gid, TaskStatus::Download);
    svc.admission.submit(submission(id, owner, &e)).await.unwrap();
    e
}

#[tokio::test(start_paused = true)]
async fn bulk_cancel_paces_between_targets() {
    let svc = service(QueueLimits::default());
    let a = submit(&svc, 1, 10, "a").await;
    let b = submit(&svc, 2, 10, "b").await;
    let c = submit(&svc, 3, 10, "c").await;

    let start = tokio::time::Instant::now();
    assert!(svc.cancel_all(StatusFilter::Only(TaskStatus::Download), None).await);

    assert_eq!(svc.registry.total().await, 0);
    let times: Vec<_> = [&a, &b, &c]
        .iter()
        .map(|e| e.cancel_times.lock().unwrap()[0])
        .collect();
    assert_eq!(times[0], start);
    assert!(times[1] - times[0] >= PACING);
    assert!(times[2] - times[1] >= PACING);
    assert!(times[2] - start < PACING * 3);
}

#[tokio::test]
async fn bulk_cancel_without_matches_reports_false() {
    let svc = service(QueueLimits::default());
    let a = submit(&svc, 1, 10, "a").await;
    assert!(!svc.cancel_all(StatusFilter::Only(TaskStatus::Seed), None).await);
    assert_eq!(a.cancels(), 0);
    assert_eq!(svc.registry.total().await, 1);
}

#[tokio::test]
async fn bulk_cancel_respects_owner_and_includes_queued() {
    let svc = service(QueueLimits {
        download: Some(1),
        ..QueueLimits::default()
    });
    let mine = submit(&svc, 1, 10, "m1").await;
    let mine_queued = submit(&svc, 2, 10, "m2").await;
    let theirs = submit(&svc, 3, 11, "t1").await;

    assert!(svc.cancel_all(StatusFilter::All, Some(10)).await);
    assert_eq!(mine.cancels(), 1);
    assert_eq!(mine_queued.cancels(), 1);
    assert_eq!(theirs.cancels(), 0);
    // The freed slot goes to the remaining queued task.
    assert_eq!(svc.registry.location(3).await, Some(TaskLocation::Active));
    assert_eq!(theirs.starts(), 1);
}

#[tokio::test]
async fn tag_cancel_is_idempotent() {
    let svc = service(QueueLimits::default());
    let token = svc.registry.lock().await.tags.insert(123_456);
    assert!(token.is_active());

    let first = svc
        .cancel_command(10, &CommandContext::new("/cancel_123456"))
        .await;
    assert_eq!(first, CancelReply::TagStopped { tag: 123_456 });
    assert!(!token.is_active());
    assert!(!svc.registry.tag_active(123_456).await);

    let second = svc
        .cancel_command(10, &CommandContext::new("/cancel_123456"))
        .await;
    assert_eq!(second, CancelReply::TagAlreadyStopped { tag: 123_456 });
}

#[tokio::test]
async fn stranger_cannot_cancel() {
    let svc = service(QueueLimits::default());
    let a = submit(&svc, 1, 10, "abc").await;

    let reply = svc.cancel_task(99, &TaskRef::Gid("abc".into())).await;
    assert_eq!(reply, CancelReply::Unauthorized);
    assert_eq!(a.cancels(), 0);
    assert_eq!(svc.registry.location(1).await, Some(TaskLocation::Active));

    let reply = svc.cancel_task(SUDO, &TaskRef::Gid("abc".into())).await;
    assert_eq!(reply, CancelReply::Cancelled { id: 1 });
    assert_eq!(a.cancels(), 1);
}

#[tokio::test]
async fn engine_failure_still_drops_bookkeeping() {
    let svc = service(QueueLimits::default());
    let e = Arc::new(FakeEngine::new("bad", TaskStatus::Download).failing_cancel());
    svc.admission.submit(submission(1, 10, &e)).await.unwrap();

    let reply = svc.cancel_task(10, &TaskRef::Request(1)).await;
    assert_eq!(reply, CancelReply::EngineError { id: 1 });
    assert_eq!(svc.registry.location(1).await, None);

    let again = svc.cancel_task(10, &TaskRef::Request(1)).await;
    assert_eq!(again, CancelReply::NotActive);
    assert_eq!(e.cancels(), 1);
}

#[tokio::test]
async fn task_finished_after_resolve_is_not_cancelled() {
    let svc = service(QueueLimits {
        download: Some(1),
        ..QueueLimits::default()
    });
    let a = submit(&svc, 1, 10, "abc").await;
    let b = submit(&svc, 2, 10, "def").await;

    let target = TaskRef::Gid("abc".into());
    let (rec, _) = svc.registry.resolve(&target).await.unwrap();
    // Finishes and hands its slot to task 2 before the cancel acts.
    svc.admission.finish(rec.id).await.unwrap();
    assert_eq!(svc.registry.location(2).await, Some(TaskLocation::Active));

    assert_eq!(
        svc.cancel_resolved(rec.id, &target).await,
        CancelReply::NotFound {
            target: "abc".into()
        }
    );
    assert_eq!(
        svc.cancel_resolved(rec.id, &TaskRef::Request(1)).await,
        CancelReply::NotActive
    );
    assert_eq!(a.cancels(), 0);
    assert_eq!(b.cancels(), 0);
    assert_eq!(b.starts(), 1);
    assert_eq!(svc.registry.location(2).await, Some(TaskLocation::Active));
}

#[tokio::test]
async fn cancel_command_target_resolution() {
    let svc = service(QueueLimits::default());
    let a = submit(&svc, 1, 10, "abcdef").await;

    assert_eq!(
        svc.cancel_command(10, &CommandContext::new("/cancel")).await,
        CancelReply::Usage
    );
    assert_eq!(
        svc.cancel_command(10, &CommandContext::new("/cancel_zzz")).await,
        CancelReply::NotFound {
            target: "zzz".into()
        }
    );
    assert_eq!(
        svc.cancel_command(10, &CommandContext::new("/cancel_abc@otherbot"))
            .await,
        CancelReply::Ignored
    );
    assert_eq!(
        svc.cancel_command(10, &CommandContext::new("/cancel").replying_to(7))
            .await,
        CancelReply::NotActive
    );
    assert_eq!(
        svc.cancel_command(10, &CommandContext::new("/cancel").replying_to(1))
            .await,
        CancelReply::Cancelled { id: 1 }
    );
    assert_eq!(a.cancels(), 1);
}

#[tokio::test]
async fn stop_batch_callback_checks_starter() {
    let svc = service(QueueLimits::default());
    svc.registry.lock().await.tags.insert(222_222);

    assert_eq!(
        svc.stop_batch_callback(99, "stopm 10 222222").await,
        StopBatchReply::NotYours
    );
    assert!(svc.registry.tag_active(222_222).await);
    assert_eq!(
        svc.stop_batch_callback(10, "stopm 10 222222").await,
        StopBatchReply::Stopped
    );
    assert_eq!(
        svc.stop_batch_callback(SUDO, "stopm 10 222222").await,
        StopBatchReply::AlreadyStopped
    );
    assert_eq!(svc.stop_batch_callback(10, "stopm x").await, StopBatchReply::Invalid);
    assert_eq!(svc.cancel_tag(222_222).await, TagStop::AlreadyStopped);
}

#[tokio::test(start_paused = true)]
async fn bulk_flow_menu_confirm_execute() {
    let svc = service(QueueLimits::default());
    assert_eq!(svc.cancel_all_buttons(10).await, BulkCancelReply::NoActiveTasks);

    let mine = submit(&svc, 1, 10, "a").await;
    let theirs = submit(&svc, 2, 11, "b").await;

    let BulkCancelReply::Menu { user, buttons } = svc.cancel_all_buttons(10).await else {
        panic!("expected menu");
    };
    assert_eq!(user, Some(10));
    let pick = crate::button::find(&buttons, "All").unwrap().action.clone();

    let BulkCancelReply::Confirm { buttons, .. } = svc.bulk_callback(10, &pick).await else {
        panic!("expected confirm prompt");
    };
    let yes = crate::button::find(&buttons, "Yes!").unwrap().action.clone();
    let back = crate::button::find(&buttons, "Back").unwrap().action.clone();
    assert!(matches!(
        svc.bulk_callback(10, &back).await,
        BulkCancelReply::Menu { user: Some(10), .. }
    ));

    // Someone else pressing the confirm button gets nothing.
    assert_eq!(svc.bulk_callback(11, &yes).await, BulkCancelReply::NotYours);
    assert_eq!(mine.cancels(), 0);

    assert_eq!(
        svc.bulk_callback(10, &yes).await,
        BulkCancelReply::Done {
            filter: StatusFilter::All,
            matched: true
        }
    );
    assert_eq!(mine.cancels(), 1);
    assert_eq!(theirs.cancels(), 0);
}

#[tokio::test]
async fn unscoped_bulk_cancel_needs_privilege() {
    let svc = service(QueueLimits::default());
    let a = submit(&svc, 1, 10, "a").await;

    assert_eq!(
        svc.bulk_callback(10, "canall bot ms 10").await,
        BulkCancelReply::NotYours
    );
    assert_eq!(
        svc.bulk_callback(10, "canall All confirm").await,
        BulkCancelReply::NotYours
    );
    assert_eq!(a.cancels(), 0);

    let BulkCancelReply::Menu { user, buttons } = svc.bulk_callback(SUDO, "canall bot ms 2").await
    else {
        panic!("expected menu");
    };
    assert_eq!(user, None);
    assert!(crate::button::find(&buttons, "My Tasks").is_some());
    assert_eq!(
        svc.bulk_callback(SUDO, "canall All confirm").await,
        BulkCancelReply::Done {
            filter: StatusFilter::All,
            matched: true
        }
    );
    assert_eq!(a.cancels(), 1);
}
