//! Reconciler Tests
//!
//! Verifies the sync pass:
//! - Single-flight under concurrent triggers
//! - Offline guard
//! - Queue drain and persisted empty queue
//! - Failure isolation between replayers

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tillsync::clock::ManualClock;
use tillsync::config::DEFAULT_QUEUE_KEY;
use tillsync::sync::SkipReason;
use tillsync::{
    MemoryBackend, Notification, OfflineConfig, OfflineContext, ReplayError, SyncReport,
};
use tokio::sync::Notify;

fn create_test_context() -> (OfflineContext, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let ctx = OfflineContext::with_clock(
        OfflineConfig::default(),
        backend.clone(),
        Arc::new(ManualClock::new(1_700_000_000_000)),
    );
    (ctx, backend)
}

fn counting_replayer(ctx: &OfflineContext, key: &str) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    ctx.register_sync_fn(key, move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    calls
}

#[tokio::test]
async fn test_single_flight_under_concurrent_triggers() {
    let (ctx, _backend) = create_test_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Notify::new());

    let c = calls.clone();
    let r = release.clone();
    ctx.register_sync_fn("orders", move || {
        let c = c.clone();
        let r = r.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            r.notified().await;
            Ok(())
        }
    });

    let mut syncing = ctx.status_ref().watch_syncing();
    let first = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.sync_pending_actions().await }
    });
    syncing.wait_for(|s| *s).await.unwrap();

    let second = ctx.sync_pending_actions().await;
    assert_eq!(
        second,
        SyncReport::Skipped {
            reason: SkipReason::AlreadySyncing
        }
    );

    release.notify_one();
    let first = first.await.unwrap();
    assert!(first.is_completed());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!ctx.is_syncing());
}

#[tokio::test]
async fn test_offline_guard_skips_everything() {
    let (ctx, backend) = create_test_context();
    let calls = counting_replayer(&ctx, "orders");
    ctx.add_pending_action("insert", "orders", &json!({"n": 1}));
    ctx.status_ref().set_online(false);
    let mut notifications = ctx.subscribe_notifications();

    let report = ctx.sync_pending_actions().await;
    assert_eq!(
        report,
        SyncReport::Skipped {
            reason: SkipReason::Offline
        }
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.pending_actions_count(), 1);
    assert!(!ctx.is_syncing());
    assert!(ctx.last_sync_time().is_none());
    assert!(backend.raw(DEFAULT_QUEUE_KEY).unwrap().contains("insert"));
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_queue_drains_on_success() {
    let (ctx, backend) = create_test_context();
    for n in 0..5 {
        ctx.add_pending_action("insert", "orders", &json!({"n": n}));
    }
    assert_eq!(ctx.pending_actions_count(), 5);
    let calls = counting_replayer(&ctx, "orders");
    let mut notifications = ctx.subscribe_notifications();

    let report = ctx.sync_pending_actions().await;
    match report {
        SyncReport::Completed {
            succeeded,
            failed,
            cleared_actions,
            finished_at,
        } => {
            assert_eq!(succeeded, vec!["orders"]);
            assert!(failed.is_empty());
            assert_eq!(cleared_actions, 5);
            assert_eq!(finished_at.timestamp_millis(), 1_700_000_000_000);
        }
        other => panic!("unexpected report: {:?}", other),
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.pending_actions_count(), 0);
    assert_eq!(backend.raw(DEFAULT_QUEUE_KEY).as_deref(), Some("[]"));
    assert!(ctx.last_sync_time().is_some());
    assert!(!ctx.is_syncing());
    assert_eq!(notifications.recv().await.unwrap(), Notification::SyncSucceeded);
}

#[tokio::test]
async fn test_sync_with_no_replayers_still_clears() {
    let (ctx, backend) = create_test_context();
    ctx.add_pending_action("update", "tables", &json!({"id": 3}));

    let report = ctx.sync_pending_actions().await;
    assert!(report.is_completed());
    assert_eq!(ctx.pending_actions_count(), 0);
    assert_eq!(backend.raw(DEFAULT_QUEUE_KEY).as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_failed_replayer_is_isolated() {
    let (ctx, _backend) = create_test_context();
    ctx.add_pending_action("insert", "orders", &json!({"n": 1}));
    ctx.add_pending_action("insert", "orders", &json!({"n": 2}));

    let a_calls = counting_replayer(&ctx, "a");
    ctx.register_sync_fn("b", || async {
        Err(ReplayError::other("kitchen printer unreachable"))
    });

    match ctx.sync_pending_actions().await {
        SyncReport::Completed {
            succeeded,
            failed,
            cleared_actions,
            ..
        } => {
            assert_eq!(succeeded, vec!["a"]);
            assert_eq!(failed, vec!["b"]);
            // Queue is dropped even though "b" failed
            assert_eq!(cleared_actions, 2);
        }
        other => panic!("unexpected report: {:?}", other),
    }

    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.pending_actions_count(), 0);
    assert!(ctx.last_sync_time().is_some());
}

#[tokio::test]
async fn test_replayers_run_concurrently() {
    let (ctx, _backend) = create_test_context();
    let started = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    for key in ["orders", "tables"] {
        let started = started.clone();
        let gate = gate.clone();
        ctx.register_sync_fn(key, move || {
            let started = started.clone();
            let gate = gate.clone();
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(())
            }
        });
    }

    let task = tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.sync_pending_actions().await }
    });

    // Both replayers must be in flight at once before either is released
    tokio::time::timeout(Duration::from_secs(5), async {
        while started.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("replayers did not start concurrently");

    gate.notify_waiters();
    let report = task.await.unwrap();
    assert!(report.is_completed());
}

#[tokio::test]
async fn test_clear_failure_reports_failed() {
    let (ctx, backend) = create_test_context();
    ctx.add_pending_action("insert", "orders", &json!({"n": 1}));
    counting_replayer(&ctx, "orders");
    let mut notifications = ctx.subscribe_notifications();

    backend.set_read_only(true);
    let report = ctx.sync_pending_actions().await;
    assert!(matches!(report, SyncReport::Failed { .. }));
    assert!(ctx.last_sync_time().is_none());
    assert!(!ctx.is_syncing());
    assert_eq!(ctx.pending_actions_count(), 1);
    assert_eq!(notifications.recv().await.unwrap(), Notification::SyncFailed);

    backend.set_read_only(false);
    assert!(ctx.sync_pending_actions().await.is_completed());
    assert_eq!(ctx.pending_actions_count(), 0);
}
