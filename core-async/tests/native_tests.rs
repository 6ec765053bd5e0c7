//! Integration tests for the runtime facade.
//!
//! These cover the primitives the session actor relies on: bounded command
//! queues, latest-value snapshots, cancellable timers and abortable tasks.

use core_async::{sync, task, time};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[core_async::test]
async fn test_task_spawn() {
    let handle = task::spawn(async { 42 });
    assert_eq!(handle.await.unwrap(), 42);
}

#[core_async::test]
async fn test_spawn_blocking_runs_off_thread() {
    let handle = task::spawn_blocking(|| {
        std::thread::sleep(std::time::Duration::from_millis(10));
        100
    });
    assert_eq!(handle.await.unwrap(), 100);
}

#[core_async::test]
async fn test_timeout_elapses() {
    let result = time::timeout(time::Duration::from_millis(10), async {
        time::sleep(time::Duration::from_millis(200)).await;
    })
    .await;

    assert!(result.is_err());
}

#[core_async::test]
async fn test_mpsc_preserves_order() {
    let (tx, mut rx) = sync::mpsc::channel(4);

    task::spawn(async move {
        for i in 0..5 {
            tx.send(i).await.unwrap();
        }
    });

    let mut received = Vec::new();
    while let Some(value) = rx.recv().await {
        received.push(value);
    }

    assert_eq!(received, vec![0, 1, 2, 3, 4]);
}

#[core_async::test]
async fn test_oneshot_reply() {
    let (tx, rx) = sync::oneshot::channel();

    task::spawn(async move {
        time::sleep(time::Duration::from_millis(5)).await;
        tx.send("done").unwrap();
    });

    assert_eq!(rx.await.unwrap(), "done");
}

#[core_async::test]
async fn test_watch_late_subscriber_sees_latest() {
    let (tx, _rx) = sync::watch::channel(0u32);
    for i in 1..=3 {
        tx.send_replace(i);
    }

    let late = tx.subscribe();
    assert_eq!(*late.borrow(), 3);
}

#[core_async::test]
async fn test_broadcast_fan_out() {
    let (tx, mut rx1) = sync::broadcast::channel(8);
    let mut rx2 = tx.subscribe();

    tx.send("event").unwrap();

    assert_eq!(rx1.recv().await.unwrap(), "event");
    assert_eq!(rx2.recv().await.unwrap(), "event");
}

#[core_async::test]
async fn test_cancelled_timer_never_fires() {
    let fired = Arc::new(AtomicUsize::new(0));
    let token = sync::CancellationToken::new();

    let fired_clone = fired.clone();
    let child = token.child_token();
    let handle = task::spawn(async move {
        sleep_unless_cancelled(child, fired_clone).await;
    });

    token.cancel();
    handle.await.unwrap();
    time::sleep(time::Duration::from_millis(40)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

async fn sleep_unless_cancelled(token: sync::CancellationToken, fired: Arc<AtomicUsize>) {
    let sleep = time::sleep(time::Duration::from_millis(20));
    futures::pin_mut!(sleep);
    let cancelled = token.cancelled();
    futures::pin_mut!(cancelled);
    if let futures::future::Either::Left(_) = futures::future::select(sleep, cancelled).await {
        fired.fetch_add(1, Ordering::SeqCst);
    }
}

#[core_async::test]
async fn test_abort_stops_task() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = counter.clone();

    let handle = task::spawn(async move {
        loop {
            time::sleep(time::Duration::from_millis(5)).await;
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    time::sleep(time::Duration::from_millis(20)).await;
    handle.abort();
    let _ = handle.await;
    let after_abort = counter.load(Ordering::SeqCst);

    time::sleep(time::Duration::from_millis(20)).await;
    assert_eq!(counter.load(Ordering::SeqCst), after_abort);
}
