//! Tests for [`RequestDeduplicator`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use heimdall::{HeimdallError, RequestDeduplicator};

/// Operation that counts invocations and resolves after a short delay.
fn slow_op(
    calls: &Arc<AtomicU32>,
    value: u32,
) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = heimdall::Result<u32>> + Send>> {
    let calls = calls.clone();
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(value)
        })
    }
}

#[tokio::test]
async fn concurrent_calls_share_one_execution() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
        dedup.deduplicate("k", slow_op(&calls, 7)),
        dedup.deduplicate("k", slow_op(&calls, 99)),
    );

    assert_eq!(a.unwrap(), 7);
    assert_eq!(b.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_keys_run_independently() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicU32::new(0));

    let (a, b) = tokio::join!(
        dedup.deduplicate("a", slow_op(&calls, 1)),
        dedup.deduplicate("b", slow_op(&calls, 2)),
    );

    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn settled_key_runs_again() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicU32::new(0));

    dedup.deduplicate("k", slow_op(&calls, 1)).await.unwrap();
    assert!(!dedup.is_pending("k"));

    let second = dedup.deduplicate("k", slow_op(&calls, 2)).await.unwrap();
    assert_eq!(second, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_reaches_every_waiter_and_releases_key() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let failing = move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(HeimdallError::Http("connection reset".into()))
        }
    };

    let (a, b) = tokio::join!(
        dedup.deduplicate("k", failing),
        dedup.deduplicate("k", || async { Ok(1) }),
    );

    assert!(matches!(a, Err(HeimdallError::Http(ref m)) if m == "connection reset"));
    assert!(matches!(b, Err(HeimdallError::Http(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!dedup.is_pending("k"));

    // Retry after failure starts fresh.
    assert_eq!(dedup.deduplicate("k", || async { Ok(5) }).await.unwrap(), 5);
}

#[tokio::test]
async fn pending_count_and_clear() {
    let dedup: Arc<RequestDeduplicator<u32>> = Arc::new(RequestDeduplicator::new());
    let (tx, rx) = tokio::sync::oneshot::channel::<u32>();

    let d = dedup.clone();
    let waiter = tokio::spawn(async move {
        d.deduplicate("slow", || async move {
            Ok(rx.await.unwrap_or(0))
        })
        .await
    });
    while !dedup.is_pending("slow") {
        tokio::task::yield_now().await;
    }
    assert_eq!(dedup.pending_count(), 1);

    dedup.clear(None);
    assert_eq!(dedup.pending_count(), 0);
    assert!(!dedup.is_pending("slow"));

    // The already-returned future still resolves to its own outcome.
    tx.send(42).unwrap();
    assert_eq!(waiter.await.unwrap().unwrap(), 42);
}

#[tokio::test]
async fn custom_error_type() {
    let dedup: RequestDeduplicator<String, String> = RequestDeduplicator::new();
    let result = dedup
        .deduplicate("k", || async { Err::<String, _>("bad input".to_string()) })
        .await;
    assert_eq!(result.unwrap_err(), "bad input");
}

#[tokio::test]
async fn operation_settles_after_every_caller_gives_up() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
    let finished = Arc::new(AtomicU32::new(0));
    let flag = finished.clone();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        dedup.deduplicate("k", move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(1, Ordering::SeqCst);
            Ok(1)
        }),
    )
    .await;
    assert!(abandoned.is_err(), "caller should have timed out");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);
    assert!(!dedup.is_pending("k"));
    assert_eq!(dedup.pending_count(), 0);

    let calls = Arc::new(AtomicU32::new(0));
    assert_eq!(dedup.deduplicate("k", slow_op(&calls, 2)).await.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
