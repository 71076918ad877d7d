// Integration tests for the query/mutation cache layer.
// These exercise de-duplication, invalidation fan-out, the ordering guard,
// and eviction end to end, without touching the network.
// Unit tests for individual methods are in src/query/*.rs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use sehatly_client::error::ApiError;
use sehatly_client::notify::NotificationHub;
use sehatly_client::query::{
    Mutation, Query, QueryClient, QueryConfig, QueryKey, QueryResult, QueryState,
};
use tokio::time::{timeout, Duration};

const TICK: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(1);

/// Configuration with a long stale time, so emissions are driven purely by
/// fetches and invalidations rather than time.
fn settled_config() -> QueryConfig {
    QueryConfig::new(Duration::from_secs(60), Duration::from_secs(300))
}

/// A query whose fetcher counts its calls and returns the call number.
fn counting_query(
    key: QueryKey,
    client: Arc<QueryClient>,
    calls: Arc<AtomicUsize>,
    delay: Duration,
) -> Query<usize> {
    Query::new(
        key,
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(delay).await;
                Ok(call)
            })
        },
        client,
    )
}

async fn next_result(stream: &mut BoxStream<'static, QueryResult<usize>>) -> QueryResult<usize> {
    timeout(WAIT, stream.next())
        .await
        .expect("stream emits within timeout")
        .expect("stream still open")
}

#[tokio::test]
async fn concurrent_watchers_share_one_fetch() {
    let client = Arc::new(QueryClient::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::new("appointments").push("shared");

    let query_a = counting_query(key.clone(), client.clone(), calls.clone(), TICK);
    let query_b = counting_query(key, client, calls.clone(), TICK);

    let mut stream_a = query_a.watch();
    let mut stream_b = query_b.watch();

    // Both emit Loading, then the same resolved value.
    assert!(next_result(&mut stream_a).await.is_loading());
    assert!(next_result(&mut stream_b).await.is_loading());

    // Settle both concurrently so the dispatches overlap and share the
    // in-flight fetch.
    let (a, b) = tokio::join!(next_result(&mut stream_a), next_result(&mut stream_b));
    assert_eq!(a.data(), Some(&1));
    assert_eq!(b.data(), Some(&1));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "one network call per key");
}

#[tokio::test]
async fn concurrent_fetches_resolve_identically() {
    let client = Arc::new(QueryClient::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = QueryKey::new("clinicians").push("c1");

    let query = counting_query(key, client, calls.clone(), TICK);
    let (a, b, c) = tokio::join!(query.fetch(), query.fetch(), query.fetch());

    assert_eq!(a, Ok(1));
    assert_eq!(b, Ok(1));
    assert_eq!(c, Ok(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalidation_refetches_watched_key_only() {
    let client = Arc::new(QueryClient::with_config(settled_config()));
    let appointment_calls = Arc::new(AtomicUsize::new(0));
    let clinician_calls = Arc::new(AtomicUsize::new(0));

    let appointments = counting_query(
        QueryKey::new("appointments").push("list"),
        client.clone(),
        appointment_calls.clone(),
        Duration::ZERO,
    );
    let clinicians = counting_query(
        QueryKey::new("clinicians").push("list"),
        client.clone(),
        clinician_calls.clone(),
        Duration::ZERO,
    );

    let mut appointment_stream = appointments.watch();
    let mut clinician_stream = clinicians.watch();

    assert!(next_result(&mut appointment_stream).await.is_loading());
    assert_eq!(next_result(&mut appointment_stream).await.data(), Some(&1));
    assert!(next_result(&mut clinician_stream).await.is_loading());
    assert_eq!(next_result(&mut clinician_stream).await.data(), Some(&1));

    // Prefix invalidation: the appointments watcher re-enters loading and
    // refetches; the clinicians watcher stays quiet.
    client.invalidate(&QueryKey::new("appointments"));

    assert!(next_result(&mut appointment_stream).await.is_loading());
    assert_eq!(next_result(&mut appointment_stream).await.data(), Some(&2));
    assert_eq!(appointment_calls.load(Ordering::SeqCst), 2);

    let untouched = timeout(Duration::from_millis(100), clinician_stream.next()).await;
    assert!(untouched.is_err(), "unrelated key must not refetch");
    assert_eq!(clinician_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mutation_invalidation_drives_subscribers() {
    let client = Arc::new(QueryClient::with_config(settled_config()));
    let hub = NotificationHub::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let pending = counting_query(
        QueryKey::new("appointments").push("pending").push("c1"),
        client.clone(),
        calls,
        Duration::ZERO,
    );
    let mut stream = pending.watch();
    assert!(next_result(&mut stream).await.is_loading());
    assert_eq!(next_result(&mut stream).await.data(), Some(&1));

    let book: Mutation<u32, u32> =
        Mutation::new(client, hub, |input: u32| Box::pin(async move { Ok(input) }))
            .invalidates(QueryKey::new("appointments"));
    book.run(7).await.expect("mutation succeeds");

    assert!(next_result(&mut stream).await.is_loading());
    assert_eq!(next_result(&mut stream).await.data(), Some(&2));
}

#[tokio::test]
async fn failed_mutation_leaves_subscribers_untouched() {
    let client = Arc::new(QueryClient::with_config(settled_config()));
    let hub = NotificationHub::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let list = counting_query(
        QueryKey::new("appointments").push("list"),
        client.clone(),
        calls,
        Duration::ZERO,
    );
    let mut stream = list.watch();
    assert!(next_result(&mut stream).await.is_loading());
    assert_eq!(next_result(&mut stream).await.data(), Some(&1));

    let book: Mutation<u32, u32> = Mutation::new(client, hub, |_| {
        Box::pin(async move {
            Err(ApiError::Status {
                status: 409,
                message: "This slot is no longer available.".to_string(),
            })
        })
    })
    .invalidates(QueryKey::new("appointments"));
    assert!(book.run(7).await.is_err());

    let untouched = timeout(Duration::from_millis(100), stream.next()).await;
    assert!(untouched.is_err(), "no invalidation on mutation failure");
}

#[tokio::test]
async fn late_response_does_not_clobber_newer_data() {
    let client = Arc::new(QueryClient::new());
    let key = QueryKey::new("clinicians").push("search");
    let calls = Arc::new(AtomicUsize::new(0));

    // The first dispatch is slow, later ones are fast; the slow response
    // lands last and must not overwrite the newer data.
    let query = {
        let calls = calls.clone();
        Query::new(
            key.clone(),
            move || {
                let calls = calls.clone();
                Box::pin(async move {
                    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if call == 1 {
                        tokio::time::sleep(Duration::from_millis(120)).await;
                    }
                    Ok(call)
                })
            },
            client.clone(),
        )
    };

    let slow_fetch = tokio::spawn({
        let query = query.clone();
        async move { query.fetch().await }
    });
    tokio::time::sleep(TICK).await;

    // Detaching the in-flight dispatch lets the next fetch go out fresh.
    client.invalidate(&key);
    let fast = query.fetch().await;
    assert_eq!(fast, Ok(2));

    let slow = slow_fetch.await.expect("task completes");
    assert_eq!(slow, Ok(1), "the raw result still reaches its caller");

    match client.snapshot::<usize>(&key) {
        QueryState::Success { data, .. } => {
            assert_eq!(data, 2, "cache keeps the newer dispatch's data");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn unwatched_entries_are_evicted_after_cache_time() {
    let client = Arc::new(QueryClient::with_config(QueryConfig::new(
        Duration::from_secs(0),
        Duration::from_millis(10),
    )));
    let key = QueryKey::new("ephemeral");
    let query = counting_query(
        key.clone(),
        client.clone(),
        Arc::new(AtomicUsize::new(0)),
        Duration::ZERO,
    );

    query.fetch().await.expect("fetch succeeds");
    assert!(client.contains(&key));

    tokio::time::sleep(Duration::from_millis(30)).await;
    // Any store access sweeps; invalidating an unrelated key is enough.
    client.invalidate(&QueryKey::new("unrelated"));
    assert!(!client.contains(&key));
}

#[tokio::test]
async fn error_settle_retains_previous_data() {
    let client = Arc::new(QueryClient::with_config(settled_config()));
    let key = QueryKey::new("appointments").push("flaky");
    let calls = Arc::new(AtomicUsize::new(0));

    let query = {
        let calls = calls.clone();
        Query::new(
            key.clone(),
            move || {
                let calls = calls.clone();
                Box::pin(async move {
                    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if call == 1 {
                        Ok(11usize)
                    } else {
                        Err(ApiError::Status {
                            status: 500,
                            message: "Something went wrong. Please try again.".to_string(),
                        })
                    }
                })
            },
            client.clone(),
        )
    };

    let mut stream = query.watch();
    assert!(next_result(&mut stream).await.is_loading());
    assert_eq!(next_result(&mut stream).await.data(), Some(&11));

    client.invalidate(&key);
    assert!(next_result(&mut stream).await.is_loading());

    let failed = next_result(&mut stream).await;
    assert!(failed.is_error());
    assert_eq!(
        failed.data(),
        Some(&11),
        "previous data stays visible for UI stability"
    );
}
