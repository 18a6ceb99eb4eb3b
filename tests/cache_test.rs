//! Response cache behaviour through the public client.

mod common;

use common::RecordingTransport;
use flynet::base::timer::ManualScheduler;
use flynet::http::{CacheStore, Payload, Ttl};
use flynet::{Client, Error};
use http::StatusCode;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn manual_client(transport: Arc<RecordingTransport>) -> (Client, Arc<ManualScheduler>) {
    let scheduler = Arc::new(ManualScheduler::new());
    let client = Client::builder()
        .transport(transport)
        .scheduler(scheduler.clone())
        .build();
    (client, scheduler)
}

#[tokio::test]
async fn test_hit_while_alive_then_refetch_after_ttl() {
    let transport = RecordingTransport::ok(json!({"n": 1}));
    let (client, scheduler) = manual_client(transport.clone());

    let first = client.path("items").cache(10u64).get().await.unwrap();
    let second = client.path("items").cache(10u64).get().await.unwrap();
    assert_eq!(transport.calls(), 1);
    assert_eq!(first, second);

    scheduler.advance(Duration::from_millis(9));
    client.path("items").cache(10u64).get().await.unwrap();
    assert_eq!(transport.calls(), 1);

    assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
    assert!(client.cache_store().is_empty());

    client.path("items").cache(10u64).get().await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_cache_key_is_full_url() {
    let transport = RecordingTransport::empty();
    let (client, _scheduler) = manual_client(transport.clone());

    client.path("items").query("page", 1).cache_forever().get().await.unwrap();
    client.path("items").query("page", 2).cache_forever().get().await.unwrap();
    client.path("items").query("page", 1).cache_forever().get().await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert!(client.cache_store().contains("items?page=1"));
    assert!(client.cache_store().contains("items?page=2"));
}

#[tokio::test]
async fn test_uncached_get_always_dispatches() {
    let transport = RecordingTransport::empty();
    let (client, _scheduler) = manual_client(transport.clone());

    client.path("items").cache_forever().get().await.unwrap();
    client.path("items").get().await.unwrap();
    client.path("items").get().await.unwrap();

    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_dispatch() {
    let (transport, gate) = RecordingTransport::gated(json!({"shared": true}));
    let (client, _scheduler) = manual_client(transport.clone());

    let (a, b, ()) = tokio::join!(
        client.path("slow").cache(1_000u64).get(),
        client.path("slow").cache(1_000u64).enrich_response().get(),
        async {
            tokio::task::yield_now().await;
            gate.notify_one();
        }
    );

    assert_eq!(transport.calls(), 1);
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.data(), &Payload::Json(json!({"shared": true})));
    assert_eq!(b.envelope().map(|e| e.status), Some(StatusCode::OK));
    assert_eq!(a.data(), b.data());
}

#[tokio::test]
async fn test_failures_stay_cached() {
    let transport = RecordingTransport::status(StatusCode::INTERNAL_SERVER_ERROR);
    let (client, _scheduler) = manual_client(transport.clone());

    let first = client.path("broken").cache(50u64).get().await.unwrap_err();
    let second = client.path("broken").cache(50u64).get().await.unwrap_err();

    assert_eq!(transport.calls(), 1);
    assert_eq!(first.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(first.to_string(), second.to_string());
}

#[tokio::test]
async fn test_forever_arms_no_timer() {
    let transport = RecordingTransport::empty();
    let (client, scheduler) = manual_client(transport.clone());

    client.path("static").cache_forever().get().await.unwrap();
    client.path("negative").cache_value(&json!(-5)).get().await.unwrap();
    assert_eq!(scheduler.pending(), 0);

    scheduler.advance(Duration::from_secs(3600));
    client.path("static").cache_forever().get().await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert_eq!(client.cache_store().ttl("negative"), Some(Ttl::Forever));
}

#[tokio::test]
async fn test_stale_timer_leaves_newer_entry() {
    let transport = RecordingTransport::empty();
    let (client, scheduler) = manual_client(transport.clone());

    client.path("items").cache(10u64).get().await.unwrap();
    client.clear_cache();
    client.path("items").cache(100u64).get().await.unwrap();
    assert_eq!(transport.calls(), 2);

    // The first entry's timer fires but the key now holds a newer entry.
    scheduler.advance(Duration::from_millis(10));
    assert!(client.cache_store().contains("items"));
    client.path("items").cache(100u64).get().await.unwrap();
    assert_eq!(transport.calls(), 2);

    scheduler.advance(Duration::from_millis(90));
    assert!(!client.cache_store().contains("items"));
}

#[tokio::test]
async fn test_hooks_skipped_on_hit() {
    let transport = RecordingTransport::empty();
    let (client, _scheduler) = manual_client(transport.clone());
    let runs = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let runs = runs.clone();
        client
            .path("hooked")
            .cache_forever()
            .before_send(move |_| {
                runs.fetch_add(1, Ordering::SeqCst);
            })
            .get()
            .await
            .unwrap();
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_hook_may_read_the_store_on_a_miss() {
    let transport = RecordingTransport::ok(json!({"n": 1}));
    let (client, _scheduler) = manual_client(transport.clone());
    let store = client.cache_store().clone();
    let seen = Arc::new(std::sync::Mutex::new(None));

    let seen_in_hook = seen.clone();
    let reply = client
        .path("lookup")
        .cache_forever()
        .before_send(move |_| {
            *seen_in_hook.lock().unwrap() = Some((store.len(), store.contains("lookup")));
        })
        .get()
        .await
        .unwrap();

    assert_eq!(reply.data(), &Payload::Json(json!({"n": 1})));
    assert_eq!(*seen.lock().unwrap(), Some((1, true)));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_hook_may_clear_the_store_on_a_miss() {
    let transport = RecordingTransport::empty();
    let (client, _scheduler) = manual_client(transport.clone());
    let store = client.cache_store().clone();

    client
        .path("cleared")
        .cache_forever()
        .before_send(move |_| store.clear_all())
        .get()
        .await
        .unwrap();
    assert!(client.cache_store().is_empty());

    client.path("cleared").cache_forever().get().await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_cache_rejects_other_methods_before_io() {
    let transport = RecordingTransport::empty();
    let (client, _scheduler) = manual_client(transport.clone());

    let err = client
        .path("items")
        .cache(10u64)
        .send("delete", serde_json::Value::Null)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CacheNonGet { ref method } if method == "DELETE"));
    assert_eq!(transport.calls(), 0);
    assert!(client.cache_store().is_empty());
}

#[tokio::test]
async fn test_client_clear_cache_forces_refetch() {
    let transport = RecordingTransport::empty();
    let (client, _scheduler) = manual_client(transport.clone());

    client.path("a").cache_forever().get().await.unwrap();
    client.path("b").cache_forever().get().await.unwrap();
    assert_eq!(client.cache_store().len(), 2);

    client.clear_cache();
    assert!(client.cache_store().is_empty());

    client.path("a").cache_forever().get().await.unwrap();
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_global_clear_cache() {
    let transport = RecordingTransport::empty();
    let client = Client::builder().transport(transport.clone()).build();
    assert!(Arc::ptr_eq(client.cache_store(), &CacheStore::global()));

    let key = "global-clear-cache-test";
    client.path(key).cache_forever().get().await.unwrap();
    client.path(key).cache_forever().get().await.unwrap();
    assert_eq!(transport.calls(), 1);

    flynet::clear_cache();
    assert!(!CacheStore::global().contains(key));

    client.path(key).cache_forever().get().await.unwrap();
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_tokio_timer_evicts_entry() {
    let transport = RecordingTransport::empty();
    let store = Arc::new(CacheStore::new());
    let client = Client::builder()
        .transport(transport.clone())
        .cache_store(store.clone())
        .build();

    client.path("ttl").cache(10u64).get().await.unwrap();
    client.path("ttl").cache(10u64).get().await.unwrap();
    assert_eq!(transport.calls(), 1);

    tokio::time::sleep(Duration::from_millis(15)).await;
    assert!(store.is_empty());

    client.path("ttl").cache(10u64).get().await.unwrap();
    assert_eq!(transport.calls(), 2);
}
