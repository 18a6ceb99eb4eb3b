use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flynet::base::timer::ManualScheduler;
use flynet::http::httpcache::{CacheStore, SharedResult, Ttl};
use flynet::http::{Envelope, Payload};
use futures::FutureExt;
use http::{HeaderMap, StatusCode};
use std::sync::Arc;

fn settled() -> SharedResult {
    let envelope = Envelope::new(StatusCode::OK, HeaderMap::new(), Payload::Null);
    futures::future::ready(Ok(envelope)).boxed().shared()
}

/// Cache lookups run on every cached GET; timers are virtual so only the
/// map and bookkeeping cost is measured.
fn benchmark_cache_store(c: &mut Criterion) {
    let store = CacheStore::with_scheduler(Arc::new(ManualScheduler::new()));
    for i in 0..1_000 {
        store.put(format!("items?page={}", i), settled(), Ttl::Forever);
    }

    c.bench_function("cache_hit", |b| {
        b.iter(|| {
            let (pending, hit) =
                store.get_or_insert_with(black_box("items?page=500"), Ttl::Forever, settled);
            black_box((pending, hit))
        })
    });

    c.bench_function("cache_miss_and_store", |b| {
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            let key = format!("fresh/{}", n);
            black_box(store.get_or_insert_with(&key, Ttl::Forever, settled))
        })
    });

    let timed = CacheStore::with_scheduler(Arc::new(ManualScheduler::new()));
    c.bench_function("cache_put_with_ttl", |b| {
        b.iter(|| timed.put(black_box("items"), settled(), Ttl::Millis(10_000)))
    });
}

criterion_group!(benches, benchmark_cache_store);
criterion_main!(benches);
