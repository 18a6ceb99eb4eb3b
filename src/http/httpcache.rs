//! In-memory response cache keyed by request URL.
//!
//! Entries hold a shared handle to the *pending* transport result, so a
//! second request for the same key issued before the first settles awaits
//! the same future instead of dispatching again. Entries expire through a
//! one-shot timer armed on the store's [`Scheduler`].
//!
//! Thread-safe through `DashMap`; the check-then-insert of
//! [`CacheStore::get_or_insert_with`] holds the shard lock for the key.

use crate::base::predicates;
use crate::base::timer::{Scheduler, TokioScheduler};
use crate::http::transport::TransportResult;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// A transport result every waiter can clone out of.
pub type SharedResult = Shared<BoxFuture<'static, TransportResult>>;

/// How long a cached entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Until the store is cleared.
    Forever,
    /// Milliseconds after the entry is stored.
    Millis(u64),
}

impl Ttl {
    /// Interpret an untyped TTL argument.
    ///
    /// Numbers and numeric strings become milliseconds (fractions are
    /// truncated). Negative numbers and anything non-numeric mean forever.
    pub fn from_value(value: &Value) -> Self {
        match predicates::numeric_value(value) {
            Some(n) if n >= 0.0 => Ttl::Millis(n.floor() as u64),
            _ => Ttl::Forever,
        }
    }

    /// Milliseconds, with `-1` standing for forever.
    pub fn as_millis(&self) -> i64 {
        match self {
            Ttl::Forever => -1,
            Ttl::Millis(ms) => i64::try_from(*ms).unwrap_or(i64::MAX),
        }
    }

    /// Delay until eviction, `None` for entries that never expire.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Ttl::Forever => None,
            Ttl::Millis(ms) => Some(Duration::from_millis(*ms)),
        }
    }
}

impl From<u64> for Ttl {
    fn from(ms: u64) -> Self {
        Ttl::Millis(ms)
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::Millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<Option<u64>> for Ttl {
    fn from(ms: Option<u64>) -> Self {
        ms.map_or(Ttl::Forever, Ttl::Millis)
    }
}

impl From<&Value> for Ttl {
    fn from(value: &Value) -> Self {
        Ttl::from_value(value)
    }
}

impl From<Value> for Ttl {
    fn from(value: Value) -> Self {
        Ttl::from_value(&value)
    }
}

struct CacheEntry {
    pending: SharedResult,
    ttl: Ttl,
    generation: u64,
}

static GLOBAL: Lazy<Arc<CacheStore>> = Lazy::new(|| Arc::new(CacheStore::new()));

/// Keyed store of pending results with TTL eviction.
pub struct CacheStore {
    entries: Arc<DashMap<String, CacheEntry>>,
    generation: AtomicU64,
    scheduler: Arc<dyn Scheduler>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl CacheStore {
    /// Create a store whose timers run on the tokio runtime, falling back
    /// to a timer thread when created or used outside one.
    pub fn new() -> Self {
        Self::with_scheduler(Arc::new(TokioScheduler))
    }

    /// Create a store with a custom timer source.
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            scheduler,
        }
    }

    /// The process-wide store used by clients that were not given one.
    pub fn global() -> Arc<CacheStore> {
        GLOBAL.clone()
    }

    /// Look up the pending result stored under `key`.
    pub fn get(&self, key: &str) -> Option<SharedResult> {
        self.entries.get(key).map(|entry| entry.pending.clone())
    }

    /// TTL of the entry stored under `key`.
    pub fn ttl(&self, key: &str) -> Option<Ttl> {
        self.entries.get(key).map(|entry| entry.ttl)
    }

    /// Store `pending` under `key`, replacing any previous entry, and arm
    /// its eviction timer.
    pub fn put(&self, key: impl Into<String>, pending: SharedResult, ttl: Ttl) {
        let key = key.into();
        let generation = self.next_generation();
        self.entries.insert(
            key.clone(),
            CacheEntry {
                pending,
                ttl,
                generation,
            },
        );
        tracing::debug!(key = %key, ttl = ttl.as_millis(), "cache store");
        self.arm(key, ttl, generation);
    }

    /// Return the live entry for `key`, or store the result of `make`.
    ///
    /// The boolean is `true` on a hit. `make` runs only on a miss and
    /// while the key's shard is locked, so it should only build the future.
    /// Work that may touch this store belongs inside that future, which is
    /// first polled after the lock is released.
    pub fn get_or_insert_with<F>(&self, key: &str, ttl: Ttl, make: F) -> (SharedResult, bool)
    where
        F: FnOnce() -> SharedResult,
    {
        let (pending, generation) = match self.entries.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                tracing::debug!(key = %key, "cache hit");
                return (entry.get().pending.clone(), true);
            }
            Entry::Vacant(slot) => {
                tracing::debug!(key = %key, "cache miss");
                let pending = make();
                let generation = self.next_generation();
                slot.insert(CacheEntry {
                    pending: pending.clone(),
                    ttl,
                    generation,
                });
                (pending, generation)
            }
        };

        tracing::debug!(key = %key, ttl = ttl.as_millis(), "cache store");
        self.arm(key.to_string(), ttl, generation);
        (pending, false)
    }

    /// Remove every entry. Timers already armed fire as no-ops.
    pub fn clear_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::debug!(count, "cache cleared");
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn arm(&self, key: String, ttl: Ttl, generation: u64) {
        let Some(delay) = ttl.duration() else {
            return;
        };

        let entries: Weak<DashMap<String, CacheEntry>> = Arc::downgrade(&self.entries);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                let Some(entries) = entries.upgrade() else {
                    return;
                };
                // Only the entry this timer was armed for; a newer one under
                // the same key keeps its own timer.
                if entries
                    .remove_if(&key, |_, entry| entry.generation == generation)
                    .is_some()
                {
                    tracing::debug!(key = %key, "cache evict");
                }
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::timer::ManualScheduler;
    use crate::http::response::{Envelope, Payload};
    use futures::FutureExt;
    use http::{HeaderMap, StatusCode};
    use serde_json::json;

    fn ready(text: &str) -> SharedResult {
        let envelope = Envelope::new(
            StatusCode::OK,
            HeaderMap::new(),
            Payload::Text(text.to_string()),
        );
        futures::future::ready(Ok(envelope)).boxed().shared()
    }

    fn manual_store() -> (Arc<ManualScheduler>, CacheStore) {
        let scheduler = Arc::new(ManualScheduler::new());
        let store = CacheStore::with_scheduler(scheduler.clone());
        (scheduler, store)
    }

    #[test]
    fn test_ttl_from_value() {
        assert_eq!(Ttl::from_value(&json!(10)), Ttl::Millis(10));
        assert_eq!(Ttl::from_value(&json!("250")), Ttl::Millis(250));
        assert_eq!(Ttl::from_value(&json!(12.9)), Ttl::Millis(12));
        assert_eq!(Ttl::from_value(&json!(0)), Ttl::Millis(0));
        assert_eq!(Ttl::from_value(&json!(-1)), Ttl::Forever);
        assert_eq!(Ttl::from_value(&json!("soon")), Ttl::Forever);
        assert_eq!(Ttl::from_value(&json!(true)), Ttl::Forever);
        assert_eq!(Ttl::from_value(&Value::Null), Ttl::Forever);
    }

    #[test]
    fn test_ttl_conversions() {
        assert_eq!(Ttl::from(Duration::from_secs(2)), Ttl::Millis(2000));
        assert_eq!(Ttl::from(None::<u64>), Ttl::Forever);
        assert_eq!(Ttl::Forever.as_millis(), -1);
        assert_eq!(Ttl::Millis(5).as_millis(), 5);
        assert_eq!(Ttl::Forever.duration(), None);
    }

    #[test]
    fn test_put_and_get() {
        let (_, store) = manual_store();
        assert!(store.get("items").is_none());

        store.put("items", ready("a"), Ttl::Forever);
        assert!(store.contains("items"));
        assert_eq!(store.ttl("items"), Some(Ttl::Forever));

        let result = store.get("items").unwrap().now_or_never().unwrap().unwrap();
        assert_eq!(result.data, Payload::Text("a".into()));
    }

    #[test]
    fn test_eviction_after_ttl() {
        let (scheduler, store) = manual_store();
        store.put("items", ready("a"), Ttl::Millis(10));
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_millis(9));
        assert!(store.contains("items"));

        scheduler.advance(Duration::from_millis(1));
        assert!(!store.contains("items"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_ttl_honoured_without_runtime() {
        let store = CacheStore::new();
        store.put("items", ready("a"), Ttl::Millis(5));
        assert!(store.contains("items"));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while store.contains("items") && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!store.contains("items"));
    }

    #[test]
    fn test_zero_ttl_goes_through_scheduler() {
        let (scheduler, store) = manual_store();
        store.put("items", ready("a"), Ttl::Millis(0));
        assert!(store.contains("items"));

        scheduler.advance(Duration::ZERO);
        assert!(!store.contains("items"));
    }

    #[test]
    fn test_forever_arms_no_timer() {
        let (scheduler, store) = manual_store();
        store.put("items", ready("a"), Ttl::Forever);
        assert_eq!(scheduler.pending(), 0);

        scheduler.advance(Duration::from_secs(3600));
        assert!(store.contains("items"));
    }

    #[test]
    fn test_stale_timer_keeps_newer_entry() {
        let (scheduler, store) = manual_store();
        store.put("items", ready("old"), Ttl::Millis(10));
        store.clear_all();

        scheduler.advance(Duration::from_millis(5));
        store.put("items", ready("new"), Ttl::Millis(10));

        // First timer fires at 10ms and must not evict the newer entry.
        scheduler.advance(Duration::from_millis(5));
        assert!(store.contains("items"));

        scheduler.advance(Duration::from_millis(5));
        assert!(!store.contains("items"));
    }

    #[test]
    fn test_get_or_insert_with() {
        let (_, store) = manual_store();
        let mut calls = 0;

        let (_, hit) = store.get_or_insert_with("items", Ttl::Forever, || {
            calls += 1;
            ready("a")
        });
        assert!(!hit);

        let (pending, hit) = store.get_or_insert_with("items", Ttl::Forever, || {
            calls += 1;
            ready("b")
        });
        assert!(hit);
        assert_eq!(calls, 1);

        let result = pending.now_or_never().unwrap().unwrap();
        assert_eq!(result.data, Payload::Text("a".into()));
    }

    #[test]
    fn test_clear_all_then_timer_is_noop() {
        let (scheduler, store) = manual_store();
        store.put("a", ready("a"), Ttl::Millis(1));
        store.put("b", ready("b"), Ttl::Forever);
        assert_eq!(store.len(), 2);

        store.clear_all();
        assert!(store.is_empty());
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_timer_after_store_dropped() {
        let (scheduler, store) = manual_store();
        store.put("a", ready("a"), Ttl::Millis(1));
        drop(store);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 1);
    }

    #[test]
    fn test_global_is_shared() {
        let a = CacheStore::global();
        let b = CacheStore::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
