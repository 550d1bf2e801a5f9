//! Namespaced response cache with TTL staleness.
//!
//! Entries are stored as `{ "timestamp": <epoch-ms>, "payload": <json> }`
//! under `kinko.cache:<logical key>`. Caching is an optimization: every
//! storage or serialization failure is logged and swallowed.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::KvStore;

/// Key prefix for every cache entry.
pub const CACHE_NAMESPACE: &str = "kinko.cache:";

// ─── Clock ──────────────────────────────────────────────────────────

/// Millisecond wall clock, injectable for tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self { now: AtomicI64::new(start_ms) }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ─── Entries ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub timestamp: i64,
    pub payload: T,
}

/// A fresh cache read.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<T> {
    pub payload: T,
    pub age_ms: u64,
}

/// Inspection row for [`ResponseCache::entries`].
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEntryInfo {
    /// Logical key (namespace stripped).
    pub key: String,
    pub timestamp: i64,
    pub age_ms: u64,
    pub bytes: usize,
}

// ─── Cache ──────────────────────────────────────────────────────────

pub struct ResponseCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn full_key(key: &str) -> String {
        format!("{CACHE_NAMESPACE}{key}")
    }

    fn age_of(&self, timestamp: i64) -> u64 {
        (self.clock.now_ms() - timestamp).max(0) as u64
    }

    /// Payload and age if present and not older than `ttl_ms`.
    /// A `ttl_ms` of 0 disables expiry.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl_ms: u64) -> Option<CacheHit<T>> {
        let raw = match self.store.get(&Self::full_key(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "ignoring unreadable cache entry");
                return None;
            }
        };

        let age_ms = self.age_of(entry.timestamp);
        if ttl_ms > 0 && age_ms > ttl_ms {
            debug!(key, age_ms, ttl_ms, "cache entry stale");
            return None;
        }
        Some(CacheHit { payload: entry.payload, age_ms })
    }

    /// Overwrite `key`, stamped with the current time.
    pub fn set<T: Serialize>(&self, key: &str, payload: &T) {
        let entry = CacheEntry { timestamp: self.clock.now_ms(), payload };
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache payload not serializable");
                return;
            }
        };
        if let Err(e) = self.store.set(&Self::full_key(key), &raw) {
            warn!(key, error = %e, "cache write failed");
        }
    }

    pub fn clear(&self, key: &str) {
        if let Err(e) = self.store.remove(&Self::full_key(key)) {
            warn!(key, error = %e, "cache clear failed");
        }
    }

    /// Remove every entry whose logical key starts with `prefix`
    /// (`""` wipes the whole namespace). Returns the number removed.
    pub fn clear_all(&self, prefix: &str) -> usize {
        let keys = match self.store.keys_with_prefix(&Self::full_key(prefix)) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache listing failed");
                return 0;
            }
        };
        let mut removed = 0;
        for key in keys {
            match self.store.remove(&key) {
                Ok(()) => removed += 1,
                Err(e) => warn!(key = %key, error = %e, "cache clear failed"),
            }
        }
        removed
    }

    /// Every entry in the namespace, fresh or stale.
    pub fn entries(&self) -> Vec<CachedEntryInfo> {
        let keys = match self.store.keys_with_prefix(CACHE_NAMESPACE) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "cache listing failed");
                return Vec::new();
            }
        };

        keys.into_iter()
            .filter_map(|full| {
                let raw = self.store.get(&full).ok().flatten()?;
                let entry: CacheEntry<serde_json::Value> = serde_json::from_str(&raw).ok()?;
                Some(CachedEntryInfo {
                    key: full.trim_start_matches(CACHE_NAMESPACE).to_string(),
                    timestamp: entry.timestamp,
                    age_ms: self.age_of(entry.timestamp),
                    bytes: raw.len(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use kinko_common::error::{KinkoError, KinkoResult};

    /// Store whose every operation fails.
    pub(crate) struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, _key: &str) -> KinkoResult<Option<String>> {
            Err(KinkoError::Storage("disabled".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> KinkoResult<()> {
            Err(KinkoError::Storage("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> KinkoResult<()> {
            Err(KinkoError::Storage("disabled".into()))
        }
        fn keys_with_prefix(&self, _prefix: &str) -> KinkoResult<Vec<String>> {
            Err(KinkoError::Storage("disabled".into()))
        }
    }

    fn cache() -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let cache = ResponseCache::with_clock(Arc::new(MemoryStore::new()), clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_set_then_get_within_ttl() {
        let (cache, clock) = cache();
        cache.set("pulse:tokens:0xabc", &vec![1, 2, 3]);
        clock.advance(5_000);

        let hit: CacheHit<Vec<i32>> = cache.get("pulse:tokens:0xabc", 60_000).unwrap();
        assert_eq!(hit.payload, vec![1, 2, 3]);
        assert_eq!(hit.age_ms, 5_000);
    }

    #[test]
    fn test_get_after_ttl_is_none() {
        let (cache, clock) = cache();
        cache.set("k", &"v");
        clock.advance(60_001);
        assert!(cache.get::<String>("k", 60_000).is_none());
        // Exactly at the boundary is still fresh
        let (cache, clock) = self::cache();
        cache.set("k", &"v");
        clock.advance(60_000);
        assert!(cache.get::<String>("k", 60_000).is_some());
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let (cache, clock) = cache();
        cache.set("k", &42u32);
        clock.advance(365 * 24 * 3_600_000);
        assert_eq!(cache.get::<u32>("k", 0).unwrap().payload, 42);
    }

    #[test]
    fn test_failures_are_swallowed() {
        let cache = ResponseCache::new(Arc::new(BrokenStore));
        cache.set("k", &1u8);
        assert!(cache.get::<u8>("k", 1_000).is_none());
        cache.clear("k");
        assert_eq!(cache.clear_all(""), 0);
        assert!(cache.entries().is_empty());
    }

    #[test]
    fn test_wrong_shape_is_a_miss() {
        let (cache, _) = cache();
        cache.set("k", &"not a number");
        assert!(cache.get::<u64>("k", 0).is_none());
    }

    #[test]
    fn test_clear_and_entries() {
        let (cache, clock) = cache();
        cache.set("eth:tokens:0x1", &1u8);
        cache.set("pulse:tokens:0x1", &2u8);
        clock.advance(2_000);

        let entries = cache.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "eth:tokens:0x1");
        assert_eq!(entries[0].age_ms, 2_000);

        cache.clear("eth:tokens:0x1");
        assert!(cache.get::<u8>("eth:tokens:0x1", 0).is_none());

        assert_eq!(cache.clear_all("pulse:"), 1);
        assert!(cache.entries().is_empty());
    }
}
