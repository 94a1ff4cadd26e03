//! Cache storage.
//!
//! Bodies are kept as the exact bytes upstream returned so that a hit is byte-identical
//! to the fetch that populated it. Expiry uses `tokio::time::Instant` so paused-clock
//! tests can step through TTL windows.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

#[derive(Clone)]
struct Entry {
    body: Bytes,
    expires_at: Instant,
}

/// TTL + LRU bounded store for upstream response bodies.
pub struct ResponseStore {
    config: CacheConfig,
    entries: Mutex<LruCache<CacheKey, Entry>>,
}

impl ResponseStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            entries: Mutex::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    /// Return the live body for `key`; expired entries are dropped and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        if !self.config.enabled {
            return None;
        }

        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                counter!("spaceproxy_cache_hit_total").increment(1);
                Some(entry.body.clone())
            }
            Some(_) => {
                entries.pop(key);
                counter!("spaceproxy_cache_expired_total").increment(1);
                counter!("spaceproxy_cache_miss_total").increment(1);
                debug!(target = "spaceproxy::cache", key = %key, "entry expired");
                None
            }
            None => {
                counter!("spaceproxy_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Store `body` under `key`, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, body: Bytes, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }

        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let entry = Entry {
            body,
            expires_at: Instant::now() + ttl,
        };

        let mut entries = mutex_lock(&self.entries, SOURCE, "insert");
        let displaced = entries.push(key.clone(), entry);
        if let Some((evicted, _)) = displaced.filter(|(evicted, _)| *evicted != key) {
            counter!("spaceproxy_cache_evict_total").increment(1);
            debug!(
                target = "spaceproxy::cache",
                key = %evicted,
                "evicted least recently used entry"
            );
        }
    }

    /// Number of stored entries, expired ones included until they are next touched.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::compose("test", &[name])
    }

    #[tokio::test(start_paused = true)]
    async fn serves_identical_bytes_until_expiry() {
        let store = ResponseStore::new(&CacheConfig::default());
        let body = Bytes::from_static(br#"{"near_earth_objects":{}}"#);

        store.insert(key("a"), body.clone(), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get(&key("a")), Some(body));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get(&key("a")), None);
        assert!(store.is_empty(), "expired entry is dropped on access");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ttl_uses_default() {
        let config = CacheConfig {
            default_ttl: Duration::from_secs(5),
            ..Default::default()
        };
        let store = ResponseStore::new(&config);
        store.insert(key("a"), Bytes::from_static(b"1"), None);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get(&key("a")).is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get(&key("a")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_replaces_body_and_expiry() {
        let store = ResponseStore::new(&CacheConfig::default());
        store.insert(key("a"), Bytes::from_static(b"old"), Some(Duration::from_secs(2)));
        tokio::time::advance(Duration::from_secs(1)).await;
        store.insert(key("a"), Bytes::from_static(b"new"), Some(Duration::from_secs(2)));
        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(store.get(&key("a")), Some(Bytes::from_static(b"new")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lru_eviction_respects_capacity() {
        let config = CacheConfig {
            max_entries: 2,
            ..Default::default()
        };
        let store = ResponseStore::new(&config);

        store.insert(key("1"), Bytes::from_static(b"1"), None);
        store.insert(key("2"), Bytes::from_static(b"2"), None);
        assert!(store.get(&key("1")).is_some());

        store.insert(key("3"), Bytes::from_static(b"3"), None);

        assert!(store.get(&key("1")).is_some());
        assert!(store.get(&key("2")).is_none(), "least recently used is evicted");
        assert!(store.get(&key("3")).is_some());
    }

    #[test]
    fn disabled_store_never_hits() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let store = ResponseStore::new(&config);
        store.insert(key("a"), Bytes::from_static(b"1"), None);
        assert!(store.get(&key("a")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = ResponseStore::new(&CacheConfig::default());

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.lock().expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        store.insert(key("a"), Bytes::from_static(b"1"), None);
        assert!(store.get(&key("a")).is_some());
    }
}
