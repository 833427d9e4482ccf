use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::internal::models::CacheValue;

struct Entry {
    value: CacheValue,
    expires_at: Instant,
}

/// Process-wide bounded TTL+LRU store. Items, ID lists, and negative
/// markers share the one map, keyed `item:<id>` / `list:<feed>`.
///
/// The backing `LruCache` keeps the recency order; expiry is checked on
/// every hit and swept periodically by the janitor. Critical sections
/// are O(1) and do no I/O.
pub struct Cache {
    inner: Arc<Mutex<LruCache<String, Entry>>>,
}

impl Cache {
    pub fn new(max_entries: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(cap))),
        }
    }

    /// Look up a key. Expired entries are removed on the spot and read
    /// as absent; live hits are promoted to most-recently-used.
    pub fn get(&self, key: &str) -> Option<CacheValue> {
        let Ok(mut inner) = self.inner.lock() else {
            return None;
        };
        match inner.get(key) {
            None => return None,
            Some(entry) if Instant::now() < entry.expires_at => {
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }
        inner.pop(key);
        None
    }

    /// Insert or refresh a key with the given TTL. A zero TTL is a
    /// no-op. Writing an existing key overwrites value and expiry in
    /// place and promotes it. On overflow, expired entries at the LRU
    /// back go first; only then is a live entry evicted.
    pub fn set(&self, key: impl Into<String>, value: CacheValue, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let key = key.into();
        if let Ok(mut inner) = self.inner.lock() {
            let now = Instant::now();
            if inner.len() == usize::from(inner.cap()) && !inner.contains(&key) {
                loop {
                    let back_expired = match inner.peek_lru() {
                        Some((_, entry)) => now >= entry.expires_at,
                        None => false,
                    };
                    if !back_expired {
                        break;
                    }
                    inner.pop_lru();
                }
            }
            inner.put(
                key,
                Entry {
                    value,
                    expires_at: now + ttl,
                },
            );
        }
    }

    /// Remove every expired entry; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut inner) = self.inner.lock() else {
            return 0;
        };
        let now = Instant::now();
        let expired: Vec<String> = inner
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            inner.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the background sweeper. One task per cache; it holds the
    /// lock only for the sweep itself.
    pub fn start_janitor(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::trace!(removed, remaining = cache.len(), "janitor sweep");
                }
            }
        })
    }
}

impl Clone for Cache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
