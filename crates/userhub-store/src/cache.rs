//! Generic in-memory cache with per-entry TTL.
//!
//! Expiry on [`TtlCache::get`] is the correctness guarantee; a background
//! sweep bounds memory growth and is best-effort only. The cache is
//! advisory: it never returns errors and every caller must fall back to the
//! source of truth on a miss.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// TTL applied to every entry on `set`.
    pub default_ttl: Duration,
    /// How often the background sweep removes expired entries.
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(10 * 60),
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value cache with absolute per-entry expiry.
///
/// Reads take a shared lock, writes an exclusive one. Must be constructed
/// inside a tokio runtime (the sweep task is spawned at construction).
/// Calling `get`/`set` after [`TtlCache::close`] is undefined behavior in
/// the contract sense: entries are still served but no longer swept.
pub struct TtlCache<V> {
    config: CacheConfig,
    entries: Arc<RwLock<HashMap<String, Entry<V>>>>,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let entries: Arc<RwLock<HashMap<String, Entry<V>>>> = Arc::new(RwLock::new(HashMap::new()));
        let cancel = CancellationToken::new();

        let sweep_entries = Arc::clone(&entries);
        let sweep_cancel = cancel.clone();
        let interval = config.cleanup_interval;
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        let mut map = sweep_entries.write().expect("cache lock poisoned");
                        map.retain(|_, entry| entry.expires_at > now);
                    }
                    _ = sweep_cancel.cancelled() => return,
                }
            }
        });

        Self {
            config,
            entries,
            cancel,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Stores `value` under `key` with expiry `now + default_ttl`,
    /// overwriting any existing entry.
    pub fn set(&self, key: &str, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.config.default_ttl,
        };
        let mut map = self.entries.write().expect("cache lock poisoned");
        map.insert(key.to_string(), entry);
    }

    /// Returns the cached value, or `None` if absent or expired.
    /// Expired entries are removed opportunistically.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let map = self.entries.read().expect("cache lock poisoned");
            match map.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Entry existed but was expired: evict under the write lock,
        // re-checking in case a concurrent `set` replaced it.
        let mut map = self.entries.write().expect("cache lock poisoned");
        if let Some(entry) = map.get(key) {
            if entry.expires_at > now {
                return Some(entry.value.clone());
            }
            map.remove(key);
        }
        None
    }

    /// Removes the entry unconditionally.
    pub fn delete(&self, key: &str) {
        let mut map = self.entries.write().expect("cache lock poisoned");
        map.remove(key);
    }

    /// Stops the background sweep and waits for it to exit.
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = self.sweeper.lock().expect("cache lock poisoned").take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "cache sweeper task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl_ms: u64) -> CacheConfig {
        CacheConfig {
            default_ttl: Duration::from_millis(ttl_ms),
            cleanup_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = TtlCache::new(CacheConfig::default());
        cache.set("k", 42u64);
        assert_eq!(cache.get("k"), Some(42));
        cache.close().await;
    }

    #[tokio::test]
    async fn test_get_absent() {
        let cache: TtlCache<u64> = TtlCache::new(CacheConfig::default());
        assert_eq!(cache.get("missing"), None);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = TtlCache::new(config(20));
        cache.set("k", "v".to_string());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k"), None);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_overwrite_resets_expiry() {
        let cache = TtlCache::new(config(60));
        cache.set("k", 1u64);
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.set("k", 2u64);
        tokio::time::sleep(Duration::from_millis(40)).await;
        // The second set pushed expiry past the first deadline.
        assert_eq!(cache.get("k"), Some(2));
        cache.close().await;
    }

    #[tokio::test]
    async fn test_delete_removes_immediately() {
        let cache = TtlCache::new(CacheConfig::default());
        cache.set("k", 7u64);
        cache.delete("k");
        assert_eq!(cache.get("k"), None);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_background_sweep_evicts() {
        let cache = TtlCache::new(config(20));
        cache.set("k", 1u64);
        tokio::time::sleep(Duration::from_millis(80)).await;
        // Inspect the map directly; the sweeper should have removed the
        // entry without any `get` triggering lazy eviction.
        let len = cache.entries.read().unwrap().len();
        assert_eq!(len, 0);
        cache.close().await;
    }

    #[tokio::test]
    async fn test_close_stops_sweeper() {
        let cache: TtlCache<u64> = TtlCache::new(config(1000));
        cache.close().await;
        assert!(cache.sweeper.lock().unwrap().is_none());
    }
}
