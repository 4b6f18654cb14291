//! Keyed TTL store with fresh/stale/expired classification.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use tokio::time::Instant;

/// Freshness of a cache entry relative to the store's TTL windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Age within the fresh window; serve without refetching.
    Fresh,
    /// Past the fresh window but within the stale window; usable, should
    /// be refreshed.
    Stale,
    /// Past the stale window. Treated as absent unless the caller
    /// explicitly asks for a degraded-mode fallback.
    Expired,
}

/// A cached value plus its provenance and fetch timestamp.
///
/// Owned exclusively by one store slot; replaced atomically on refresh,
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Provider that produced the value, or `"default"`.
    pub source: String,
    pub fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Entry age relative to `now`. Saturates to zero if `now` precedes
    /// `fetched_at`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

/// TTL windows for a [`TtlStore`].
///
/// ```rust
/// # use bokhylla::cache::TtlConfig;
/// # use std::time::Duration;
/// let config = TtlConfig::new()
///     .fresh_ttl(Duration::from_secs(24 * 3600))
///     .stale_ttl(Duration::from_secs(7 * 24 * 3600));
/// ```
#[derive(Debug, Clone)]
pub struct TtlConfig {
    /// Age up to which an entry is [`Freshness::Fresh`]. Default: 24 h.
    pub fresh_ttl: Duration,
    /// Age up to which an entry is [`Freshness::Stale`]. Default: 7 d.
    pub stale_ttl: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            fresh_ttl: Duration::from_secs(24 * 3600),
            stale_ttl: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

impl TtlConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fresh window.
    pub fn fresh_ttl(mut self, ttl: Duration) -> Self {
        self.fresh_ttl = ttl;
        self
    }

    /// Set the stale window.
    pub fn stale_ttl(mut self, ttl: Duration) -> Self {
        self.stale_ttl = ttl;
        self
    }
}

/// Thread-safe keyed store of TTL-classified entries.
///
/// `get` returns entries of *any* age — classification is separate, so
/// callers can serve stale data deliberately on upstream failure. There is
/// no capacity eviction beyond staleness: the key universe (catalog items)
/// is small and bounded.
pub struct TtlStore<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
    config: TtlConfig,
}

impl<T: Clone> TtlStore<T> {
    /// Create an empty store with the given TTL windows.
    pub fn new(config: TtlConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Look up an entry regardless of age.
    ///
    /// Never blocks on I/O and never triggers a fetch.
    pub fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Insert or replace an entry, stamping `fetched_at` with the current
    /// time. Replacement is atomic with respect to concurrent readers.
    pub fn put(&self, key: impl Into<String>, value: T, source: impl Into<String>) {
        let entry = CacheEntry {
            value,
            source: source.into(),
            fetched_at: Instant::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), entry);
    }

    /// Classify an entry against this store's TTL windows.
    pub fn classify(&self, entry: &CacheEntry<T>, now: Instant) -> Freshness {
        let age = entry.age(now);
        if age <= self.config.fresh_ttl {
            Freshness::Fresh
        } else if age <= self.config.stale_ttl {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Remove a single entry.
    pub fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of entries currently stored, of any freshness.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> Duration {
        Duration::from_secs(24 * 3600)
    }

    #[test]
    fn classification_boundaries() {
        let store: TtlStore<u32> = TtlStore::new(TtlConfig::new().fresh_ttl(day()).stale_ttl(7 * day()));
        let now = Instant::now();
        let entry = CacheEntry {
            value: 1,
            source: "test".into(),
            fetched_at: now,
        };

        let at = |offset: Duration| store.classify(&entry, now + offset);

        assert_eq!(at(day() - Duration::from_secs(60)), Freshness::Fresh);
        assert_eq!(at(day()), Freshness::Fresh); // boundary inclusive
        assert_eq!(at(day() + Duration::from_secs(60)), Freshness::Stale);
        assert_eq!(at(7 * day()), Freshness::Stale);
        assert_eq!(at(7 * day() + Duration::from_secs(3600)), Freshness::Expired);
    }

    #[test]
    fn get_returns_entries_of_any_age() {
        let store = TtlStore::new(TtlConfig::new().fresh_ttl(Duration::ZERO).stale_ttl(Duration::ZERO));
        store.put("k", 42u32, "test");
        // Immediately "expired" by config, but still retrievable.
        let entry = store.get("k").expect("entry present");
        assert_eq!(entry.value, 42);
        assert_eq!(entry.source, "test");
    }

    #[test]
    fn put_replaces_whole_entry() {
        let store = TtlStore::new(TtlConfig::default());
        store.put("k", 1u32, "a");
        let first = store.get("k").unwrap();
        store.put("k", 2u32, "b");
        let second = store.get("k").unwrap();

        assert_eq!(second.value, 2);
        assert_eq!(second.source, "b");
        // fetched_at is monotonically non-decreasing per key.
        assert!(second.fetched_at >= first.fetched_at);
    }

    #[test]
    fn remove_and_clear() {
        let store = TtlStore::new(TtlConfig::default());
        store.put("a", 1u32, "t");
        store.put("b", 2u32, "t");
        assert_eq!(store.len(), 2);

        store.remove("a");
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn age_saturates_before_fetch_time() {
        let now = Instant::now();
        let entry = CacheEntry {
            value: (),
            source: "t".into(),
            fetched_at: now + Duration::from_secs(10),
        };
        assert_eq!(entry.age(now), Duration::ZERO);
    }
}
