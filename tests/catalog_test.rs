//! Integration tests for the catalog cache.
//!
//! Covers the fresh-hit short circuit, stale fallback on listing failure,
//! the empty-cache error path, invalidation, and the end-to-end lifecycle:
//! cold fetch, concurrent coalescing, TTL expiry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use bokhylla::catalog::{CatalogCache, CatalogConfig, SourceLister};
use bokhylla::types::Book;
use bokhylla::{BokhyllaError, Result, TtlConfig};

// ============================================================================
// Mock listers
// ============================================================================

/// Plays back a queue of scripted outcomes, repeating the last one, and
/// counts invocations.
struct ScriptedLister {
    outcomes: Mutex<VecDeque<Result<Vec<Book>>>>,
    last: Mutex<Option<Result<Vec<Book>>>>,
    calls: AtomicU32,
    delay: Option<Duration>,
}

impl ScriptedLister {
    fn new(outcomes: Vec<Result<Vec<Book>>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            delay: None,
        })
    }

    fn with_delay(outcomes: Vec<Result<Vec<Book>>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            delay: Some(delay),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceLister for ScriptedLister {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_items(&self) -> Result<Vec<Book>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.outcomes.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last.clone().expect("scripted lister exhausted with no outcomes"),
        }
    }
}

fn shelf(ids: &[&str]) -> Vec<Book> {
    ids.iter()
        .map(|id| Book::from_listing(*id, format!("Author - {id}")))
        .collect()
}

fn short_ttl() -> CatalogConfig {
    CatalogConfig::new().ttl(
        TtlConfig::new()
            .fresh_ttl(Duration::from_secs(5 * 60))
            .stale_ttl(Duration::from_secs(3600)),
    )
}

// ============================================================================
// Freshness and fallback
// ============================================================================

#[tokio::test(start_paused = true)]
async fn fresh_hit_skips_the_lister() {
    let lister = ScriptedLister::new(vec![Ok(shelf(&["a", "b"]))]);
    let cache = CatalogCache::new(lister.clone(), short_ttl());

    let first = cache.get_all().await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(lister.calls(), 1);

    // Within the fresh window: no second listing.
    tokio::time::advance(Duration::from_secs(60)).await;
    let second = cache.get_all().await.unwrap();
    assert_eq!(second, first);
    assert_eq!(lister.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn listing_failure_serves_the_stale_catalog() {
    let lister = ScriptedLister::new(vec![
        Ok(shelf(&["a", "b"])),
        Err(BokhyllaError::Http("upstream down".into())),
    ]);
    let cache = CatalogCache::new(lister.clone(), short_ttl());

    cache.get_all().await.unwrap();

    // Well past even the stale window; the failure fallback ignores age.
    tokio::time::advance(Duration::from_secs(24 * 3600)).await;
    let degraded = cache.get_all().await.unwrap();
    assert_eq!(degraded.len(), 2, "any-age fallback beats the error");
    assert_eq!(lister.calls(), 2);
}

#[tokio::test]
async fn empty_cache_surfaces_the_failure() {
    let lister = ScriptedLister::new(vec![Err(BokhyllaError::Http("upstream down".into()))]);
    let cache = CatalogCache::new(lister, CatalogConfig::default());

    let err = cache.get_all().await.unwrap_err();
    assert!(
        matches!(err, BokhyllaError::CacheExhausted(_)),
        "expected CacheExhausted, got {err:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn recovery_after_failure_replaces_the_stale_catalog() {
    let lister = ScriptedLister::new(vec![
        Ok(shelf(&["a"])),
        Err(BokhyllaError::Http("blip".into())),
        Ok(shelf(&["a", "b", "c"])),
    ]);
    let cache = CatalogCache::new(lister.clone(), short_ttl());

    cache.get_all().await.unwrap();
    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert_eq!(cache.get_all().await.unwrap().len(), 1, "stale fallback");

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert_eq!(cache.get_all().await.unwrap().len(), 3, "recovered listing");
    assert_eq!(lister.calls(), 3);
}

// ============================================================================
// Lookup and search
// ============================================================================

#[tokio::test]
async fn get_matches_current_and_legacy_ids() {
    let mut books = shelf(&["new-id"]);
    books[0].legacy_id = Some("old-id".into());

    let lister = ScriptedLister::new(vec![Ok(books)]);
    let cache = CatalogCache::new(lister, CatalogConfig::default());

    assert!(cache.get("new-id").await.unwrap().is_some());
    assert!(cache.get("old-id").await.unwrap().is_some());
    assert!(cache.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn search_filters_case_insensitively() {
    let lister = ScriptedLister::new(vec![Ok(vec![
        Book::from_listing("1", "Victor Hugo - Les Misérables"),
        Book::from_listing("2", "Colette - Le Blé en herbe"),
    ])]);
    let cache = CatalogCache::new(lister, CatalogConfig::default());

    let hits = cache.search("hugo").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "1");

    assert!(cache.search("zola").await.unwrap().is_empty());
}

#[tokio::test]
async fn invalidate_forces_a_fresh_listing() {
    let lister = ScriptedLister::new(vec![Ok(shelf(&["a"])), Ok(shelf(&["a", "b"]))]);
    let cache = CatalogCache::new(lister.clone(), CatalogConfig::default());

    assert_eq!(cache.get_all().await.unwrap().len(), 1);
    cache.invalidate();
    assert_eq!(cache.get_all().await.unwrap().len(), 2);
    assert_eq!(lister.calls(), 2);
}

// ============================================================================
// End-to-end lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn cold_fetch_coalesce_and_expiry() {
    let lister = ScriptedLister::with_delay(
        vec![Ok(shelf(&["a", "b"])), Ok(shelf(&["a", "b", "c"]))],
        Duration::from_millis(50),
    );
    let cache = Arc::new(CatalogCache::new(lister.clone(), short_ttl()));

    // Cold cache, ten concurrent callers: exactly one listing.
    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get_all().await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().len(), 2);
    }
    assert_eq!(lister.calls(), 1, "concurrent callers coalesced");

    // Still fresh: served from cache.
    cache.get_all().await.unwrap();
    assert_eq!(lister.calls(), 1);

    // Past the fresh window: exactly one new listing.
    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    let refreshed = cache.get_all().await.unwrap();
    assert_eq!(refreshed.len(), 3);
    assert_eq!(lister.calls(), 2);
}
