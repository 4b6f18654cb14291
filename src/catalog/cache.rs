//! The catalog cache: TTL cell + singleflight around the source listing.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{instrument, warn};

use crate::cache::{Freshness, Singleflight, TtlConfig, TtlStore};
use crate::telemetry;
use crate::types::Book;
use crate::{BokhyllaError, Result};

use super::SourceLister;

/// Fixed sentinel key for the single cached listing.
const CATALOG_KEY: &str = "catalog";

/// Configuration for the catalog cache.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// TTL windows for the listing. Default: 5 min fresh, 1 h stale.
    /// Fallback on fetch failure ignores these and serves any age.
    pub ttl: TtlConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl: TtlConfig::new()
                .fresh_ttl(Duration::from_secs(5 * 60))
                .stale_ttl(Duration::from_secs(3600)),
        }
    }
}

impl CatalogConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listing TTL windows.
    pub fn ttl(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Time-bounded, deduplicated cache of the "list all items" call — the
/// most expensive operation in the system.
///
/// A fresh entry is served directly. Anything older triggers one coalesced
/// refetch; concurrent callers join it instead of issuing their own. When
/// the refetch fails the catalog degrades to last-known-good of *any* age,
/// and only an empty cache lets the failure surface.
pub struct CatalogCache {
    lister: Arc<dyn SourceLister>,
    cell: TtlStore<Vec<Book>>,
    flights: Singleflight<Vec<Book>>,
}

impl CatalogCache {
    /// Create a catalog cache over a source lister.
    pub fn new(lister: Arc<dyn SourceLister>, config: CatalogConfig) -> Self {
        Self {
            lister,
            cell: TtlStore::new(config.ttl),
            flights: Singleflight::new(),
        }
    }

    /// Get the full item list, cached or freshly fetched.
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Book>> {
        let now = Instant::now();
        if let Some(entry) = self.cell.get(CATALOG_KEY)
            && self.cell.classify(&entry, now) == Freshness::Fresh
        {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "scope" => "catalog").increment(1);
            return Ok(entry.value);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "scope" => "catalog").increment(1);

        let fetched = self
            .flights
            .run(CATALOG_KEY, || async {
                let start = Instant::now();
                let result = self.lister.list_items().await;
                metrics::histogram!(telemetry::SOURCE_LIST_DURATION_SECONDS)
                    .record(start.elapsed().as_secs_f64());
                let items = result?;
                self.cell.put(CATALOG_KEY, items.clone(), self.lister.name());
                Ok(items)
            })
            .await;

        match fetched {
            Ok(items) => Ok(items),
            Err(e) => {
                // Degrade to last-known-good of any age before failing.
                if let Some(entry) = self.cell.get(CATALOG_KEY) {
                    metrics::counter!(telemetry::STALE_SERVES_TOTAL, "scope" => "catalog")
                        .increment(1);
                    warn!(
                        source = self.lister.name(),
                        age_secs = entry.age(Instant::now()).as_secs(),
                        error = %e,
                        "source listing failed, serving stale catalog"
                    );
                    Ok(entry.value)
                } else {
                    Err(BokhyllaError::CacheExhausted(Arc::new(e)))
                }
            }
        }
    }

    /// Look up one item by identifier (current or legacy scheme).
    pub async fn get(&self, identifier: &str) -> Result<Option<Book>> {
        let items = self.get_all().await?;
        Ok(items.into_iter().find(|b| b.matches_id(identifier)))
    }

    /// Filter items by a case-insensitive title/author substring.
    pub async fn search(&self, query: &str) -> Result<Vec<Book>> {
        let items = self.get_all().await?;
        Ok(items.into_iter().filter(|b| b.matches_query(query)).collect())
    }

    /// Clear the cached listing; the next [`get_all`](Self::get_all)
    /// performs a fresh fetch.
    pub fn invalidate(&self) {
        self.cell.remove(CATALOG_KEY);
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &str {
        self.lister.name()
    }
}
