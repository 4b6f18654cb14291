//! Provider chain resolution with per-item caching and partial-failure
//! tolerance.
//!
//! The resolver queries every enabled provider **concurrently** and merges
//! the partial results in priority order afterwards — the latency of a
//! resolution is the slowest provider, not the sum. Priority is
//! registration order (index 0 = highest), the same convention as a
//! fallback chain walked sequentially.
//!
//! # Failure handling
//!
//! Individual provider failures never abort a resolution:
//!
//! - rate-limit signals open a cooldown window via [`CooldownGuard`] and the
//!   provider is skipped entirely until it closes;
//! - timeouts, network errors, and malformed responses are logged and
//!   counted as "no data";
//! - a provider that returns zero results gets one bounded degraded retry
//!   (title-only query) before being counted as "no data".
//!
//! [`resolve`](ProviderChainResolver::resolve) is therefore infallible: the
//! floor is a record built from the item's own inline fields with source
//! `"default"`.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{Instant, timeout};
use tracing::{debug, instrument, warn};

use crate::cache::{Freshness, Singleflight, TtlConfig, TtlStore};
use crate::telemetry;
use crate::types::{Book, BookHint, MetadataRecord};

use super::cooldown::CooldownGuard;
use super::traits::MetadataProvider;

/// Configuration for the provider chain resolver.
///
/// ```rust
/// # use bokhylla::providers::ResolverConfig;
/// # use std::time::Duration;
/// let config = ResolverConfig::new()
///     .call_timeout(Duration::from_secs(8))
///     .batch_size(6);
/// ```
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// TTL windows for the per-item metadata cache. Default: 24 h fresh,
    /// 7 d stale.
    pub ttl: TtlConfig,
    /// Per-provider-call timeout so a hung upstream cannot stall a
    /// resolution. Default: 4 s.
    pub call_timeout: Duration,
    /// Cooldown window after a rate-limit signal. Default: 15 min.
    pub cooldown: Duration,
    /// Concurrent resolutions per batch in
    /// [`enrich_batch`](ProviderChainResolver::enrich_batch). Default: 4.
    pub batch_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ttl: TtlConfig::default(),
            call_timeout: Duration::from_secs(4),
            cooldown: Duration::from_secs(15 * 60),
            batch_size: 4,
        }
    }
}

impl ResolverConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metadata cache TTL windows.
    pub fn ttl(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the per-provider-call timeout.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the rate-limit cooldown window.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Set the batch concurrency (clamped to at least 1).
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}

/// A catalog entry together with its resolved metadata.
#[derive(Debug, Clone)]
pub struct EnrichedBook {
    pub book: Book,
    pub metadata: MetadataRecord,
    /// First provider that contributed data, or `"default"`.
    pub source: String,
    /// Whether the record came from the per-item cache.
    pub cached: bool,
    /// Whether the record is past its fresh window.
    pub stale: bool,
}

/// Resolves per-item metadata through an ordered set of providers.
///
/// Owns the per-item TTL cache, the in-flight registry, and the cooldown
/// guard — explicit instances, so independent resolvers never share state.
pub struct ProviderChainResolver {
    providers: Vec<Arc<dyn MetadataProvider>>,
    cache: TtlStore<MetadataRecord>,
    flights: Singleflight<MetadataRecord>,
    cooldown: CooldownGuard,
    config: ResolverConfig,
}

impl ProviderChainResolver {
    /// Create a resolver with no providers registered.
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            providers: Vec::new(),
            cache: TtlStore::new(config.ttl.clone()),
            flights: Singleflight::new(),
            cooldown: CooldownGuard::new(config.cooldown),
            config,
        }
    }

    /// Register a provider (appended to the end = lowest priority).
    ///
    /// Call in priority order: first registered = highest priority.
    pub fn add_provider(&mut self, provider: Arc<dyn MetadataProvider>) {
        self.providers.push(provider);
    }

    /// Whether any providers are registered.
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Registered provider names, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Resolve metadata for one item, bypassing the cache.
    ///
    /// Queries all enabled providers concurrently and merges by priority,
    /// starting from the item's own inline fields. Never fails — with no
    /// provider data the result is the default record with source
    /// `"default"`.
    #[instrument(skip(self, book), fields(book_id = %book.id))]
    pub async fn resolve(&self, book: &Book) -> MetadataRecord {
        let hint = book.hint();
        let now = Instant::now();

        let enabled: Vec<&Arc<dyn MetadataProvider>> = self
            .providers
            .iter()
            .filter(|p| {
                if self.cooldown.is_disabled(p.name(), now) {
                    metrics::counter!(telemetry::PROVIDER_SKIPS_TOTAL,
                        "provider" => p.name().to_owned())
                    .increment(1);
                    debug!(provider = p.name(), "skipping provider in cooldown");
                    false
                } else {
                    true
                }
            })
            .collect();

        let results = join_all(enabled.iter().map(|p| self.query_one(p.as_ref(), &hint))).await;

        let mut merged = MetadataRecord::default_for(book);
        let mut source: Option<&str> = None;
        for (provider, result) in enabled.iter().zip(results.iter()) {
            if let Some(record) = result {
                merged.fill_from(record);
                source.get_or_insert(provider.name());
            }
        }
        merged.source = source.unwrap_or(crate::types::DEFAULT_SOURCE).to_string();
        merged
    }

    /// Query one provider with timeout, rate-limit handling, and the
    /// bounded degraded retry. Failures become `None`.
    async fn query_one(
        &self,
        provider: &dyn MetadataProvider,
        hint: &BookHint,
    ) -> Option<MetadataRecord> {
        match self.query_once(provider, hint).await {
            Some(record) => Some(record),
            // The first call may have tripped the cooldown; retrying a
            // rate-limited provider is pointless.
            None if self.cooldown.is_disabled(provider.name(), Instant::now()) => None,
            // Zero results with a full query: one title-only retry.
            None if hint.author.is_some() => {
                debug!(
                    provider = provider.name(),
                    title = %hint.title,
                    "no results, retrying with title only"
                );
                self.query_once(provider, &hint.title_only()).await
            }
            None => None,
        }
    }

    async fn query_once(
        &self,
        provider: &dyn MetadataProvider,
        hint: &BookHint,
    ) -> Option<MetadataRecord> {
        let start = Instant::now();
        let outcome = timeout(self.config.call_timeout, provider.query(hint)).await;
        let elapsed = start.elapsed().as_secs_f64();
        metrics::histogram!(telemetry::PROVIDER_QUERY_DURATION_SECONDS,
            "provider" => provider.name().to_owned())
        .record(elapsed);

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                Self::record_query(provider.name(), false);
                warn!(
                    provider = provider.name(),
                    timeout_ms = self.config.call_timeout.as_millis() as u64,
                    "provider query timed out"
                );
                return None;
            }
        };

        match result {
            Ok(record) => {
                Self::record_query(provider.name(), true);
                record
            }
            Err(e) if e.is_rate_limited() => {
                Self::record_query(provider.name(), false);
                self.cooldown
                    .disable(provider.name(), Instant::now(), e.retry_after());
                None
            }
            Err(e) => {
                Self::record_query(provider.name(), false);
                warn!(provider = provider.name(), error = %e, "provider query failed");
                None
            }
        }
    }

    /// Resolve metadata for one item through the per-item cache.
    ///
    /// Fresh and stale cache entries are served directly (stale flagged);
    /// expired entries trigger a coalesced re-resolution, and remain
    /// available as a degraded fallback should that resolution be
    /// abandoned.
    #[instrument(skip(self, book), fields(book_id = %book.id))]
    pub async fn enrich(&self, book: &Book) -> EnrichedBook {
        let key = book.cache_key();
        let now = Instant::now();

        if let Some(entry) = self.cache.get(&key) {
            match self.cache.classify(&entry, now) {
                Freshness::Fresh => {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "scope" => "metadata")
                        .increment(1);
                    return Self::from_entry(book, entry.value, entry.source, false);
                }
                Freshness::Stale => {
                    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "scope" => "metadata")
                        .increment(1);
                    return Self::from_entry(book, entry.value, entry.source, true);
                }
                Freshness::Expired => {} // refetch, entry kept as last resort
            }
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "scope" => "metadata").increment(1);

        let resolved = self
            .flights
            .run(&key, || async {
                let record = self.resolve(book).await;
                self.cache.put(&key, record.clone(), record.source.clone());
                Ok(record)
            })
            .await;

        match resolved {
            Ok(record) => {
                let source = record.source.clone();
                EnrichedBook {
                    book: book.clone(),
                    metadata: record,
                    source,
                    cached: false,
                    stale: false,
                }
            }
            // Coalesced flight abandoned: degrade to whatever we have.
            Err(e) => {
                warn!(key, error = %e, "metadata resolution abandoned");
                if let Some(entry) = self.cache.get(&key) {
                    metrics::counter!(telemetry::STALE_SERVES_TOTAL, "scope" => "metadata")
                        .increment(1);
                    Self::from_entry(book, entry.value, entry.source, true)
                } else {
                    let record = MetadataRecord::default_for(book);
                    let source = record.source.clone();
                    EnrichedBook {
                        book: book.clone(),
                        metadata: record,
                        source,
                        cached: false,
                        stale: false,
                    }
                }
            }
        }
    }

    /// Enrich a page of items in fixed-size concurrency batches, bounding
    /// simultaneous outbound calls to third-party APIs. Order is preserved.
    pub async fn enrich_batch(&self, books: &[Book]) -> Vec<EnrichedBook> {
        let mut results = Vec::with_capacity(books.len());
        for chunk in books.chunks(self.config.batch_size.max(1)) {
            let batch = join_all(chunk.iter().map(|book| self.enrich(book))).await;
            results.extend(batch);
        }
        results
    }

    /// Drop all cached metadata.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn from_entry(book: &Book, metadata: MetadataRecord, source: String, stale: bool) -> EnrichedBook {
        EnrichedBook {
            book: book.clone(),
            metadata,
            source,
            cached: true,
            stale,
        }
    }

    fn record_query(provider: &str, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::PROVIDER_QUERIES_TOTAL,
            "provider" => provider.to_owned(),
            "status" => status,
        )
        .increment(1);
    }
}
