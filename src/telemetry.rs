//! Telemetry metric name constants.
//!
//! Centralised metric names for bokhylla operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `bokhylla_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — metadata provider name (e.g. "openlibrary", "googlebooks")
//! - `scope` — which cache is involved: "catalog" or "metadata"
//! - `status` — outcome: "ok" or "error"

/// Total provider queries dispatched by the resolver.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const PROVIDER_QUERIES_TOTAL: &str = "bokhylla_provider_queries_total";

/// Provider query duration in seconds.
///
/// Labels: `provider`.
pub const PROVIDER_QUERY_DURATION_SECONDS: &str = "bokhylla_provider_query_duration_seconds";

/// Total provider calls skipped because the provider was in cooldown.
///
/// Labels: `provider`.
pub const PROVIDER_SKIPS_TOTAL: &str = "bokhylla_provider_skips_total";

/// Total cooldown windows opened after a rate-limit signal.
///
/// Labels: `provider`.
pub const PROVIDER_COOLDOWNS_TOTAL: &str = "bokhylla_provider_cooldowns_total";

/// Total cache hits.
///
/// Labels: `scope` ("catalog" | "metadata").
pub const CACHE_HITS_TOTAL: &str = "bokhylla_cache_hits_total";

/// Total cache misses.
///
/// Labels: `scope` ("catalog" | "metadata").
pub const CACHE_MISSES_TOTAL: &str = "bokhylla_cache_misses_total";

/// Total requests that joined an already in-flight fetch instead of
/// starting their own.
pub const SINGLEFLIGHT_JOINS_TOTAL: &str = "bokhylla_singleflight_joins_total";

/// Total responses served from a stale or expired cache entry because the
/// live fetch failed.
///
/// Labels: `scope` ("catalog" | "metadata").
pub const STALE_SERVES_TOTAL: &str = "bokhylla_stale_serves_total";

/// Catalog source listing duration in seconds.
pub const SOURCE_LIST_DURATION_SECONDS: &str = "bokhylla_source_list_duration_seconds";
