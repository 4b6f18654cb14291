//! Caching subsystem.
//!
//! Two cooperating pieces:
//!
//! - [`TtlStore`] — keyed store of [`CacheEntry`] values with three-state
//!   freshness classification (fresh / stale / expired). `get` never blocks
//!   and never fetches; fetching is the caller's responsibility, composed
//!   with the coalescer below.
//!
//! - [`Singleflight`] — at most one in-flight fetch per cache key.
//!   Concurrent callers for the same key await the leader's result instead
//!   of issuing duplicate upstream calls.
//!
//! The catalog cache ([`crate::catalog::CatalogCache`]) composes both around
//! the expensive "list all items" call; the resolver
//! ([`crate::providers::ProviderChainResolver`]) composes them per item.

mod singleflight;
mod store;

pub use singleflight::Singleflight;
pub use store::{CacheEntry, Freshness, TtlConfig, TtlStore};
