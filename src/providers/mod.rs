//! Metadata providers and the fallback-resolution engine.
//!
//! Providers implement one capability trait ([`MetadataProvider::query`])
//! and are registered with the [`ProviderChainResolver`] in priority order
//! (first registered = highest priority). The resolver queries all enabled
//! providers concurrently, merges partial results by priority, tolerates
//! individual provider failure, and trips the per-provider
//! [`CooldownGuard`] on explicit rate-limit signals.
//!
//! Two HTTP providers ship with the crate: [`OpenLibraryProvider`] and
//! [`GoogleBooksProvider`]. Custom providers only need the trait.

mod cooldown;
mod google_books;
mod open_library;
mod resolver;
mod traits;

pub use cooldown::CooldownGuard;
pub use google_books::GoogleBooksProvider;
pub use open_library::OpenLibraryProvider;
pub use resolver::{EnrichedBook, ProviderChainResolver, ResolverConfig};
pub use traits::MetadataProvider;
