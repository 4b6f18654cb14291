//! The library facade: one handle over the catalog cache, the metadata
//! resolver, and the optional detail resolver.

mod builder;

pub use builder::{Bokhylla, BokhyllaBuilder};

use std::sync::Arc;

use tracing::instrument;

use crate::Result;
use crate::catalog::{CatalogCache, DetailResolver};
use crate::providers::{EnrichedBook, ProviderChainResolver};
use crate::types::Book;

/// A book with its resolved metadata and, when available, a direct
/// access URL.
#[derive(Debug, Clone)]
pub struct BookDetail {
    pub enriched: EnrichedBook,
    /// Direct download/access URL, when the source exposes one.
    pub access_url: Option<String>,
}

/// The assembled library: catalog listing, per-item metadata enrichment,
/// and item access resolution behind one handle.
///
/// Construct via [`Bokhylla::builder`]. Cheap to share: wrap in an `Arc`
/// and clone the handle across tasks.
pub struct Library {
    catalog: CatalogCache,
    resolver: ProviderChainResolver,
    details: Option<Arc<dyn DetailResolver>>,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").finish_non_exhaustive()
    }
}

impl Library {
    pub(crate) fn new(
        catalog: CatalogCache,
        resolver: ProviderChainResolver,
        details: Option<Arc<dyn DetailResolver>>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            details,
        }
    }

    /// The full catalog, cached or freshly listed.
    pub async fn get_all(&self) -> Result<Vec<Book>> {
        self.catalog.get_all().await
    }

    /// Filter the catalog by a case-insensitive title/author substring.
    pub async fn search(&self, query: &str) -> Result<Vec<Book>> {
        self.catalog.search(query).await
    }

    /// Look up one item by identifier (current or legacy scheme).
    pub async fn get(&self, identifier: &str) -> Result<Option<Book>> {
        self.catalog.get(identifier).await
    }

    /// Resolve metadata for one item through the provider chain.
    pub async fn enrich(&self, book: &Book) -> EnrichedBook {
        self.resolver.enrich(book).await
    }

    /// Enrich a page of items with bounded concurrency, preserving order.
    pub async fn enrich_page(&self, books: &[Book]) -> Vec<EnrichedBook> {
        self.resolver.enrich_batch(books).await
    }

    /// Full detail view for one item: enriched metadata plus the access
    /// URL when a detail resolver is configured.
    ///
    /// `Ok(None)` when the identifier matches nothing in the catalog.
    #[instrument(skip(self))]
    pub async fn book_detail(&self, identifier: &str) -> Result<Option<BookDetail>> {
        let Some(book) = self.catalog.get(identifier).await? else {
            return Ok(None);
        };

        let enriched = self.resolver.enrich(&book).await;
        let access_url = match &self.details {
            Some(resolver) => resolver.resolve_access_url(&book.id).await?,
            None => None,
        };

        Ok(Some(BookDetail {
            enriched,
            access_url,
        }))
    }

    /// Drop the cached catalog listing and all cached metadata.
    pub fn invalidate(&self) {
        self.catalog.invalidate();
        self.resolver.clear_cache();
    }

    /// Name of the configured catalog source.
    pub fn source_name(&self) -> &str {
        self.catalog.source_name()
    }

    /// Registered metadata provider names, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.resolver.provider_names()
    }
}
