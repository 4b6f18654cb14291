//! Builder for assembling [`Library`] instances.

use std::sync::Arc;

use crate::catalog::{ArchiveSource, CatalogCache, CatalogConfig, DetailResolver, SourceLister};
use crate::providers::{
    GoogleBooksProvider, MetadataProvider, OpenLibraryProvider, ProviderChainResolver,
    ResolverConfig,
};
use crate::{BokhyllaError, Result};

use super::Library;

/// Main entry point for assembling a library.
pub struct Bokhylla;

impl Bokhylla {
    /// Create a new builder for configuring a library.
    pub fn builder() -> BokhyllaBuilder {
        BokhyllaBuilder::new()
    }
}

/// Builder for configuring a [`Library`].
///
/// A catalog source is mandatory; metadata providers and a detail resolver
/// are optional. Providers are consulted in registration order, first
/// registered wins on merge conflicts.
pub struct BokhyllaBuilder {
    lister: Option<Arc<dyn SourceLister>>,
    details: Option<Arc<dyn DetailResolver>>,
    providers: Vec<Arc<dyn MetadataProvider>>,
    catalog_config: CatalogConfig,
    resolver_config: ResolverConfig,
}

impl BokhyllaBuilder {
    pub fn new() -> Self {
        Self {
            lister: None,
            details: None,
            providers: Vec::new(),
            catalog_config: CatalogConfig::default(),
            resolver_config: ResolverConfig::default(),
        }
    }

    /// Set the catalog source.
    pub fn source(mut self, lister: Arc<dyn SourceLister>) -> Self {
        self.lister = Some(lister);
        self
    }

    /// Set the detail resolver for direct access URLs.
    pub fn detail_resolver(mut self, resolver: Arc<dyn DetailResolver>) -> Self {
        self.details = Some(resolver);
        self
    }

    /// Register a metadata provider (appended = lowest priority so far).
    pub fn provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Use an archive.org collection as both catalog source and detail
    /// resolver.
    pub fn archive(self, collection_query: impl Into<String>) -> Self {
        let source = Arc::new(ArchiveSource::new(collection_query));
        self.source(source.clone()).detail_resolver(source)
    }

    /// Register the OpenLibrary metadata provider.
    pub fn open_library(self) -> Self {
        self.provider(Arc::new(OpenLibraryProvider::new()))
    }

    /// Register the Google Books metadata provider.
    pub fn google_books(self, api_key: Option<String>) -> Self {
        self.provider(Arc::new(GoogleBooksProvider::new(api_key)))
    }

    /// Override the catalog cache configuration.
    pub fn catalog_config(mut self, config: CatalogConfig) -> Self {
        self.catalog_config = config;
        self
    }

    /// Override the metadata resolver configuration.
    pub fn resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
    }

    /// Assemble the library.
    ///
    /// Fails with [`BokhyllaError::Configuration`] when no catalog source
    /// was set. A library without metadata providers is valid: enrichment
    /// then only reflects the listing's inline fields.
    pub fn build(self) -> Result<Library> {
        let lister = self.lister.ok_or_else(|| {
            BokhyllaError::Configuration("no catalog source configured".to_string())
        })?;

        let catalog = CatalogCache::new(lister, self.catalog_config);
        let mut resolver = ProviderChainResolver::new(self.resolver_config);
        for provider in self.providers {
            resolver.add_provider(provider);
        }

        Ok(Library::new(catalog, resolver, self.details))
    }
}

impl Default for BokhyllaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
