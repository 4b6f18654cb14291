//! Bokhylla - Cached book catalog aggregation with metadata enrichment
//!
//! This crate aggregates a book catalog from a remote source listing and
//! enriches each entry with bibliographic metadata resolved through an
//! ordered chain of providers. The expensive operations — the full source
//! listing and per-item provider queries — sit behind TTL caches with
//! request coalescing, so repeated and concurrent access stays cheap and
//! upstream failures degrade to stale data instead of errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use bokhylla::Bokhylla;
//!
//! #[tokio::main]
//! async fn main() -> bokhylla::Result<()> {
//!     let library = Bokhylla::builder()
//!         .archive(r#"creator:"some collection""#)
//!         .open_library()
//!         .google_books(None)
//!         .build()?;
//!
//!     let books = library.get_all().await?;
//!     let page = library.enrich_page(&books[..books.len().min(20)]).await;
//!
//!     for item in page {
//!         println!("{} — {} [{}]", item.book.author, item.book.title, item.source);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod error;
pub mod library;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{BokhyllaError, Result};
pub use library::{Bokhylla, BokhyllaBuilder, BookDetail, Library};

pub use cache::{CacheEntry, Freshness, Singleflight, TtlConfig, TtlStore};
pub use catalog::{ArchiveSource, CatalogCache, CatalogConfig, DetailResolver, SourceLister};
pub use providers::{
    CooldownGuard, EnrichedBook, GoogleBooksProvider, MetadataProvider, OpenLibraryProvider,
    ProviderChainResolver, ResolverConfig,
};
pub use types::{Book, BookHint, MetadataRecord, ParsedTitle, parse_raw_title};
