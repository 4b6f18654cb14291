//! Catalog listing: source traits, the TTL + singleflight catalog cache,
//! and the archive.org source implementation.

mod archive;
mod cache;

pub use archive::ArchiveSource;
pub use cache::{CatalogCache, CatalogConfig};

use async_trait::async_trait;

use crate::Result;
use crate::types::Book;

/// The expensive "list all items" call against the remote source.
///
/// Implementations must paginate internally and return a flattened,
/// deduplicated list. Transient I/O failures are surfaced as errors; the
/// [`CatalogCache`] decides whether to absorb them with stale data.
#[async_trait]
pub trait SourceLister: Send + Sync {
    /// Source name for logging and cache provenance.
    fn name(&self) -> &str;

    /// List every item the source currently holds.
    async fn list_items(&self) -> Result<Vec<Book>>;
}

/// Resolves a direct access URL (download link, signed URL) for one item.
#[async_trait]
pub trait DetailResolver: Send + Sync {
    /// Resolve the access URL for an item identifier.
    ///
    /// `Ok(None)` means the item exists but no accessible file was found.
    async fn resolve_access_url(&self, identifier: &str) -> Result<Option<String>>;
}
