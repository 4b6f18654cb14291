//! The provider capability trait.

use async_trait::async_trait;

use crate::Result;
use crate::types::{BookHint, MetadataRecord};

/// A third-party metadata source, polymorphic over one capability: `query`.
///
/// Implementations must surface an explicit upstream rate-limit signal as
/// [`BokhyllaError::RateLimited`](crate::BokhyllaError::RateLimited) —
/// distinguishable from generic failure — so the resolver can open a
/// cooldown window instead of hammering the provider. Returning `Ok(None)`
/// means the provider was reached but has nothing usable for this hint.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Provider name for logging, metrics, and source attribution.
    fn name(&self) -> &str;

    /// Query metadata for one item hint.
    ///
    /// A hint without an author is the degraded (title-only) form; the
    /// resolver issues it once when the full query returns no results.
    async fn query(&self, hint: &BookHint) -> Result<Option<MetadataRecord>>;
}
