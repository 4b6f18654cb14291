//! Core data types: catalog entries, provider hints, metadata records.

mod book;
mod metadata;

pub use book::{Book, BookHint, ParsedTitle, parse_raw_title};
pub use metadata::MetadataRecord;

pub(crate) use metadata::looks_like_author_bio;

/// Source attribution used when no provider contributed any data.
pub const DEFAULT_SOURCE: &str = "default";
