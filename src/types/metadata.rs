//! Partial metadata records and the priority merge policy.

use serde::{Deserialize, Serialize};

use super::{Book, DEFAULT_SOURCE};

/// Phrases that mark a text as an author biography rather than a work
/// synopsis. A candidate description containing at least two *distinct*
/// markers is rejected by the merge gate when a description already exists.
const BIO_MARKERS: &[&str] = &[
    "born in",
    "born on",
    "was born",
    "grew up in",
    "studied at",
    "graduated from",
    "best known for",
    "his career",
    "her career",
    "died in",
    "died on",
    "né en",
    "né le",
    "née en",
    "née le",
    "a étudié",
    "a grandi",
    "est un écrivain",
    "est une écrivaine",
    "mort en",
    "mort le",
    "son œuvre",
];

/// A partial metadata record for one catalog entry.
///
/// Monoid-like: any field may be absent, and merging two records never
/// discards a present field in favor of an absent one. `source` names the
/// first provider that contributed *any* field, not per-field provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// First provider that contributed any field, or `"default"`.
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

impl MetadataRecord {
    /// Record built from an entry's own inline fields. The starting point
    /// of every merge.
    pub fn default_for(book: &Book) -> Self {
        Self {
            cover_url: book.cover_url.clone(),
            language: book.language.clone(),
            source: DEFAULT_SOURCE.to_string(),
            ..Self::default()
        }
    }

    /// Fill absent fields from a lower-priority record.
    ///
    /// Present fields are never overwritten, with one exception: a candidate
    /// `description` may replace an existing one unless the candidate reads
    /// like an author biography (see [`looks_like_author_bio`]). When no
    /// description exists yet, any candidate is accepted — better than
    /// nothing. `source` is not touched; attribution is the resolver's job.
    pub fn fill_from(&mut self, other: &MetadataRecord) {
        fill(&mut self.cover_url, &other.cover_url);
        fill(&mut self.year, &other.year);
        fill(&mut self.pages, &other.pages);
        fill(&mut self.rating, &other.rating);
        fill(&mut self.ratings_count, &other.ratings_count);
        fill(&mut self.publisher, &other.publisher);
        fill(&mut self.category, &other.category);
        fill(&mut self.language, &other.language);

        if let Some(candidate) = &other.description {
            let accept = match &self.description {
                None => true,
                Some(existing) if existing.is_empty() => true,
                Some(_) => !looks_like_author_bio(candidate),
            };
            if accept {
                self.description = Some(candidate.clone());
            }
        }
    }

    /// Whether any field beyond `source` carries a value.
    pub fn has_data(&self) -> bool {
        self.cover_url.is_some()
            || self.year.is_some()
            || self.pages.is_some()
            || self.description.is_some()
            || self.rating.is_some()
            || self.ratings_count.is_some()
            || self.publisher.is_some()
            || self.category.is_some()
            || self.language.is_some()
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, candidate: &Option<T>) {
    if slot.is_none()
        && let Some(value) = candidate
    {
        *slot = Some(value.clone());
    }
}

/// Heuristic: does this text describe the author's life rather than the
/// work? Counts distinct biography-marker phrases; two or more distinct
/// markers classify the text as a biography.
pub(crate) fn looks_like_author_bio(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BIO_MARKERS
        .iter()
        .filter(|marker| lowered.contains(*marker))
        .count()
        >= 2
}
