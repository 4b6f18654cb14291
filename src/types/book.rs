//! Catalog entry type and the raw-title parser.

use serde::{Deserialize, Serialize};

/// Author used when the raw listing title yields no author segment.
const UNKNOWN_AUTHOR: &str = "Unknown";

/// A single catalog entry.
///
/// Identity is `id`, immutable once constructed from the source listing.
/// `raw_title` is the unparsed original; `title` and `author` are derived
/// from it by [`parse_raw_title`], which is deterministic so the same
/// listing always produces the same entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Stable identifier from the source listing.
    pub id: String,
    /// Older identifier scheme kept for backward-compatible lookups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_id: Option<String>,
    /// Parsed work title.
    pub title: String,
    /// Parsed author name, or `"Unknown"`.
    pub author: String,
    /// The unparsed original listing title.
    pub raw_title: String,
    /// Cover image URL supplied inline by the source listing, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    /// Language supplied inline by the source listing, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Book {
    /// Construct an entry from a source listing row, deriving title and
    /// author from the raw title.
    pub fn from_listing(id: impl Into<String>, raw_title: impl Into<String>) -> Self {
        let raw_title = raw_title.into();
        let parsed = parse_raw_title(&raw_title);
        Self {
            id: id.into(),
            legacy_id: None,
            title: parsed.title,
            author: parsed.author,
            raw_title,
            cover_url: None,
            language: None,
        }
    }

    /// Cache key for metadata lookups: normalized `"{author}|{title}"`.
    ///
    /// Stable across requests for the same logical item.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.author, self.title).trim().to_lowercase()
    }

    /// The query hint handed to metadata providers.
    ///
    /// An `"Unknown"` author is withheld — it would only pollute provider
    /// search results.
    pub fn hint(&self) -> BookHint {
        let author = if self.author == UNKNOWN_AUTHOR {
            None
        } else {
            Some(self.author.clone())
        };
        BookHint {
            title: self.title.clone(),
            author,
        }
    }

    /// Whether the entry matches an identifier (current or legacy scheme).
    pub fn matches_id(&self, identifier: &str) -> bool {
        self.id == identifier || self.legacy_id.as_deref() == Some(identifier)
    }

    /// Case-insensitive substring match on title or author.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.title.to_lowercase().contains(&q) || self.author.to_lowercase().contains(&q)
    }
}

/// The search terms a metadata provider receives.
///
/// The degraded retry drops the author, so `author` is optional from the
/// start rather than a separate "title-only" type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookHint {
    pub title: String,
    pub author: Option<String>,
}

impl BookHint {
    /// The degraded form of this hint: title only.
    pub fn title_only(&self) -> BookHint {
        BookHint {
            title: self.title.clone(),
            author: None,
        }
    }
}

/// Author and title split out of a raw listing title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    pub author: String,
    pub title: String,
}

/// Parse the listing title format `"Author - Title --- (signature)"`.
///
/// The signature segment after `---` is discarded. Falls back to the plain
/// `"Author - Title"` shape, and finally to treating the whole string as a
/// title with an unknown author. The author segment is the text before the
/// *first* ` - ` separator, so hyphenated titles survive.
pub fn parse_raw_title(raw: &str) -> ParsedTitle {
    // Strip the trailing "--- (signature)" segment if present.
    let head = match raw.find("---") {
        Some(idx) => raw[..idx].trim(),
        None => raw.trim(),
    };

    match head.split_once(" - ") {
        Some((author, title)) if !author.trim().is_empty() && !title.trim().is_empty() => {
            ParsedTitle {
                author: author.trim().to_string(),
                title: title.trim().to_string(),
            }
        }
        _ => ParsedTitle {
            author: UNKNOWN_AUTHOR.to_string(),
            title: head.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_signature_format() {
        let parsed = parse_raw_title("A.J.Cronin - Le jardinier espagnol --- (Ny Aiko Boky)");
        assert_eq!(parsed.author, "A.J.Cronin");
        assert_eq!(parsed.title, "Le jardinier espagnol");
    }

    #[test]
    fn parses_simple_format_without_signature() {
        let parsed = parse_raw_title("Victor Hugo - Les Misérables");
        assert_eq!(parsed.author, "Victor Hugo");
        assert_eq!(parsed.title, "Les Misérables");
    }

    #[test]
    fn splits_on_first_separator_only() {
        let parsed = parse_raw_title("Antoine - Vol de nuit - édition revue --- (sig)");
        assert_eq!(parsed.author, "Antoine");
        assert_eq!(parsed.title, "Vol de nuit - édition revue");
    }

    #[test]
    fn falls_back_to_unknown_author() {
        let parsed = parse_raw_title("Une anthologie sans auteur");
        assert_eq!(parsed.author, "Unknown");
        assert_eq!(parsed.title, "Une anthologie sans auteur");
    }

    #[test]
    fn cache_key_is_normalized() {
        let book = Book::from_listing("id-1", "Victor Hugo - Les Misérables");
        assert_eq!(book.cache_key(), "victor hugo|les misérables");

        // Same logical item, different listing id: same key.
        let other = Book::from_listing("id-2", "Victor Hugo - Les Misérables --- (dup)");
        assert_eq!(book.cache_key(), other.cache_key());
    }

    #[test]
    fn hint_withholds_unknown_author() {
        let book = Book::from_listing("id", "Une anthologie sans auteur");
        assert_eq!(book.hint().author, None);

        let book = Book::from_listing("id", "Colette - Le Blé en herbe");
        assert_eq!(book.hint().author.as_deref(), Some("Colette"));
    }

    #[test]
    fn matches_legacy_id() {
        let mut book = Book::from_listing("abc", "A - B");
        book.legacy_id = Some("A_-_B".into());
        assert!(book.matches_id("abc"));
        assert!(book.matches_id("A_-_B"));
        assert!(!book.matches_id("other"));
    }

    #[test]
    fn query_matching_is_case_insensitive() {
        let book = Book::from_listing("id", "Colette - Le Blé en herbe");
        assert!(book.matches_query("colette"));
        assert!(book.matches_query("blé"));
        assert!(!book.matches_query("zola"));
    }
}
