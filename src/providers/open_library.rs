//! OpenLibrary metadata provider.
//!
//! Uses the search API for bibliographic fields, then the Works API for the
//! description. See: <https://openlibrary.org/developers/api>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::types::{BookHint, MetadataRecord};
use crate::{BokhyllaError, Result};

use super::traits::MetadataProvider;

/// Default base URL for the OpenLibrary API.
const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

/// Public cover image host; keyed by `cover_i` from search results.
const COVERS_URL: &str = "https://covers.openlibrary.org";

/// Fields requested from the search API. Limiting the field list keeps
/// responses small.
const SEARCH_FIELDS: &str = "key,first_publish_year,cover_i,number_of_pages_median,language";

/// Client for the OpenLibrary search + works APIs.
#[derive(Clone)]
pub struct OpenLibraryProvider {
    http: Client,
    base_url: String,
}

impl OpenLibraryProvider {
    /// Create a provider against the production OpenLibrary endpoints.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a provider with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Fetch the description for a work key (e.g. `/works/OL45883W`).
    ///
    /// The works API returns the description either as a bare string or as
    /// a `{"type": ..., "value": ...}` object; [`WorkDescription`] tries
    /// both shapes in order. Failure here is non-critical — the search
    /// result alone is still useful.
    async fn fetch_description(&self, work_key: &str) -> Option<String> {
        let url = format!("{}{}.json", self.base_url, work_key);
        let response = match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!(work_key, status = %r.status(), "works API error");
                return None;
            }
            Err(e) => {
                debug!(work_key, error = %e, "works API unreachable");
                return None;
            }
        };

        match response.json::<WorkResponse>().await {
            Ok(work) => work.description.map(WorkDescription::into_text),
            Err(e) => {
                debug!(work_key, error = %e, "works API response did not parse");
                None
            }
        }
    }

    /// Check response status and map to the appropriate error.
    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status.as_u16() {
            401 | 403 => Err(BokhyllaError::AuthenticationFailed),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(BokhyllaError::RateLimited { retry_after })
            }
            code => Err(BokhyllaError::Api {
                status: code,
                message: format!("OpenLibrary API error: {}", status),
            }),
        }
    }
}

impl Default for OpenLibraryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for OpenLibraryProvider {
    fn name(&self) -> &str {
        "openlibrary"
    }

    async fn query(&self, hint: &BookHint) -> Result<Option<MetadataRecord>> {
        let url = format!("{}/search.json", self.base_url);
        let mut query: Vec<(&str, &str)> = vec![
            ("title", hint.title.as_str()),
            ("limit", "1"),
            ("fields", SEARCH_FIELDS),
        ];
        if let Some(author) = &hint.author {
            query.push(("author", author.as_str()));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;

        self.handle_response_errors(&response)?;

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;

        let Some(doc) = result.docs.into_iter().next() else {
            return Ok(None);
        };

        let description = match &doc.key {
            Some(key) => self.fetch_description(key).await,
            None => None,
        };

        Ok(Some(MetadataRecord {
            cover_url: doc
                .cover_i
                .map(|id| format!("{}/b/id/{}-L.jpg", COVERS_URL, id)),
            year: doc.first_publish_year,
            pages: doc.number_of_pages_median,
            description,
            language: doc.language.and_then(Language::into_first),
            source: self.name().to_string(),
            ..MetadataRecord::default()
        }))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Deserialize)]
struct SearchDoc {
    key: Option<String>,
    first_publish_year: Option<i32>,
    cover_i: Option<u64>,
    number_of_pages_median: Option<u32>,
    language: Option<Language>,
}

/// The search API returns `language` as either an array or a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Language {
    Many(Vec<String>),
    One(String),
}

impl Language {
    fn into_first(self) -> Option<String> {
        match self {
            Language::Many(mut list) if !list.is_empty() => Some(list.remove(0)),
            Language::Many(_) => None,
            Language::One(lang) => Some(lang),
        }
    }
}

#[derive(Deserialize)]
struct WorkResponse {
    description: Option<WorkDescription>,
}

/// Parse strategies for the works `description` field, tried in order:
/// a bare string, then a `{value}` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum WorkDescription {
    Text(String),
    Object { value: String },
}

impl WorkDescription {
    fn into_text(self) -> String {
        match self {
            WorkDescription::Text(text) => text,
            WorkDescription::Object { value } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_string_description() {
        let json = r#"{"description": "A synopsis."}"#;
        let work: WorkResponse = serde_json::from_str(json).unwrap();
        assert_eq!(work.description.map(WorkDescription::into_text).as_deref(), Some("A synopsis."));
    }

    #[test]
    fn parses_object_description() {
        let json = r#"{"description": {"type": "/type/text", "value": "A synopsis."}}"#;
        let work: WorkResponse = serde_json::from_str(json).unwrap();
        assert_eq!(work.description.map(WorkDescription::into_text).as_deref(), Some("A synopsis."));
    }

    #[test]
    fn parses_language_shapes() {
        let many: Language = serde_json::from_str(r#"["fre", "eng"]"#).unwrap();
        assert_eq!(many.into_first().as_deref(), Some("fre"));

        let one: Language = serde_json::from_str(r#""fre""#).unwrap();
        assert_eq!(one.into_first().as_deref(), Some("fre"));

        let empty: Language = serde_json::from_str(r#"[]"#).unwrap();
        assert_eq!(empty.into_first(), None);
    }

    #[test]
    fn missing_docs_field_means_no_results() {
        let result: SearchResponse = serde_json::from_str(r#"{"numFound": 0}"#).unwrap();
        assert!(result.docs.is_empty());
    }
}
