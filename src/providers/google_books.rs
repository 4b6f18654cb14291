//! Google Books metadata provider.
//!
//! Single volumes query per item. An API key is optional; without one the
//! public quota applies. See:
//! <https://developers.google.com/books/docs/v1/using>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{BookHint, MetadataRecord};
use crate::{BokhyllaError, Result};

use super::traits::MetadataProvider;

/// Default base URL for the Google Books volumes API.
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Client for the Google Books volumes API.
#[derive(Clone)]
pub struct GoogleBooksProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleBooksProvider {
    /// Create a provider against the production endpoint.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a provider with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
            api_key,
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
                message: format!("Google Books API error: {}", status),
            }),
        }
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    fn name(&self) -> &str {
        "googlebooks"
    }

    async fn query(&self, hint: &BookHint) -> Result<Option<MetadataRecord>> {
        let q = match &hint.author {
            Some(author) => format!("{} {}", hint.title, author),
            None => hint.title.clone(),
        };
        let q = q.trim().to_string();
        if q.is_empty() {
            return Ok(None);
        }

        let url = format!("{}/volumes", self.base_url);
        let mut query: Vec<(&str, &str)> =
            vec![("q", q.as_str()), ("maxResults", "1"), ("orderBy", "relevance")];
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;

        self.handle_response_errors(&response)?;

        let result: VolumesResponse = response
            .json()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;

        let Some(info) = result.items.into_iter().next().and_then(|i| i.volume_info) else {
            return Ok(None);
        };

        Ok(Some(MetadataRecord {
            cover_url: info.image_links.and_then(ImageLinks::best).map(force_https),
            description: info.description,
            pages: info.page_count,
            year: info.published_date.as_deref().and_then(extract_year),
            category: info.categories.and_then(|c| c.into_iter().next()),
            language: info.language,
            publisher: info.publisher,
            rating: info.average_rating,
            ratings_count: info.ratings_count,
            source: self.name().to_string(),
        }))
    }
}

/// Extract the first 4-digit run from a date-like string
/// (`"1999"`, `"1999-05-01"`, `"May 1999"`).
fn extract_year(date: &str) -> Option<i32> {
    let bytes = date.as_bytes();
    let mut run_start = None;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            let start = *run_start.get_or_insert(i);
            if i - start == 3 {
                return date[start..=i].parse().ok();
            }
        } else {
            run_start = None;
        }
    }
    None
}

fn force_https(url: String) -> String {
    match url.strip_prefix("http:") {
        Some(rest) => format!("https:{}", rest),
        None => url,
    }
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: Option<VolumeInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    description: Option<String>,
    page_count: Option<u32>,
    published_date: Option<String>,
    categories: Option<Vec<String>>,
    language: Option<String>,
    publisher: Option<String>,
    average_rating: Option<f32>,
    ratings_count: Option<u32>,
    image_links: Option<ImageLinks>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    extra_large: Option<String>,
    large: Option<String>,
    medium: Option<String>,
    thumbnail: Option<String>,
}

impl ImageLinks {
    /// Largest available image, preferring print quality over thumbnails.
    fn best(self) -> Option<String> {
        self.extra_large
            .or(self.large)
            .or(self.medium)
            .or(self.thumbnail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_year_from_date_shapes() {
        assert_eq!(extract_year("1999"), Some(1999));
        assert_eq!(extract_year("1999-05-01"), Some(1999));
        assert_eq!(extract_year("May 1999"), Some(1999));
        assert_eq!(extract_year("n.d."), None);
        assert_eq!(extract_year("99"), None);
    }

    #[test]
    fn image_link_preference_order() {
        let links: ImageLinks = serde_json::from_str(
            r#"{"thumbnail": "t", "medium": "m", "large": "l"}"#,
        )
        .unwrap();
        assert_eq!(links.best().as_deref(), Some("l"));

        let links: ImageLinks = serde_json::from_str(r#"{"thumbnail": "t"}"#).unwrap();
        assert_eq!(links.best().as_deref(), Some("t"));
    }

    #[test]
    fn forces_https_on_covers() {
        assert_eq!(
            force_https("http://books.google.com/c.jpg".into()),
            "https://books.google.com/c.jpg"
        );
        assert_eq!(
            force_https("https://books.google.com/c.jpg".into()),
            "https://books.google.com/c.jpg"
        );
    }

    #[test]
    fn missing_items_field_means_no_results() {
        let result: VolumesResponse = serde_json::from_str(r#"{"kind": "books#volumes"}"#).unwrap();
        assert!(result.items.is_empty());
    }
}
