//! Archive.org source: collection listing and per-item file resolution.
//!
//! Listing uses the advancedsearch API, paged and deduplicated. Access-URL
//! resolution walks the item's file list and prefers the original text PDF;
//! resolved URLs are cached for an hour (moka TTL cache) since the file
//! list of a published item effectively never changes.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::Book;
use crate::{BokhyllaError, Result};

use super::{DetailResolver, SourceLister};

/// Default base URL for archive.org.
const DEFAULT_BASE_URL: &str = "https://archive.org";

/// Page size for the advancedsearch API.
const PAGE_ROWS: usize = 200;

/// TTL for resolved access URLs.
const URL_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Maximum resolved URLs kept in memory.
const URL_CACHE_MAX: u64 = 10_000;

/// Archive.org collection source.
///
/// Implements both [`SourceLister`] (the catalog listing) and
/// [`DetailResolver`] (direct download links).
pub struct ArchiveSource {
    http: Client,
    base_url: String,
    /// Advancedsearch query selecting the collection, e.g.
    /// `creator:"noovy library"`.
    collection_query: String,
    credentials: Option<(String, String)>,
    language: Option<String>,
    url_cache: moka::future::Cache<String, String>,
}

impl ArchiveSource {
    /// Create a source for the given advancedsearch collection query.
    pub fn new(collection_query: impl Into<String>) -> Self {
        Self::with_base_url(collection_query, DEFAULT_BASE_URL)
    }

    /// Create a source with a custom base URL (for testing with wiremock).
    pub fn with_base_url(collection_query: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into(),
            collection_query: collection_query.into(),
            credentials: None,
            language: None,
            url_cache: moka::future::Cache::builder()
                .max_capacity(URL_CACHE_MAX)
                .time_to_live(URL_CACHE_TTL)
                .build(),
        }
    }

    /// Attach S3-style archive.org credentials (`LOW key:secret` header).
    pub fn credentials(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.credentials = Some((access_key.into(), secret_key.into()));
        self
    }

    /// Language stamped on every listed item (the collection is
    /// single-language).
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    async fn fetch_page(&self, page: usize) -> Result<SearchEnvelope> {
        let url = format!("{}/advancedsearch.php", self.base_url);
        let rows = PAGE_ROWS.to_string();
        let page_str = page.to_string();
        let query: Vec<(&str, &str)> = vec![
            ("q", self.collection_query.as_str()),
            ("fl[]", "identifier"),
            ("fl[]", "title"),
            ("output", "json"),
            ("rows", rows.as_str()),
            ("page", page_str.as_str()),
            ("sort[]", "addeddate desc"),
        ];

        let mut request = self.http.get(&url).query(&query);
        if let Some((key, secret)) = &self.credentials {
            request = request.header("Authorization", format!("LOW {}:{}", key, secret));
        }

        let response = request
            .send()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => BokhyllaError::AuthenticationFailed,
                429 => BokhyllaError::RateLimited { retry_after: None },
                code => BokhyllaError::Api {
                    status: code,
                    message: format!("advancedsearch error: {}", status),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))
    }

    /// Fetch the file list for an item, trying the `/files` endpoint shape
    /// first and falling back to the full metadata shape.
    async fn fetch_files(&self, identifier: &str) -> Result<Vec<ArchiveFile>> {
        let files_url = format!("{}/metadata/{}/files", self.base_url, identifier);
        match self.try_fetch::<FilesEnvelope>(&files_url).await {
            Ok(envelope) => return Ok(envelope.result),
            Err(e) => {
                debug!(identifier, error = %e, "files endpoint failed, trying metadata shape");
            }
        }

        let meta_url = format!("{}/metadata/{}", self.base_url, identifier);
        let envelope = self.try_fetch::<MetadataEnvelope>(&meta_url).await?;
        Ok(envelope.files)
    }

    async fn try_fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BokhyllaError::Api {
                status: status.as_u16(),
                message: format!("metadata error: {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| BokhyllaError::Http(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| BokhyllaError::MalformedResponse(format!("{}: {}", url, e)))
    }

    /// Build the download URL for a file, percent-encoding the name.
    fn download_url(&self, identifier: &str, file_name: &str) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BokhyllaError::Configuration(format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BokhyllaError::Configuration("base URL cannot carry a path".into()))?
            .extend(["download", identifier, file_name]);
        Ok(url.to_string())
    }
}

#[async_trait]
impl SourceLister for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
    }

    async fn list_items(&self) -> Result<Vec<Book>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut books = Vec::new();
        let mut page = 1;

        loop {
            let envelope = self.fetch_page(page).await?;
            let docs = envelope.response.docs;
            let batch_len = docs.len();

            for doc in docs {
                if !seen.insert(doc.identifier.clone()) {
                    continue; // duplicate across pages
                }
                let raw_title = doc.title.unwrap_or_else(|| doc.identifier.clone());
                let mut book = Book::from_listing(doc.identifier.clone(), raw_title);
                book.cover_url = Some(format!(
                    "{}/services/img/{}",
                    self.base_url, doc.identifier
                ));
                book.language = self.language.clone();
                books.push(book);
            }

            if batch_len < PAGE_ROWS || books.len() >= envelope.response.num_found {
                break;
            }
            page += 1;
        }

        debug!(count = books.len(), "listed archive collection");
        Ok(books)
    }
}

#[async_trait]
impl DetailResolver for ArchiveSource {
    async fn resolve_access_url(&self, identifier: &str) -> Result<Option<String>> {
        if let Some(url) = self.url_cache.get(identifier).await {
            return Ok(Some(url));
        }

        let files = self.fetch_files(identifier).await?;
        let Some(file) = pick_pdf(&files) else {
            warn!(
                identifier,
                formats = ?files.iter().filter_map(|f| f.format.as_deref()).collect::<Vec<_>>(),
                "no PDF found for item"
            );
            return Ok(None);
        };

        let url = self.download_url(identifier, file)?;
        self.url_cache
            .insert(identifier.to_string(), url.clone())
            .await;
        Ok(Some(url))
    }
}

/// Pick the best PDF from an item's file list, in preference order:
/// original `Text PDF`, any file with format `PDF`, any `.pdf` name.
fn pick_pdf(files: &[ArchiveFile]) -> Option<&str> {
    let by_format_original = files.iter().find(|f| {
        f.format.as_deref() == Some("Text PDF") && f.source.as_deref() == Some("original")
    });
    let by_format = || files.iter().find(|f| f.format.as_deref() == Some("PDF"));
    let by_name = || {
        files.iter().find(|f| {
            f.name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().ends_with(".pdf"))
        })
    };

    by_format_original
        .or_else(by_format)
        .or_else(by_name)
        .and_then(|f| f.name.as_deref())
}

#[derive(Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(rename = "numFound", default)]
    num_found: usize,
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Deserialize)]
struct SearchDoc {
    identifier: String,
    title: Option<String>,
}

/// Shape of `/metadata/{id}/files`.
#[derive(Deserialize)]
struct FilesEnvelope {
    result: Vec<ArchiveFile>,
}

/// Shape of `/metadata/{id}`.
#[derive(Deserialize)]
struct MetadataEnvelope {
    #[serde(default)]
    files: Vec<ArchiveFile>,
}

#[derive(Deserialize)]
struct ArchiveFile {
    name: Option<String>,
    format: Option<String>,
    source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, format: Option<&str>, source: Option<&str>) -> ArchiveFile {
        ArchiveFile {
            name: Some(name.into()),
            format: format.map(Into::into),
            source: source.map(Into::into),
        }
    }

    #[test]
    fn prefers_original_text_pdf() {
        let files = vec![
            file("derived.pdf", Some("PDF"), Some("derivative")),
            file("book.pdf", Some("Text PDF"), Some("original")),
        ];
        assert_eq!(pick_pdf(&files), Some("book.pdf"));
    }

    #[test]
    fn falls_back_to_pdf_format_then_name() {
        let files = vec![
            file("scan.djvu", Some("DjVu"), None),
            file("derived.pdf", Some("PDF"), None),
        ];
        assert_eq!(pick_pdf(&files), Some("derived.pdf"));

        let files = vec![
            file("scan.djvu", Some("DjVu"), None),
            file("Upper.PDF", Some("Image Container"), None),
        ];
        assert_eq!(pick_pdf(&files), Some("Upper.PDF"));
    }

    #[test]
    fn no_pdf_yields_none() {
        let files = vec![file("scan.djvu", Some("DjVu"), None)];
        assert_eq!(pick_pdf(&files), None);
    }

    #[test]
    fn parses_both_file_list_shapes() {
        let files_shape: FilesEnvelope =
            serde_json::from_str(r#"{"result": [{"name": "a.pdf", "format": "PDF"}]}"#).unwrap();
        assert_eq!(files_shape.result.len(), 1);

        let meta_shape: MetadataEnvelope =
            serde_json::from_str(r#"{"files": [{"name": "a.pdf"}], "server": "ia1"}"#).unwrap();
        assert_eq!(meta_shape.files.len(), 1);
    }
}
