//! Wiremock tests for the Google Books provider.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bokhylla::BokhyllaError;
use bokhylla::providers::{GoogleBooksProvider, MetadataProvider};
use bokhylla::types::BookHint;

fn hint() -> BookHint {
    BookHint {
        title: "Le jardinier espagnol".into(),
        author: Some("A.J.Cronin".into()),
    }
}

#[tokio::test]
async fn query_maps_volume_info() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "items": [{
            "volumeInfo": {
                "description": "A gardener's story.",
                "pageCount": 192,
                "publishedDate": "1950-05-01",
                "categories": ["Fiction", "Drama"],
                "language": "fr",
                "publisher": "Gollancz",
                "averageRating": 4.1,
                "ratingsCount": 37,
                "imageLinks": {
                    "thumbnail": "http://books.google.com/t.jpg",
                    "large": "http://books.google.com/l.jpg"
                }
            }
        }]
    });
    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("q", "Le jardinier espagnol A.J.Cronin"))
        .and(query_param("maxResults", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GoogleBooksProvider::with_base_url(None, server.uri());
    let record = provider.query(&hint()).await.unwrap().expect("a record");

    assert_eq!(record.year, Some(1950));
    assert_eq!(record.pages, Some(192));
    assert_eq!(record.category.as_deref(), Some("Fiction"));
    assert_eq!(record.publisher.as_deref(), Some("Gollancz"));
    assert_eq!(record.rating, Some(4.1));
    assert_eq!(record.ratings_count, Some(37));
    assert_eq!(
        record.cover_url.as_deref(),
        Some("https://books.google.com/l.jpg"),
        "largest image, forced https"
    );
    assert_eq!(record.source, "googlebooks");
}

#[tokio::test]
async fn api_key_is_sent_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GoogleBooksProvider::with_base_url(Some("test-key".into()), server.uri());
    assert!(provider.query(&hint()).await.unwrap().is_none());
}

#[tokio::test]
async fn empty_hint_skips_the_request() {
    let server = MockServer::start().await;
    // No mock mounted: a request would fail the test with a connect error.

    let provider = GoogleBooksProvider::with_base_url(None, server.uri());
    let empty = BookHint {
        title: "  ".into(),
        author: None,
    };
    assert!(provider.query(&empty).await.unwrap().is_none());
}

#[tokio::test]
async fn rate_limit_maps_to_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = GoogleBooksProvider::with_base_url(None, server.uri());
    let err = provider.query(&hint()).await.unwrap_err();
    assert!(matches!(err, BokhyllaError::RateLimited { retry_after: None }));
}

#[tokio::test]
async fn server_errors_map_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = GoogleBooksProvider::with_base_url(None, server.uri());
    let err = provider.query(&hint()).await.unwrap_err();
    match err {
        BokhyllaError::Api { status, .. } => assert_eq!(status, 503),
        other => panic!("expected Api, got {other:?}"),
    }
}
