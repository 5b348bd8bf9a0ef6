//! Integration tests for FeedCollector using wiremock

use trendscout::collectors::{Collector, FeedCollector};
use trendscout::config::{CollectionConfig, SourceConfig};
use trendscout::models::{CollectionMode, Source};
use trendscout::utils::error::CollectError;
use trendscout::utils::retry::RetryConfig;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collector(source: Source, max_retries: u32) -> FeedCollector {
    let config = CollectionConfig {
        request_timeout_secs: 5,
        requests_per_second: 50,
        ..CollectionConfig::default()
    };
    FeedCollector::new(source, &config)
        .unwrap()
        .with_retry(RetryConfig::with_delays(max_retries, 5, 20))
}

fn settings(server: &MockServer, route: &str) -> SourceConfig {
    SourceConfig {
        enabled: true,
        endpoint: Some(format!("{}{route}", server.uri())),
        max_items: 10,
        ..SourceConfig::default()
    }
}

/// Test successful collection with auth and query parameters
#[tokio::test]
async fn test_collect_success() {
    let mock_server = MockServer::start().await;
    let body = serde_json::json!([
        {"keyword": "Soy Candle", "value": 71.0, "timestamp": "2024-07-10T11:00:00Z", "text": "Hand poured"},
        {"keyword": "handmade soap", "value": 44.5, "timestamp": "2024-07-10T09:30:00Z"}
    ]);

    Mock::given(method("GET"))
        .and(path("/etsy"))
        .and(query_param("mode", "weekly"))
        .and(query_param("limit", "10"))
        .and(query_param("terms", "candles,soap"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let settings = SourceConfig {
        api_key: Some("secret".into()),
        terms: vec!["candles".into(), "soap".into()],
        ..settings(&mock_server, "/etsy")
    };
    let observations = collector(Source::Etsy, 0)
        .collect(CollectionMode::Weekly, &settings)
        .await
        .unwrap();

    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].keyword, "soy candle");
    assert_eq!(observations[0].source, Source::Etsy);
    assert_eq!(observations[0].text.as_deref(), Some("Hand poured"));
    assert_eq!(observations[1].metric_value, 44.5);
}

/// Test that server errors are retried and then reported as exhausted
#[tokio::test]
async fn test_server_error_exhausts_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reddit"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let err = collector(Source::Reddit, 2)
        .collect(CollectionMode::Daily, &settings(&mock_server, "/reddit"))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::MaxRetriesExceeded(_)), "got {err:?}");
}

/// Test that a transient failure recovers on retry
#[tokio::test]
async fn test_server_error_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pins"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/pins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"keyword": "boho wall art", "value": 12.0, "timestamp": "2024-07-10T08:00:00Z"}
        ])))
        .mount(&mock_server)
        .await;

    let observations = collector(Source::Pinterest, 2)
        .collect(CollectionMode::Daily, &settings(&mock_server, "/pins"))
        .await
        .unwrap();

    assert_eq!(observations.len(), 1);
}

/// Test 404 does not retry
#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/amazon"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = collector(Source::Amazon, 3)
        .collect(CollectionMode::Daily, &settings(&mock_server, "/amazon"))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Status { status: 404, .. }));
}

/// Test malformed items are skipped and results are capped at max_items
#[tokio::test]
async fn test_malformed_items_skipped_and_truncated() {
    let mock_server = MockServer::start().await;
    let mut items: Vec<serde_json::Value> = (0..12)
        .map(|i| {
            serde_json::json!({
                "keyword": format!("keyword {i}"),
                "value": i,
                "timestamp": "2024-07-10T08:00:00Z"
            })
        })
        .collect();
    items.insert(0, serde_json::json!({"keyword": "no value"}));
    items.insert(1, serde_json::json!("not an object"));

    Mock::given(method("GET"))
        .and(path("/trends"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .mount(&mock_server)
        .await;

    let observations = collector(Source::GoogleTrends, 0)
        .collect(CollectionMode::Daily, &settings(&mock_server, "/trends"))
        .await
        .unwrap();

    assert_eq!(observations.len(), 10);
    assert_eq!(observations[0].keyword, "keyword 0");
}

/// Test a body that is not a JSON array
#[tokio::test]
async fn test_invalid_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = collector(Source::Twitter, 0)
        .collect(CollectionMode::Daily, &settings(&mock_server, "/bad"))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Decode(_)));
}

/// Test a source without an endpoint
#[tokio::test]
async fn test_missing_endpoint() {
    let err = collector(Source::Etsy, 0)
        .collect(CollectionMode::Daily, &SourceConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::NotConfigured(Source::Etsy)));
}
