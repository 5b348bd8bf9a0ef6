//! REST API tests driven through the router with `oneshot`

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;
use trendscout::api::{create_router, AppState};
use trendscout::collectors::CollectorManager;
use trendscout::config::Config;
use trendscout::models::{CollectionMode, Observation, Source};
use trendscout::pipeline::TrendPipeline;
use trendscout::storage::{create_memory_repository, HistoryManager};

use common::now;

/// Router over stores filled by two demo days ending at `now()`
async fn seeded_router() -> Router {
    let config = Config::default();
    let repository = create_memory_repository();
    let history = Arc::new(HistoryManager::in_memory(30).unwrap());
    let yesterday = now() - Duration::days(1);

    for (at, scale) in [(yesterday, 0.4), (now(), 1.0)] {
        TrendPipeline::new(
            config.clone(),
            CollectorManager::demo(&config, at, scale),
            repository.clone(),
            history.clone(),
        )
        .run(&Source::ALL, CollectionMode::Daily, at)
        .await
        .unwrap();
    }

    repository
        .insert_batch(&[
            Observation::new("tote bag", Source::Etsy, 10.0, Utc::now() - Duration::hours(1)),
            Observation::new("tote bag", Source::Reddit, 30.0, Utc::now() - Duration::hours(2)),
            Observation::new("lamp", Source::Amazon, 5.0, Utc::now() - Duration::hours(3)),
        ])
        .unwrap();

    create_router(AppState::new(config, repository, history))
}

fn empty_router() -> Router {
    create_router(AppState::new(
        Config::default(),
        create_memory_repository(),
        Arc::new(HistoryManager::in_memory(30).unwrap()),
    ))
}

async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(empty_router(), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_emerging_trends_in_window() {
    let router = seeded_router().await;
    let (status, body) = get(
        router,
        "/api/trends/emerging?days=1&end=2024-07-10&min_score=0.9",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let trends = body["data"].as_array().unwrap();
    assert_eq!(trends.len(), 27);
    assert!(trends.iter().all(|t| t["date"] == "2024-07-10"));
}

#[tokio::test]
async fn test_multi_source_trends() {
    let router = seeded_router().await;
    let (status, body) = get(
        router,
        "/api/trends/multi-source?days=2&end=2024-07-10&min_sources=4",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // keywords with four enabled platforms
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_trends_and_summary_by_date() {
    let router = seeded_router().await;

    let (status, body) = get(router.clone(), "/api/trends/2024-07-09").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 27);

    let (status, body) = get(router, "/api/summary/2024-07-10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_trends"], 27);
    assert_eq!(body["data"]["emerging_trends"], 27);
}

#[tokio::test]
async fn test_invalid_date_is_bad_request() {
    let (status, body) = get(empty_router(), "/api/summary/July-10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
}

#[tokio::test]
async fn test_out_of_range_days_is_bad_request() {
    let (status, _) = get(empty_router(), "/api/trends/emerging?days=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_keyword_frequencies() {
    let router = seeded_router().await;
    let (status, body) = get(router, "/api/keywords?hours=24&limit=5").await;

    assert_eq!(status, StatusCode::OK);
    let keywords = body["data"].as_array().unwrap();
    assert_eq!(keywords.len(), 2);
    assert_eq!(keywords[0]["keyword"], "tote bag");
    assert_eq!(keywords[0]["frequency"], 2);
    assert_eq!(keywords[0]["source_count"], 2);
}

#[tokio::test]
async fn test_keyword_history() {
    let router = seeded_router().await;
    let (status, body) = get(router, "/api/keywords/Tote%20Bag/history?days=1").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["keyword"], "tote bag");
    assert_eq!(body["data"]["observations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_latest_analysis() {
    let (status, _) = get(empty_router(), "/api/analysis/latest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let router = seeded_router().await;
    let (status, body) = get(router.clone(), "/api/analysis/latest?mode=daily").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "daily");
    assert_eq!(
        body["data"]["results"]["detection"]["summary"]["total_emerging_trends"],
        27
    );

    let (status, _) = get(router, "/api/analysis/latest?mode=hourly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats() {
    let router = seeded_router().await;
    let (status, body) = get(router, "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["history"]["total_dates"], 2);
    assert_eq!(body["data"]["history"]["total_trends"], 54);
    assert!(body["data"]["observations"]["total"].as_u64().unwrap() > 3);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let _ = trendscout::metrics::init_metrics();
    let response = empty_router()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
