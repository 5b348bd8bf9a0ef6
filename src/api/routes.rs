//! REST handlers over the observation store and trend history

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCategory, ScoutErrorTrait};
use crate::metrics;
use crate::models::{normalize_keyword, CollectionMode, Observation, PlatformTrend};
use crate::storage::{DailySummary, HistoryStats, ObservationStats};

use super::server::AppState;

const MAX_DAYS: i64 = 365;
const MAX_LIMIT: usize = 500;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub observations: ObservationStats,
    pub history: HistoryStats,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeywordHistoryResponse {
    pub keyword: String,
    pub observations: Vec<Observation>,
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Date window ending at `end` (today by default)
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
    pub end: Option<NaiveDate>,
    pub min_score: Option<f64>,
    pub min_sources: Option<usize>,
}

impl WindowQuery {
    fn range(&self) -> Result<(NaiveDate, NaiveDate), ApiError> {
        let days = self.days.unwrap_or(7);
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(ApiError::bad_request(format!(
                "days must be between 1 and {MAX_DAYS}"
            )));
        }
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = end
            .checked_sub_signed(Duration::days(days - 1))
            .ok_or_else(|| ApiError::bad_request("date window out of range"))?;
        Ok((start, end))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct KeywordsQuery {
    pub hours: Option<i64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    pub mode: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Handler failure rendered as an `ApiResponse` with a matching status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match err.category() {
            ErrorCategory::Config | ErrorCategory::Parsing => StatusCode::BAD_REQUEST,
            ErrorCategory::Network => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(category = %err.category(), error = %err, "API request failed");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Error::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::failure(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Trend history
        .route("/api/trends/emerging", get(emerging_trends))
        .route("/api/trends/multi-source", get(multi_source_trends))
        .route("/api/trends/{date}", get(trends_by_date))
        .route("/api/summary/{date}", get(daily_summary))
        // Observations
        .route("/api/keywords", get(keyword_frequencies))
        .route("/api/keywords/{keyword}/history", get(keyword_history))
        .route("/api/analysis/latest", get(latest_analysis))
        .route("/api/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Record request count and latency per matched route
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    metrics::record_api_request(
        &endpoint,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(format!("Invalid date format: {raw}. Expected YYYY-MM-DD"))
    })
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

async fn emerging_trends(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<PlatformTrend>> {
    let (start, end) = query.range()?;
    let min_score = query
        .min_score
        .unwrap_or(state.config.detector.min_emerging_score);
    if !(0.0..=1.0).contains(&min_score) {
        return Err(ApiError::bad_request("min_score must be between 0 and 1"));
    }
    ok(state.history.emerging_trends(start, end, min_score)?)
}

async fn multi_source_trends(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Vec<crate::storage::MultiSourceTrend>> {
    let (start, end) = query.range()?;
    let min_sources = query
        .min_sources
        .unwrap_or(state.config.detector.min_sources)
        .max(1);
    ok(state.history.multi_source_trends(start, end, min_sources)?)
}

async fn trends_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Vec<PlatformTrend>> {
    let date = parse_date(&date)?;
    ok(state.history.trends_by_date(date)?)
}

async fn daily_summary(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<DailySummary> {
    let date = parse_date(&date)?;
    ok(state.history.daily_summary(date)?)
}

async fn keyword_frequencies(
    State(state): State<AppState>,
    Query(query): Query<KeywordsQuery>,
) -> ApiResult<Vec<crate::storage::KeywordFrequency>> {
    let hours = query.hours.unwrap_or(24);
    if !(1..=MAX_DAYS * 24).contains(&hours) {
        return Err(ApiError::bad_request("hours out of range"));
    }
    let limit = query.limit.unwrap_or(20).clamp(1, MAX_LIMIT);
    let since = Utc::now() - Duration::hours(hours);
    ok(state.repository.keyword_frequencies(since, limit)?)
}

async fn keyword_history(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<KeywordHistoryResponse> {
    let keyword = normalize_keyword(&keyword);
    if keyword.is_empty() {
        return Err(ApiError::bad_request("keyword must not be empty"));
    }
    let days = query.days.unwrap_or(30).clamp(1, MAX_DAYS);
    let observations = state
        .repository
        .history_for(&keyword, Utc::now() - Duration::days(days))?;
    ok(KeywordHistoryResponse {
        keyword,
        observations,
    })
}

async fn latest_analysis(
    State(state): State<AppState>,
    Query(query): Query<AnalysisQuery>,
) -> ApiResult<crate::storage::StoredAnalysis> {
    let mode = match query.mode.as_deref() {
        Some(raw) => Some(
            CollectionMode::parse(raw)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown mode: {raw}")))?,
        ),
        None => None,
    };
    match state.repository.latest_analysis(mode)? {
        Some(analysis) => ok(analysis),
        None => Err(ApiError::not_found("No analysis stored yet")),
    }
}

async fn stats(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    ok(StatsResponse {
        observations: state.repository.stats(Utc::now())?,
        history: state.history.stats()?,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn prometheus_metrics() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
        .into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================
