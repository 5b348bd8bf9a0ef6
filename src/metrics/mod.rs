//! Prometheus metrics for collection, analysis and the API
//!
//! This module provides metrics tracking for:
//! - Collection: observations collected and rejected per source, collector failures, duration
//! - Analysis: pipeline runs, analysis duration, emerging trends found
//! - API: requests and latency per endpoint
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for collection metrics
struct CollectionMetrics {
    observations_collected: CounterVec,
    observations_rejected: CounterVec,
    collector_failures: CounterVec,
    collection_duration: HistogramVec,
}

/// Container for analysis and API metrics
struct AnalysisMetrics {
    pipeline_runs: CounterVec,
    analysis_duration: HistogramVec,
    emerging_trends: Gauge,
    api_requests: CounterVec,
    api_duration: HistogramVec,
}

static COLLECTION_METRICS: OnceLock<CollectionMetrics> = OnceLock::new();

static ANALYSIS_METRICS: OnceLock<AnalysisMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Registration failures are returned; the application can continue and
/// every recording function stays a no-op.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = trendscout::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let collection = CollectionMetrics {
        observations_collected: register_counter_vec!(
            "trendscout_observations_collected_total",
            "Total observations accepted per source",
            &["source"]
        )?,
        observations_rejected: register_counter_vec!(
            "trendscout_observations_rejected_total",
            "Total observations rejected by validation per source",
            &["source"]
        )?,
        collector_failures: register_counter_vec!(
            "trendscout_collector_failures_total",
            "Total failed or timed-out collector runs per source",
            &["source"]
        )?,
        collection_duration: register_histogram_vec!(
            "trendscout_collection_duration_seconds",
            "Time spent collecting from a source in seconds",
            &["source"],
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
        )?,
    };

    let analysis = AnalysisMetrics {
        pipeline_runs: register_counter_vec!(
            "trendscout_pipeline_runs_total",
            "Total pipeline runs by mode and outcome",
            &["mode", "status"]
        )?,
        analysis_duration: register_histogram_vec!(
            "trendscout_analysis_duration_seconds",
            "Time spent analyzing a window in seconds",
            &["mode"],
            vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
        )?,
        emerging_trends: register_gauge!(
            "trendscout_emerging_trends",
            "Emerging trends found by the latest detection"
        )?,
        api_requests: register_counter_vec!(
            "trendscout_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        api_duration: register_histogram_vec!(
            "trendscout_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
        )?,
    };

    COLLECTION_METRICS
        .set(collection)
        .map_err(|_| "Collection metrics already initialized")?;
    ANALYSIS_METRICS
        .set(analysis)
        .map_err(|_| "Analysis metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    COLLECTION_METRICS.get().is_some() && ANALYSIS_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a collection timer for one source
pub fn start_collection_timer(source: &str) -> MetricsTimer {
    match COLLECTION_METRICS.get() {
        Some(m) => MetricsTimer::new(
            m.collection_duration
                .with_label_values(&[source])
                .start_timer(),
        ),
        None => MetricsTimer::noop(),
    }
}

/// Record the outcome of one collector run
pub fn record_collection(source: &str, collected: usize, rejected: usize, failed: bool) {
    let Some(m) = COLLECTION_METRICS.get() else {
        return;
    };

    if collected > 0 {
        m.observations_collected
            .with_label_values(&[source])
            .inc_by(collected as f64);
    }
    if rejected > 0 {
        m.observations_rejected
            .with_label_values(&[source])
            .inc_by(rejected as f64);
    }
    if failed {
        m.collector_failures.with_label_values(&[source]).inc();
    }
}

/// Start an analysis timer
pub fn start_analysis_timer(mode: &str) -> MetricsTimer {
    match ANALYSIS_METRICS.get() {
        Some(m) => MetricsTimer::new(m.analysis_duration.with_label_values(&[mode]).start_timer()),
        None => MetricsTimer::noop(),
    }
}

/// Record a finished pipeline run
pub fn record_pipeline_run(mode: &str, success: bool, emerging: usize) {
    let Some(m) = ANALYSIS_METRICS.get() else {
        return;
    };

    let status = if success { "success" } else { "failure" };
    m.pipeline_runs.with_label_values(&[mode, status]).inc();
    if success {
        m.emerging_trends.set(emerging as f64);
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = ANALYSIS_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, &status_str])
        .inc();
    m.api_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

// ============================================================================
// Tests
// ============================================================================
