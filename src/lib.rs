//! trendscout - multi-source product trend aggregation
//!
//! Collects keyword popularity observations from several platforms, stores
//! them, and turns them into scored keywords, categories, listing
//! opportunities and emerging-trend reports.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`collectors`] - Source collectors and the concurrent collector manager
//! - [`models`] - Core data structures and types
//! - [`storage`] - Observation store and daily trend history (SQLite)
//! - [`analytics`] - Classification, scoring, analysis and emerging-trend detection
//! - [`pipeline`] - Collect, analyze and detect in one pass
//! - [`api`] - Read-only REST API
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use trendscout::config::Config;
//! use trendscout::models::CollectionMode;
//! use trendscout::pipeline::TrendPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let sources = config.sources.enabled();
//!     let pipeline = TrendPipeline::open(config)?;
//!     let outcome = pipeline
//!         .run(&sources, CollectionMode::Daily, chrono::Utc::now())
//!         .await?;
//!     println!("{} emerging", outcome.analysis.detection.summary.total_emerging_trends);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod api;
pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analytics::{EmergingTrendDetector, TrendAnalyzer};
    pub use crate::collectors::{Collector, CollectorManager};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, ScoutErrorTrait};
    pub use crate::models::{CollectionMode, Observation, PlatformTrend, Source};
    pub use crate::pipeline::TrendPipeline;
    pub use crate::storage::{HistoryManager, ObservationRepository};
}

// Direct re-exports for convenience
pub use models::{CollectionMode, Observation, PlatformTrend, Source};
