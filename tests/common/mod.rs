//! Common test utilities

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use trendscout::collectors::{CollectorManager, StaticCollector};
use trendscout::config::Config;
use trendscout::models::{Observation, Source};
use trendscout::pipeline::TrendPipeline;
use trendscout::storage::{create_memory_repository, HistoryManager};

/// Fixed clock for deterministic windows
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap()
}

/// Observation `hours_ago` hours before `at`
#[allow(dead_code)]
pub fn observation(
    keyword: &str,
    source: Source,
    value: f64,
    at: DateTime<Utc>,
    hours_ago: i64,
) -> Observation {
    Observation::new(keyword, source, value, at - Duration::hours(hours_ago))
}

/// Manager with one static collector per `(source, observations)` pair
#[allow(dead_code)]
pub fn manager_with(config: &Config, collectors: Vec<(Source, Vec<Observation>)>) -> CollectorManager {
    let mut manager = CollectorManager::new(config);
    for (source, observations) in collectors {
        manager.register(Arc::new(StaticCollector::new(source, observations)));
    }
    manager
}

/// Pipeline over in-memory stores
#[allow(dead_code)]
pub fn memory_pipeline(config: Config, manager: CollectorManager) -> TrendPipeline {
    TrendPipeline::new(
        config,
        manager,
        create_memory_repository(),
        Arc::new(HistoryManager::in_memory(30).unwrap()),
    )
}
