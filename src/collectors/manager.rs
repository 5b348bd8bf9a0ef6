//! Concurrent fan-out over registered collectors
//!
//! Each enabled source runs in its own future under a timeout. A collector
//! that fails or times out contributes nothing and has its error recorded in
//! the run's per-source report; the others are unaffected.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;

use super::{FeedCollector, SharedCollector, StaticCollector};
use crate::config::{Config, SourcesConfig};
use crate::error::Error;
use crate::metrics;
use crate::models::{CollectionMode, ObservationSet, Source, SourceReport};
use crate::utils::error::CollectError;

/// Whether a source is switched on and has a collector behind it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollectorStatus {
    pub enabled: bool,
    pub available: bool,
}

pub struct CollectorManager {
    collectors: BTreeMap<Source, SharedCollector>,
    sources: SourcesConfig,
    collector_timeout: Duration,
}

impl CollectorManager {
    /// Empty manager; each collector gets `request_timeout × (max_retries + 1)`
    pub fn new(config: &Config) -> Self {
        let attempts = config.collection.max_retries.saturating_add(1);
        Self {
            collectors: BTreeMap::new(),
            sources: config.sources.clone(),
            collector_timeout: config.request_timeout() * attempts,
        }
    }

    /// Manager with a feed collector for every source that has an endpoint
    pub fn from_config(config: &Config) -> Result<Self, CollectError> {
        let mut manager = Self::new(config);
        for source in Source::ALL {
            if config.sources.get(source).endpoint.is_some() {
                manager.register(Arc::new(FeedCollector::new(source, &config.collection)?));
            }
        }
        Ok(manager)
    }

    /// Manager serving deterministic demo data for every source
    pub fn demo(config: &Config, now: DateTime<Utc>, scale: f64) -> Self {
        let mut manager = Self::new(config);
        for source in Source::ALL {
            manager.register(Arc::new(StaticCollector::demo_scaled(source, now, scale)));
        }
        manager
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.collector_timeout = timeout;
        self
    }

    /// Register a collector, replacing any previous one for the same source
    pub fn register(&mut self, collector: SharedCollector) {
        let source = collector.source();
        if self.collectors.insert(source, collector).is_some() {
            tracing::debug!(%source, "Replaced registered collector");
        }
    }

    pub fn registered_sources(&self) -> Vec<Source> {
        self.collectors.keys().copied().collect()
    }

    pub fn collector_status(&self) -> BTreeMap<Source, CollectorStatus> {
        Source::ALL
            .iter()
            .map(|source| {
                (
                    *source,
                    CollectorStatus {
                        enabled: self.sources.is_enabled(*source),
                        available: self.collectors.contains_key(source),
                    },
                )
            })
            .collect()
    }

    /// Collect from every requested source that is enabled and registered
    ///
    /// Invalid observations are dropped and counted; duplicates (same id) keep
    /// the first occurrence.
    pub async fn collect_all(
        &self,
        sources: &[Source],
        mode: CollectionMode,
        now: DateTime<Utc>,
    ) -> ObservationSet {
        let mut set = ObservationSet::new(mode, now);

        let requested: BTreeSet<Source> = sources.iter().copied().collect();
        let mut active = Vec::new();
        for source in requested {
            if !self.sources.is_enabled(source) {
                tracing::warn!(%source, "Source disabled in configuration, skipping");
                continue;
            }
            let Some(collector) = self.collectors.get(&source) else {
                tracing::warn!(%source, "No collector registered for source, skipping");
                continue;
            };
            active.push((source, Arc::clone(collector)));
        }

        if active.is_empty() {
            tracing::warn!(%mode, "No collectors available for this run");
            return set;
        }

        tracing::info!(
            run_id = %set.run_id,
            %mode,
            sources = active.len(),
            "Starting collection"
        );

        let timeout = self.collector_timeout;
        let runs = active.into_iter().map(|(source, collector)| {
            let settings = self.sources.get(source).clone();
            async move {
                let _timer = metrics::start_collection_timer(source.as_str());
                let result = match tokio::time::timeout(timeout, collector.collect(mode, &settings))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(CollectError::Timeout(timeout.as_secs())),
                };
                (source, result)
            }
        });

        let mut seen = HashSet::new();
        for (source, result) in join_all(runs).await {
            let mut report = SourceReport::default();
            match result {
                Ok(observations) => {
                    for obs in observations {
                        if let Err(reason) = obs.validate() {
                            tracing::debug!(%source, keyword = %obs.keyword, %reason, "Rejected observation");
                            report.rejected += 1;
                            continue;
                        }
                        if seen.insert(obs.id()) {
                            report.count += 1;
                            set.observations.push(obs);
                        }
                    }
                    tracing::info!(
                        %source,
                        count = report.count,
                        rejected = report.rejected,
                        "Collector finished"
                    );
                }
                Err(e) => {
                    tracing::error!(%source, error = %e, "Collector failed");
                    report.error = Some(e.to_string());
                }
            }

            metrics::record_collection(
                source.as_str(),
                report.count,
                report.rejected,
                report.error.is_some(),
            );
            set.per_source.insert(source, report);
        }

        tracing::info!(
            run_id = %set.run_id,
            total = set.total_items(),
            failed = set.failed_sources().len(),
            "Collection completed"
        );
        set
    }
}

/// Write a collection run as pretty JSON to `collected_<mode>_<YYYYmmdd_HHMMSS>.json`
pub fn write_raw_snapshot(set: &ObservationSet, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create raw data directory: {}", dir.display()))?;

    let path = dir.join(format!(
        "collected_{}_{}.json",
        set.mode,
        set.collected_at.format("%Y%m%d_%H%M%S")
    ));
    let body = serde_json::to_string_pretty(set).context("Failed to serialize collection run")?;
    std::fs::write(&path, body)
        .with_context(|| format!("Failed to write raw snapshot: {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Raw snapshot written");
    Ok(path)
}

/// Parse `all` or a comma-separated list of source names
pub fn parse_sources(spec: &str) -> crate::error::Result<Vec<Source>> {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return Ok(Source::ALL.to_vec());
    }

    let mut sources = Vec::new();
    for name in spec.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let source =
            Source::parse(name).ok_or_else(|| Error::config(format!("unknown source: {name}")))?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    if sources.is_empty() {
        return Err(Error::config("no sources given"));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap()
    }

    fn obs(keyword: &str, source: Source, value: f64, hours_ago: i64) -> Observation {
        Observation::new(keyword, source, value, now() - ChronoDuration::hours(hours_ago))
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let config = Config::default();
        let mut manager = CollectorManager::new(&config);
        manager.register(Arc::new(StaticCollector::new(
            Source::Etsy,
            vec![obs("mug", Source::Etsy, 4.0, 1)],
        )));
        manager.register(Arc::new(StaticCollector::failing(Source::Reddit, 500)));

        let set = manager
            .collect_all(&[Source::Etsy, Source::Reddit], CollectionMode::Daily, now())
            .await;

        assert_eq!(set.total_items(), 1);
        assert_eq!(set.per_source[&Source::Etsy].count, 1);
        assert_eq!(set.failed_sources(), vec![Source::Reddit]);
        assert!(set.per_source[&Source::Reddit]
            .error
            .as_deref()
            .unwrap()
            .contains("500"));
    }

    #[tokio::test]
    async fn test_timeout_is_recorded() {
        let config = Config::default();
        let mut manager = CollectorManager::new(&config).with_timeout(Duration::from_millis(20));
        manager.register(Arc::new(
            StaticCollector::new(Source::Amazon, vec![obs("lamp", Source::Amazon, 1.0, 1)])
                .with_delay(Duration::from_secs(5)),
        ));
        manager.register(Arc::new(StaticCollector::new(
            Source::Etsy,
            vec![obs("mug", Source::Etsy, 4.0, 1)],
        )));

        let set = manager
            .collect_all(&Source::ALL, CollectionMode::Daily, now())
            .await;
        assert_eq!(set.total_items(), 1);
        assert_eq!(set.failed_sources(), vec![Source::Amazon]);
    }

    #[tokio::test]
    async fn test_disabled_and_unregistered_sources_are_skipped() {
        let config = Config::default();
        let mut manager = CollectorManager::new(&config);
        manager.register(Arc::new(StaticCollector::new(
            Source::Twitter,
            vec![obs("meme", Source::Twitter, 9.0, 1)],
        )));

        let set = manager
            .collect_all(&[Source::Twitter, Source::Pinterest], CollectionMode::Daily, now())
            .await;
        assert_eq!(set.total_items(), 0);
        assert!(set.per_source.is_empty());
    }

    #[tokio::test]
    async fn test_validation_and_dedup() {
        let config = Config::default();
        let mut manager = CollectorManager::new(&config);
        let first = obs("candle", Source::Etsy, 5.0, 2);
        let duplicate = Observation {
            metric_value: 7.0,
            ..first.clone()
        };
        manager.register(Arc::new(StaticCollector::new(
            Source::Etsy,
            vec![
                first,
                duplicate,
                obs("  ", Source::Etsy, 1.0, 1),
                obs("lamp", Source::Etsy, f64::NAN, 1),
            ],
        )));

        let set = manager
            .collect_all(&[Source::Etsy], CollectionMode::Daily, now())
            .await;
        assert_eq!(set.total_items(), 1);
        assert_eq!(set.observations[0].metric_value, 5.0);
        assert_eq!(set.per_source[&Source::Etsy].rejected, 2);
    }

    #[test]
    fn test_collector_status() {
        let config = Config::default();
        let mut manager = CollectorManager::new(&config);
        manager.register(Arc::new(StaticCollector::new(Source::Reddit, vec![])));

        let status = manager.collector_status();
        assert_eq!(status.len(), 6);
        assert_eq!(
            status[&Source::Reddit],
            CollectorStatus {
                enabled: true,
                available: true
            }
        );
        assert!(!status[&Source::Twitter].enabled);
        assert!(!status[&Source::Etsy].available);
    }

    #[test]
    fn test_from_config_registers_feeds_with_endpoints() {
        let mut config = Config::default();
        config.sources.etsy.endpoint = Some("https://feeds.example.com/etsy".into());
        let manager = CollectorManager::from_config(&config).unwrap();
        assert_eq!(manager.registered_sources(), vec![Source::Etsy]);
    }

    #[test]
    fn test_write_raw_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = ObservationSet::new(CollectionMode::Weekly, now());
        set.observations.push(obs("mug", Source::Amazon, 2.0, 1));

        let path = write_raw_snapshot(&set, &dir.path().join("raw")).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "collected_weekly_20240710_120000.json"
        );
        let parsed: ObservationSet =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.run_id, set.run_id);
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(parse_sources("all").unwrap().len(), 6);
        assert_eq!(
            parse_sources("etsy, Reddit,etsy").unwrap(),
            vec![Source::Etsy, Source::Reddit]
        );
        assert!(matches!(parse_sources("etsy,myspace"), Err(Error::Config(_))));
        assert!(parse_sources(" , ").is_err());
    }
}
