//! End-to-end trend pipeline
//!
//! ```text
//! collect ──► observation store ──► analyze window ──► platform trends
//!                                                          │
//!                      history baseline ──► detect + confidence
//!                                                          │
//!          saved analysis ◄── report + suggestions ◄── today's snapshot
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{
    AnalysisReport, DetectionReport, EmergingTrendDetector, ListingSuggestion, TrendAnalyzer,
};
use crate::collectors::{write_raw_snapshot, CollectorManager};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{CollectionMode, ObservationSet, PlatformTrend, Source, TrendRecord};
use crate::storage::{
    create_sqlite_repository, DailySummary, HistoryManager, SharedObservationRepository,
};

/// What one collection produced and stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub set: ObservationSet,
    pub stored: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_snapshot: Option<PathBuf>,
}

/// Analysis and detection results for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub analysis: AnalysisReport,
    pub detection: DetectionReport,
    pub high_quality: Vec<PlatformTrend>,
    pub suggestions: Vec<ListingSuggestion>,
    pub records: Vec<TrendRecord>,
    pub baseline_date: Option<NaiveDate>,
    pub snapshot: DailySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub collection: CollectionOutcome,
    pub analysis: AnalysisOutcome,
}

pub struct TrendPipeline {
    config: Config,
    manager: CollectorManager,
    repository: SharedObservationRepository,
    history: Arc<HistoryManager>,
    analyzer: TrendAnalyzer,
    detector: EmergingTrendDetector,
    raw_dir: Option<PathBuf>,
}

impl TrendPipeline {
    pub fn new(
        config: Config,
        manager: CollectorManager,
        repository: SharedObservationRepository,
        history: Arc<HistoryManager>,
    ) -> Self {
        Self {
            analyzer: TrendAnalyzer::new(&config.analysis),
            detector: EmergingTrendDetector::new(config.detector.clone()),
            config,
            manager,
            repository,
            history,
            raw_dir: None,
        }
    }

    /// Pipeline over the configured SQLite stores and feed collectors
    pub fn open(config: Config) -> Result<Self> {
        let repository = create_sqlite_repository(&config.storage.sqlite_path)?;
        let history = Arc::new(HistoryManager::new(
            &config.storage.history_path,
            config.storage.retention_days,
        )?);
        let manager = CollectorManager::from_config(&config)?;
        let raw_dir = config.storage.raw_dir.clone();

        Ok(Self::new(config, manager, repository, history).with_raw_dir(raw_dir))
    }

    /// Write every collection run as JSON into `dir`
    pub fn with_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &CollectorManager {
        &self.manager
    }

    pub fn repository(&self) -> &SharedObservationRepository {
        &self.repository
    }

    pub fn history(&self) -> &Arc<HistoryManager> {
        &self.history
    }

    pub fn analyzer(&self) -> &TrendAnalyzer {
        &self.analyzer
    }

    pub fn detector(&self) -> &EmergingTrendDetector {
        &self.detector
    }

    /// Collect from `sources` and store the observations
    pub async fn collect(
        &self,
        sources: &[Source],
        mode: CollectionMode,
        now: DateTime<Utc>,
    ) -> Result<CollectionOutcome> {
        let set = self.manager.collect_all(sources, mode, now).await;
        let stored = self.repository.insert_batch(&set.observations)?;

        let raw_snapshot = match &self.raw_dir {
            Some(dir) if !set.observations.is_empty() => Some(write_raw_snapshot(&set, dir)?),
            _ => None,
        };

        tracing::info!(
            run_id = %set.run_id,
            collected = set.total_items(),
            stored,
            "Observations stored"
        );

        Ok(CollectionOutcome {
            set,
            stored,
            raw_snapshot,
        })
    }

    /// Analyze the stored window for `mode`, detect emerging trends against the
    /// latest earlier snapshot and store today's snapshot
    pub fn analyze(&self, mode: CollectionMode, now: DateTime<Utc>) -> Result<AnalysisOutcome> {
        let _timer = metrics::start_analysis_timer(mode.as_str());
        let detector_config = self.detector.config();

        let history_since = now
            .checked_sub_signed(Duration::days(i64::from(detector_config.lookback_days)))
            .ok_or_else(|| {
                Error::config(format!(
                    "lookback of {} days is out of range",
                    detector_config.lookback_days
                ))
            })?;

        let observations = self.repository.since(now - mode.lookback())?;
        let analysis = self.analyzer.analyze(mode, &observations, now);

        let today = now.date_naive();
        let current = self.analyzer.platform_trends(&observations, now);
        let baseline_date = self
            .history
            .latest_snapshot_before(today, detector_config.lookback_days)?;
        let historical = match baseline_date {
            Some(date) => self.history.trends_by_date(date)?,
            None => Vec::new(),
        };

        let assessment = self.detector.assess_day(&current, &historical);
        let snapshot = self.history.store_daily_trends(&assessment.trends, today)?;

        let emerging = assessment.emerging;
        let cross = self
            .detector
            .cross_platform(&emerging, detector_config.min_sources);
        let detection = self.detector.report(&emerging, &cross, now);
        let high_quality = self.detector.filter_high_quality(&emerging, None, None);
        let suggestions = self.detector.suggest_listings(&emerging);

        let top = self.config.reporting.top_for(mode);
        let records = self.analyzer.trend_records(
            &analysis.trending_keywords[..top.min(analysis.trending_keywords.len())],
            self.repository.as_ref(),
            history_since,
        )?;

        let outcome = AnalysisOutcome {
            analysis,
            detection,
            high_quality,
            suggestions,
            records,
            baseline_date,
            snapshot,
        };

        self.repository
            .save_analysis(mode, now, &serde_json::to_value(&outcome)?)?;

        tracing::info!(
            %mode,
            %today,
            baseline = ?baseline_date,
            platform_trends = current.len(),
            emerging = outcome.detection.summary.total_emerging_trends,
            cross_platform = outcome.detection.summary.cross_platform_trends,
            "Analysis stored"
        );

        Ok(outcome)
    }

    /// Collect, store, analyze and detect in one pass
    pub async fn run(
        &self,
        sources: &[Source],
        mode: CollectionMode,
        now: DateTime<Utc>,
    ) -> Result<PipelineOutcome> {
        let result = self.collect_and_analyze(sources, mode, now).await;

        match &result {
            Ok(outcome) => metrics::record_pipeline_run(
                mode.as_str(),
                true,
                outcome.analysis.detection.summary.total_emerging_trends,
            ),
            Err(e) => {
                tracing::error!(%mode, error = %e, "Pipeline run failed");
                metrics::record_pipeline_run(mode.as_str(), false, 0);
            }
        }
        result
    }

    async fn collect_and_analyze(
        &self,
        sources: &[Source],
        mode: CollectionMode,
        now: DateTime<Utc>,
    ) -> Result<PipelineOutcome> {
        let collection = self.collect(sources, mode, now).await?;
        let analysis = self.analyze(mode, now)?;
        Ok(PipelineOutcome {
            collection,
            analysis,
        })
    }
}

/// Write an analysis outcome as `analysis_<mode>_<YYYYmmdd_HHMMSS>.json` in `dir`
pub fn write_report(outcome: &AnalysisOutcome, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let analysis = &outcome.analysis;
    let path = dir.join(format!(
        "analysis_{}_{}.json",
        analysis.mode,
        analysis.analysis_timestamp.format("%Y%m%d_%H%M%S")
    ));
    let body = serde_json::to_string_pretty(outcome).context("Failed to serialize analysis")?;
    std::fs::write(&path, body)
        .with_context(|| format!("Failed to write analysis report: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::StaticCollector;
    use crate::models::Observation;
    use crate::storage::create_memory_repository;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap()
    }

    fn pipeline(manager: CollectorManager) -> TrendPipeline {
        let config = Config::default();
        TrendPipeline::new(
            config,
            manager,
            create_memory_repository(),
            Arc::new(HistoryManager::in_memory(30).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_empty_run_still_produces_outcome() {
        let pipeline = pipeline(CollectorManager::new(&Config::default()));
        let outcome = pipeline
            .run(&Source::ALL, CollectionMode::Daily, now())
            .await
            .unwrap();

        assert_eq!(outcome.collection.stored, 0);
        assert!(outcome.analysis.analysis.is_empty());
        assert_eq!(outcome.analysis.snapshot.total_trends, 0);
        assert!(outcome.analysis.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_run_detects_multi_source_new_trends() {
        let mut manager = CollectorManager::new(&Config::default());
        manager.register(Arc::new(StaticCollector::new(
            Source::Etsy,
            vec![Observation::new("soy candle", Source::Etsy, 40.0, now() - Duration::hours(2))],
        )));
        manager.register(Arc::new(StaticCollector::new(
            Source::Reddit,
            vec![
                Observation::new("soy candle", Source::Reddit, 20.0, now() - Duration::hours(3)),
                Observation::new("lamp", Source::Reddit, 5.0, now() - Duration::hours(3)),
            ],
        )));

        let pipeline = pipeline(manager);
        let outcome = pipeline
            .run(&[Source::Etsy, Source::Reddit], CollectionMode::Daily, now())
            .await
            .unwrap();

        assert_eq!(outcome.collection.stored, 3);
        assert_eq!(outcome.analysis.baseline_date, None);
        assert_eq!(outcome.analysis.snapshot.total_trends, 3);

        let detection = &outcome.analysis.detection;
        assert_eq!(detection.summary.total_emerging_trends, 2);
        assert_eq!(detection.summary.cross_platform_trends, 1);
        assert!(detection
            .top_emerging_trends
            .iter()
            .all(|t| t.keyword == "soy candle" && t.growth_rate.is_none()));
        assert_eq!(outcome.analysis.suggestions.len(), 2);

        let saved = pipeline
            .repository()
            .latest_analysis(Some(CollectionMode::Daily))
            .unwrap()
            .unwrap();
        assert_eq!(
            saved.results["detection"]["summary"]["total_emerging_trends"],
            2
        );
    }

    #[tokio::test]
    async fn test_second_day_uses_previous_snapshot() {
        let yesterday = now() - Duration::days(1);
        let mut manager = CollectorManager::new(&Config::default());
        manager.register(Arc::new(StaticCollector::new(
            Source::Etsy,
            vec![Observation::new("tote bag", Source::Etsy, 5.0, yesterday - Duration::hours(1))],
        )));
        let pipeline = pipeline(manager);

        let first = pipeline
            .run(&[Source::Etsy], CollectionMode::Daily, yesterday)
            .await
            .unwrap();
        assert_eq!(first.analysis.detection.summary.total_emerging_trends, 0);

        pipeline
            .repository()
            .insert_batch(&[Observation::new(
                "tote bag",
                Source::Etsy,
                80.0,
                now() - Duration::hours(1),
            )])
            .unwrap();
        let outcome = pipeline.analyze(CollectionMode::Daily, now()).unwrap();

        assert_eq!(outcome.baseline_date, Some(yesterday.date_naive()));
        let emerging = &outcome.detection.top_emerging_trends;
        assert_eq!(emerging.len(), 1);
        assert_eq!(emerging[0].keyword, "tote bag");
        assert_eq!(emerging[0].emerging_score, 1.0);
        assert_eq!(emerging[0].growth_rate, Some(15.0));
    }

    #[test]
    fn test_out_of_range_lookback_is_an_error() {
        let mut config = Config::default();
        config.detector.lookback_days = u32::MAX;
        let pipeline = TrendPipeline::new(
            config.clone(),
            CollectorManager::new(&config),
            create_memory_repository(),
            Arc::new(HistoryManager::in_memory(30).unwrap()),
        );

        let err = pipeline.analyze(CollectionMode::Daily, now()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(CollectorManager::new(&Config::default()));
        let outcome = pipeline.analyze(CollectionMode::Weekly, now()).unwrap();

        let path = write_report(&outcome, dir.path()).unwrap();
        assert!(path.ends_with("analysis_weekly_20240710_120000.json"));
        assert!(std::fs::read_to_string(path).unwrap().contains("\"mode\": \"weekly\""));
    }
}
