//! End-to-end tests: collect → store → analyze → detect

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use trendscout::collectors::{CollectorManager, StaticCollector};
use trendscout::config::Config;
use trendscout::models::{CollectionMode, Source};
use trendscout::pipeline::TrendPipeline;
use trendscout::storage::{create_memory_repository, create_sqlite_repository, HistoryManager};

use common::{manager_with, memory_pipeline, now, observation};

/// Two simulated demo days sharing one set of stores
fn demo_days(config: &Config) -> (TrendPipeline, TrendPipeline) {
    let repository = create_memory_repository();
    let history = Arc::new(HistoryManager::in_memory(30).unwrap());
    let yesterday = now() - Duration::days(1);

    let first = TrendPipeline::new(
        config.clone(),
        CollectorManager::demo(config, yesterday, 0.4),
        repository.clone(),
        history.clone(),
    );
    let second = TrendPipeline::new(
        config.clone(),
        CollectorManager::demo(config, now(), 1.0),
        repository,
        history,
    );
    (first, second)
}

#[tokio::test]
async fn test_demo_days_detect_growth_against_baseline() {
    let config = Config::default();
    let (first, second) = demo_days(&config);
    let yesterday = now() - Duration::days(1);

    let day_one = first
        .run(&Source::ALL, CollectionMode::Daily, yesterday)
        .await
        .unwrap();
    assert_eq!(day_one.analysis.baseline_date, None);
    // twitter is disabled by default
    assert!(!day_one.collection.set.per_source.contains_key(&Source::Twitter));
    assert_eq!(day_one.analysis.snapshot.total_trends, 27);

    let day_two = second
        .run(&Source::ALL, CollectionMode::Daily, now())
        .await
        .unwrap();
    let analysis = &day_two.analysis;

    assert_eq!(analysis.baseline_date, Some(yesterday.date_naive()));
    assert_eq!(analysis.snapshot.total_trends, 27);
    assert_eq!(analysis.detection.summary.total_emerging_trends, 27);
    assert_eq!(analysis.detection.cross_platform_trends.len(), 8);
    assert!(analysis
        .detection
        .top_emerging_trends
        .iter()
        .all(|t| t.growth_rate.is_some_and(|g| g > 1.4) && t.emerging_score == 1.0));

    // only today's window is analyzed
    assert_eq!(
        analysis.analysis.total_items_analyzed,
        day_two.collection.set.total_items()
    );
    assert!(!analysis.analysis.trending_keywords.is_empty());
    assert!(!analysis.suggestions.is_empty());
    assert!(analysis.records.len() <= config.reporting.top_for(CollectionMode::Daily));

    let multi = second
        .history()
        .multi_source_trends(yesterday.date_naive(), now().date_naive(), 3)
        .unwrap();
    assert_eq!(multi.len(), 8);
}

#[tokio::test]
async fn test_weekly_window_spans_both_days() {
    let config = Config::default();
    let (first, second) = demo_days(&config);

    let day_one = first
        .collect(&Source::ALL, CollectionMode::Daily, now() - Duration::days(1))
        .await
        .unwrap();
    let day_two = second
        .collect(&Source::ALL, CollectionMode::Daily, now())
        .await
        .unwrap();

    let weekly = second.analyze(CollectionMode::Weekly, now()).unwrap();
    assert_eq!(
        weekly.analysis.total_items_analyzed,
        day_one.stored + day_two.stored
    );
    assert_eq!(weekly.analysis.mode, CollectionMode::Weekly);
}

#[tokio::test]
async fn test_failing_and_slow_collectors_are_isolated() {
    let config = Config::default();
    let mut manager = manager_with(
        &config,
        vec![(
            Source::Etsy,
            vec![
                observation("soy candle", Source::Etsy, 40.0, now(), 2),
                observation("", Source::Etsy, 10.0, now(), 2),
            ],
        )],
    )
    .with_timeout(StdDuration::from_millis(100));
    manager.register(Arc::new(StaticCollector::failing(Source::Reddit, 503)));
    manager.register(Arc::new(
        StaticCollector::demo(Source::Amazon, now()).with_delay(StdDuration::from_secs(5)),
    ));

    let pipeline = memory_pipeline(config, manager);
    let outcome = pipeline
        .run(
            &[Source::Etsy, Source::Reddit, Source::Amazon],
            CollectionMode::Daily,
            now(),
        )
        .await
        .unwrap();

    let set = &outcome.collection.set;
    assert_eq!(set.total_items(), 1);
    assert_eq!(set.per_source[&Source::Etsy].rejected, 1);
    assert_eq!(set.failed_sources(), vec![Source::Reddit, Source::Amazon]);
    assert!(set.per_source[&Source::Amazon]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("timed out")));

    // a single-platform keyword with no history is not emerging
    assert_eq!(outcome.analysis.detection.summary.total_emerging_trends, 0);
    assert_eq!(outcome.analysis.snapshot.total_trends, 1);
}

#[tokio::test]
async fn test_rerun_same_day_replaces_snapshot() {
    let config = Config::default();
    let manager = CollectorManager::demo(&config, now(), 1.0);
    let pipeline = memory_pipeline(config, manager);

    let first = pipeline
        .run(&[Source::Etsy, Source::Reddit], CollectionMode::Daily, now())
        .await
        .unwrap();
    let second = pipeline
        .run(&[Source::Etsy, Source::Reddit], CollectionMode::Daily, now())
        .await
        .unwrap();

    assert!(first.collection.stored > 0);
    assert_eq!(second.collection.stored, 0);
    assert_eq!(
        first.analysis.snapshot.total_trends,
        second.analysis.snapshot.total_trends
    );
    assert_eq!(
        pipeline.history().stats().unwrap().total_trends,
        second.analysis.snapshot.total_trends
    );
}

#[tokio::test]
async fn test_sqlite_stores_persist_between_pipelines() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.sqlite_path = dir.path().join("observations.db");
    config.storage.history_path = dir.path().join("history.db");

    {
        let repository = create_sqlite_repository(&config.storage.sqlite_path).unwrap();
        let history = Arc::new(
            HistoryManager::new(&config.storage.history_path, config.storage.retention_days).unwrap(),
        );
        let pipeline = TrendPipeline::new(
            config.clone(),
            CollectorManager::demo(&config, now(), 1.0),
            repository,
            history,
        )
        .with_raw_dir(dir.path().join("raw"));

        let outcome = pipeline
            .run(&Source::ALL, CollectionMode::Daily, now())
            .await
            .unwrap();
        let raw = outcome.collection.raw_snapshot.unwrap();
        assert!(raw.exists());
    }

    let repository = create_sqlite_repository(&config.storage.sqlite_path).unwrap();
    let history =
        HistoryManager::new(&config.storage.history_path, config.storage.retention_days).unwrap();

    assert!(repository.count().unwrap() > 0);
    let saved = repository
        .latest_analysis(Some(CollectionMode::Daily))
        .unwrap()
        .unwrap();
    assert_eq!(saved.mode, CollectionMode::Daily);
    assert_eq!(history.stats().unwrap().total_dates, 1);
}
