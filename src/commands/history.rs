use anyhow::Result;
use chrono::{Duration, NaiveDate, Utc};

use trendscout::collectors::CollectorManager;
use trendscout::config::{Config, MAX_WINDOW_DAYS};
use trendscout::storage::{create_sqlite_repository, HistoryManager};
use trendscout::utils::{extract_host, format_bytes};

/// Show sources, stored observations and trend history
pub async fn status(config: Config) -> Result<()> {
    let manager = CollectorManager::from_config(&config)?;
    let repository = create_sqlite_repository(&config.storage.sqlite_path)?;
    let history = HistoryManager::new(&config.storage.history_path, config.storage.retention_days)?;

    println!("Sources");
    println!("=======");
    for (source, status) in manager.collector_status() {
        let state = match (status.enabled, status.available) {
            (true, true) => match config.sources.get(source).endpoint.as_deref().map(extract_host) {
                Some(Ok(host)) => format!("ready ({host})"),
                _ => "ready".to_string(),
            },
            (true, false) => "enabled, no feed endpoint".to_string(),
            (false, _) => "disabled".to_string(),
        };
        println!("  {source:<14} {state}");
    }

    let stats = repository.stats(Utc::now())?;
    println!("\nObservations");
    println!("============");
    println!("  Total: {}  (last 24h: {})", stats.total, stats.last_24h);
    for (source, count) in &stats.per_source {
        println!("  {source:<14} {count}");
    }

    let history_stats = history.stats()?;
    println!("\nTrend history");
    println!("=============");
    println!(
        "  {} trends over {} days",
        history_stats.total_trends, history_stats.total_dates
    );
    if let (Some(first), Some(last)) = (history_stats.first_date, history_stats.last_date) {
        println!("  Range: {first} .. {last}");
    }
    println!("  Database size: {}", format_bytes(history_stats.database_size));

    if let Some(latest) = repository.latest_analysis(None)? {
        println!("\nLatest analysis: {} at {}", latest.mode, latest.created_at);
    }
    Ok(())
}

/// Print one day's snapshot summary, or stored emerging and multi-source
/// trends for the last `emerging_days`
pub async fn history(
    config: Config,
    date: Option<NaiveDate>,
    emerging_days: i64,
    min_score: Option<f64>,
) -> Result<()> {
    let history = HistoryManager::new(&config.storage.history_path, config.storage.retention_days)?;

    if let Some(date) = date {
        let summary = history.daily_summary(date)?;
        println!("Snapshot {date}");
        println!("{:-<40}", "");
        println!("  Trends:          {}", summary.total_trends);
        println!("  Emerging:        {}", summary.emerging_trends);
        println!("  High confidence: {}", summary.high_confidence_trends);
        for (platform, count) in &summary.platform_breakdown {
            println!("  {platform:<14} {count}");
        }
        return Ok(());
    }

    let end = Utc::now().date_naive();
    let start = end - Duration::days(emerging_days.clamp(1, i64::from(MAX_WINDOW_DAYS)) - 1);
    let min_score = min_score.unwrap_or(config.detector.min_emerging_score);

    println!("Emerging trends {start} .. {end} (score >= {min_score})");
    println!("{:-<60}", "");
    let emerging = history.emerging_trends(start, end, min_score)?;
    if emerging.is_empty() {
        println!("  none");
    }
    for trend in &emerging {
        println!(
            "  {}  {:<32} {:<14} {:.2}",
            trend.date, trend.keyword, trend.platform, trend.emerging_score
        );
    }

    println!("\nMulti-source trends");
    println!("{:-<60}", "");
    for trend in history.multi_source_trends(start, end, config.detector.min_sources)? {
        let platforms: Vec<&str> = trend.platforms.iter().map(|p| p.as_str()).collect();
        println!(
            "  {:<32} {} sources ({})  popularity {:.1}",
            trend.keyword,
            trend.source_count,
            platforms.join(", "),
            trend.avg_popularity
        );
    }
    Ok(())
}

/// Drop history and observations older than the retention window
pub async fn cleanup(config: Config, days: Option<u32>) -> Result<()> {
    let retention_days = days
        .unwrap_or(config.storage.retention_days)
        .clamp(1, MAX_WINDOW_DAYS);
    let repository = create_sqlite_repository(&config.storage.sqlite_path)?;
    let history = HistoryManager::new(&config.storage.history_path, retention_days)?;

    let now = Utc::now();
    let result = history.cleanup(now.date_naive())?;
    let purged = repository.purge_before(now - Duration::days(i64::from(retention_days)))?;

    println!("Removed data before {}", result.cutoff);
    println!("  Trend records: {}", result.trends_deleted);
    println!("  Snapshots:     {}", result.snapshots_deleted);
    println!("  Observations:  {purged}");
    Ok(())
}
