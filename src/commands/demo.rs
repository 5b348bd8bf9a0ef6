use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use trendscout::collectors::CollectorManager;
use trendscout::config::Config;
use trendscout::models::{CollectionMode, Source};
use trendscout::pipeline::{write_report, TrendPipeline};
use trendscout::storage::{create_memory_repository, HistoryManager};

use super::analyze::print_analysis;

/// Scale of yesterday's demo popularity relative to today
const BASELINE_SCALE: f64 = 0.4;

/// Offline run over generated data for every source
///
/// Two days are simulated in memory so today's run has a baseline to compare
/// against. Nothing touches the configured databases.
pub async fn demo(config: Config, output: Option<PathBuf>) -> Result<()> {
    let repository = create_memory_repository();
    let history = Arc::new(HistoryManager::in_memory(config.storage.retention_days)?);
    let mode = CollectionMode::Daily;

    let now = Utc::now();
    let yesterday = now - Duration::days(1);

    println!("Demo: simulating {} and {}", yesterday.date_naive(), now.date_naive());
    println!("==========================================");

    let baseline = TrendPipeline::new(
        config.clone(),
        CollectorManager::demo(&config, yesterday, BASELINE_SCALE),
        repository.clone(),
        history.clone(),
    );
    let first = baseline.run(&Source::ALL, mode, yesterday).await?;
    println!(
        "Baseline day: {} observations, {} platform trends",
        first.collection.set.total_items(),
        first.analysis.snapshot.total_trends
    );

    let today = TrendPipeline::new(
        config.clone(),
        CollectorManager::demo(&config, now, 1.0),
        repository,
        history,
    );
    let outcome = today.run(&Source::ALL, mode, now).await?;
    println!(
        "Today: {} observations, {} platform trends",
        outcome.collection.set.total_items(),
        outcome.analysis.snapshot.total_trends
    );

    print_analysis(&outcome.analysis, config.reporting.top_for(mode));

    if let Some(dir) = output {
        let path = write_report(&outcome.analysis, &dir)?;
        println!("\nReport written to {}", path.display());
    }
    Ok(())
}
