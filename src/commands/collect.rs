use anyhow::Result;
use chrono::Utc;

use trendscout::collectors::parse_sources;
use trendscout::config::Config;
use trendscout::models::{CollectionMode, Source};
use trendscout::pipeline::{CollectionOutcome, TrendPipeline};

/// Resolve `--sources` against the config's enabled sources
pub fn resolve_sources(config: &Config, sources: Option<&str>) -> Result<Vec<Source>> {
    match sources {
        Some(spec) => Ok(parse_sources(spec)?),
        None => Ok(config.sources.enabled()),
    }
}

pub async fn collect(config: Config, sources: Option<String>, mode: CollectionMode) -> Result<()> {
    let sources = resolve_sources(&config, sources.as_deref())?;
    let pipeline = TrendPipeline::open(config)?;

    println!("Collecting {mode} trends");
    println!("========================");

    let outcome = pipeline.collect(&sources, mode, Utc::now()).await?;
    print_collection(&outcome);
    Ok(())
}

pub fn print_collection(outcome: &CollectionOutcome) {
    let set = &outcome.set;
    println!("\nRun {}", set.run_id);
    for (source, report) in &set.per_source {
        match &report.error {
            Some(error) => println!("  {source:<14} FAILED  {error}"),
            None => println!(
                "  {source:<14} {:>5} items ({} rejected)",
                report.count, report.rejected
            ),
        }
    }
    println!(
        "\nCollected {} observations, {} new in storage",
        set.total_items(),
        outcome.stored
    );
    if let Some(path) = &outcome.raw_snapshot {
        println!("Raw snapshot: {}", path.display());
    }
}
