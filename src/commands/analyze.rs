use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;

use trendscout::config::Config;
use trendscout::models::CollectionMode;
use trendscout::pipeline::{write_report, AnalysisOutcome, TrendPipeline};
use trendscout::utils::truncate_text;

use super::collect::{print_collection, resolve_sources};

pub async fn analyze(config: Config, mode: CollectionMode, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.storage.output_dir.clone());
    let pipeline = TrendPipeline::open(config)?;

    let outcome = pipeline.analyze(mode, Utc::now())?;
    print_analysis(&outcome, pipeline.config().reporting.top_for(mode));

    let path = write_report(&outcome, &output)?;
    println!("\nReport written to {}", path.display());
    Ok(())
}

/// Collect and analyze in one pass
pub async fn run(
    config: Config,
    sources: Option<String>,
    mode: CollectionMode,
    output: Option<PathBuf>,
) -> Result<()> {
    let sources = resolve_sources(&config, sources.as_deref())?;
    let output = output.unwrap_or_else(|| config.storage.output_dir.clone());
    let pipeline = TrendPipeline::open(config)?;

    let outcome = pipeline.run(&sources, mode, Utc::now()).await?;
    print_collection(&outcome.collection);
    print_analysis(&outcome.analysis, pipeline.config().reporting.top_for(mode));

    let path = write_report(&outcome.analysis, &output)?;
    println!("\nReport written to {}", path.display());
    Ok(())
}

pub fn print_analysis(outcome: &AnalysisOutcome, top: usize) {
    let analysis = &outcome.analysis;
    println!("\n{} trend analysis", analysis.mode);
    println!("{:-<60}", "");

    if analysis.is_empty() {
        println!("No observations in the {} window", analysis.mode);
    } else {
        println!(
            "{} observations from {} sources",
            analysis.total_items_analyzed,
            analysis.data_sources_analyzed.len()
        );
        println!("\nTop keywords:");
        for (rank, kw) in analysis.trending_keywords.iter().take(top).enumerate() {
            println!(
                "  {:>2}. {:<32} score {:>6.3}  freq {:>3}  {}",
                rank + 1,
                truncate_text(&kw.keyword, 32),
                kw.score,
                kw.frequency,
                kw.category.as_deref().unwrap_or("-")
            );
        }
        if !analysis.summary.top_categories.is_empty() {
            println!("\nTop categories: {}", analysis.summary.top_categories.join(", "));
        }
        println!(
            "High-potential opportunities: {}",
            analysis.summary.high_potential_opportunities
        );
    }

    let detection = &outcome.detection;
    match outcome.baseline_date {
        Some(date) => println!("\nEmerging trends (baseline {date}):"),
        None => println!("\nEmerging trends (no baseline, multi-source only):"),
    }
    for trend in &detection.top_emerging_trends {
        let growth = trend
            .growth_rate
            .map_or_else(|| "new".to_string(), |g| format!("{:+.0}%", g * 100.0));
        println!(
            "  {:<32} {:<14} emerging {:.2}  confidence {:.2}  {}",
            truncate_text(&trend.keyword, 32),
            trend.platform,
            trend.emerging_score,
            trend.confidence_score,
            growth
        );
    }
    println!(
        "Total {} emerging, {} cross-platform, {} high-confidence",
        detection.summary.total_emerging_trends,
        detection.summary.cross_platform_trends,
        detection.summary.high_confidence_trends
    );

    if !outcome.suggestions.is_empty() {
        println!("\nListing ideas:");
        for suggestion in outcome.suggestions.iter().take(5) {
            println!(
                "  {} [{}] tags: {}",
                suggestion.suggested_title,
                suggestion.market_potential,
                suggestion.suggested_tags.join(", ")
            );
        }
    }
}
