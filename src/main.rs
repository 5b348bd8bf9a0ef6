use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trendscout::config::Config;
use trendscout::models::CollectionMode;

mod commands;

#[derive(Parser)]
#[command(
    name = "trendscout",
    version,
    about = "Multi-source product trend aggregation with emerging trend detection",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults apply when it does not exist)
    #[arg(short, long, global = true, default_value = "trendscout.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format; overrides the config file
    #[arg(long, global = true, value_parser = ["text", "json"])]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect observations from the configured sources
    Collect {
        /// Comma-separated sources (default: all enabled)
        #[arg(short, long)]
        sources: Option<String>,

        /// Collection window (daily, weekly)
        #[arg(short, long, default_value = "daily", value_parser = parse_mode)]
        mode: CollectionMode,
    },

    /// Analyze stored observations and detect emerging trends
    Analyze {
        #[arg(short, long, default_value = "daily", value_parser = parse_mode)]
        mode: CollectionMode,

        /// Directory for the JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Collect, then analyze
    Run {
        #[arg(short, long)]
        sources: Option<String>,

        #[arg(short, long, default_value = "daily", value_parser = parse_mode)]
        mode: CollectionMode,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show sources, storage and history status
    Status,

    /// Show stored emerging and multi-source trends
    History {
        /// Show the snapshot summary for one day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Days of emerging trends to list
        #[arg(long, default_value = "7")]
        emerging_days: i64,

        /// Minimum emerging score
        #[arg(long)]
        min_score: Option<f64>,
    },

    /// Remove data older than the retention window
    Cleanup {
        /// Retention in days, overrides the config file
        #[arg(long)]
        days: Option<u32>,
    },

    /// Serve the read-only trend API
    Serve {
        /// Bind address, overrides the config file
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run the pipeline offline on generated data
    Demo {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_mode(s: &str) -> std::result::Result<CollectionMode, String> {
    CollectionMode::parse(s).ok_or_else(|| format!("unknown mode '{s}' (expected daily or weekly)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        return init_config(&cli.config, force);
    }

    let config = Config::load(&cli.config)?;
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    if let Err(e) = trendscout::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
    }

    tracing::info!(config = %cli.config.display(), "trendscout starting");

    match cli.command {
        Commands::Collect { sources, mode } => {
            tracing::info!(sources = ?sources, %mode, "Starting collect command");
            commands::collect(config, sources, mode).await?;
        }
        Commands::Analyze { mode, output } => {
            tracing::info!(%mode, output = ?output, "Starting analyze command");
            commands::analyze(config, mode, output).await?;
        }
        Commands::Run {
            sources,
            mode,
            output,
        } => {
            tracing::info!(sources = ?sources, %mode, "Starting run command");
            commands::run(config, sources, mode, output).await?;
        }
        Commands::Status => commands::status(config).await?,
        Commands::History {
            date,
            emerging_days,
            min_score,
        } => {
            commands::history(config, date, emerging_days, min_score).await?;
        }
        Commands::Cleanup { days } => commands::cleanup(config, days).await?,
        Commands::Serve { bind } => commands::serve(config, bind).await?,
        Commands::Demo { output } => commands::demo(config, output).await?,
        Commands::InitConfig { .. } => unreachable!("handled before config loading"),
    }

    tracing::info!("trendscout completed successfully");
    Ok(())
}

fn init_config(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Config::write_default(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => tracing_subscriber::EnvFilter::new("trendscout=debug,info"),
        Err(_) => tracing_subscriber::EnvFilter::try_new(format!("trendscout={level},warn"))?,
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
