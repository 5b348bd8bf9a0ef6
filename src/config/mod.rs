//! Configuration management for trendscout
//!
//! Configuration is read from a TOML file, then selectively overridden from
//! environment variables. Every field has a default, so a partial file (or no
//! file at all) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::detector::DetectorConfig;
use crate::models::{CollectionMode, Source};

/// Upper bound for day-based windows (lookback, retention)
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-source collection settings
    pub sources: SourcesConfig,

    /// Keyword analysis settings
    pub analysis: AnalysisConfig,

    /// Emerging trend thresholds
    pub detector: DetectorConfig,

    /// How many trends each report mode surfaces
    pub reporting: ReportingConfig,

    /// HTTP collection behaviour
    pub collection: CollectionConfig,

    /// Database and file locations
    pub storage: StorageConfig,

    /// Read-only API server
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Settings for a single source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Whether the source takes part in collection runs
    pub enabled: bool,

    /// Feed URL returning normalized observations (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token sent to the feed (usually supplied through the environment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum items requested per run
    pub max_items: usize,

    /// Seed terms, subreddits or categories the source is asked about
    pub terms: Vec<String>,
}

impl SourceConfig {
    fn new(enabled: bool, max_items: usize, terms: &[&str]) -> Self {
        Self {
            enabled,
            endpoint: None,
            api_key: None,
            max_items,
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::new(false, 50, &[])
    }
}

/// One named settings block per known source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub google_trends: SourceConfig,
    pub reddit: SourceConfig,
    pub pinterest: SourceConfig,
    pub twitter: SourceConfig,
    pub amazon: SourceConfig,
    pub etsy: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, source: Source) -> &SourceConfig {
        match source {
            Source::GoogleTrends => &self.google_trends,
            Source::Reddit => &self.reddit,
            Source::Pinterest => &self.pinterest,
            Source::Twitter => &self.twitter,
            Source::Amazon => &self.amazon,
            Source::Etsy => &self.etsy,
        }
    }

    pub fn get_mut(&mut self, source: Source) -> &mut SourceConfig {
        match source {
            Source::GoogleTrends => &mut self.google_trends,
            Source::Reddit => &mut self.reddit,
            Source::Pinterest => &mut self.pinterest,
            Source::Twitter => &mut self.twitter,
            Source::Amazon => &mut self.amazon,
            Source::Etsy => &mut self.etsy,
        }
    }

    pub fn is_enabled(&self, source: Source) -> bool {
        self.get(source).enabled
    }

    pub fn enabled(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            google_trends: SourceConfig::new(
                true,
                100,
                &["personalized gifts", "home decor", "handmade jewelry"],
            ),
            reddit: SourceConfig::new(
                true,
                50,
                &[
                    "Etsy",
                    "EtsySellers",
                    "gifts",
                    "jewelry",
                    "homeimprovement",
                    "weddingplanning",
                    "crafts",
                ],
            ),
            pinterest: SourceConfig::new(
                true,
                100,
                &[
                    "etsy jewelry",
                    "etsy home decor",
                    "etsy gifts",
                    "handmade",
                    "personalized gifts",
                    "vintage",
                ],
            ),
            twitter: SourceConfig::new(false, 100, &["etsy", "handmade", "personalized gifts"]),
            amazon: SourceConfig::new(
                true,
                50,
                &[
                    "Home & Kitchen",
                    "Jewelry",
                    "Arts & Crafts",
                    "Beauty & Personal Care",
                    "Toys & Games",
                ],
            ),
            etsy: SourceConfig::new(
                true,
                100,
                &[
                    "jewelry", "home-decor", "clothing", "art", "crafts", "wedding", "vintage",
                    "toys",
                ],
            ),
        }
    }
}

/// A product category and the terms that indicate it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    pub terms: Vec<String>,
}

/// Built-in categories, in matching order
pub fn default_categories() -> Vec<CategoryDef> {
    let table: [(&str, &[&str]); 8] = [
        ("home_decor", &["home decor", "wall art", "candle", "mug", "pillow"]),
        ("jewelry", &["necklace", "ring", "bracelet", "earrings", "jewelry"]),
        ("gifts", &["gift", "personalized", "custom", "unique"]),
        ("pets", &["pet", "dog", "cat", "animal"]),
        ("wellness", &["soap", "candle", "beauty", "skincare"]),
        ("digital", &["digital", "printable", "download"]),
        ("vintage", &["vintage", "retro", "antique"]),
        ("crafts", &["craft", "diy", "handmade"]),
    ];

    table
        .iter()
        .map(|(name, terms)| CategoryDef {
            name: name.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}

/// Weights of the four scoring components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub frequency: f64,
    pub recency: f64,
    pub growth: f64,
    pub cross_platform: f64,
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.frequency + self.recency + self.growth + self.cross_platform
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            frequency: 0.3,
            recency: 0.3,
            growth: 0.2,
            cross_platform: 0.2,
        }
    }
}

/// Keyword analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum score for a keyword to count as an opportunity
    pub min_score: f64,

    /// Maximum trending keywords kept in an analysis
    pub max_trends: usize,

    /// Moving-average window for keyword series (in days)
    pub series_window: usize,

    /// Component weights for keyword scoring
    pub scoring: ScoringWeights,

    /// Product categories, matched in order
    pub categories: Vec<CategoryDef>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_score: 0.1,
            max_trends: 20,
            series_window: 7,
            scoring: ScoringWeights::default(),
            categories: default_categories(),
        }
    }
}

/// Number of trends surfaced per mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub daily_top: usize,
    pub weekly_top: usize,
}

impl ReportingConfig {
    pub fn top_for(&self, mode: CollectionMode) -> usize {
        match mode {
            CollectionMode::Daily => self.daily_top,
            CollectionMode::Weekly => self.weekly_top,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            daily_top: 5,
            weekly_top: 10,
        }
    }
}

/// HTTP collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retries per request for recoverable failures
    pub max_retries: u32,

    /// Base backoff delay in milliseconds
    pub retry_base_delay_ms: u64,

    /// Requests per second allowed against each source
    pub requests_per_second: u32,

    /// User agent string
    pub user_agent: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            requests_per_second: 2,
            user_agent: format!("trendscout/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database for raw observations and analysis results
    pub sqlite_path: PathBuf,

    /// SQLite database for daily trend snapshots
    pub history_path: PathBuf,

    /// Directory receiving raw JSON snapshots of each collection run
    pub raw_dir: PathBuf,

    /// Directory receiving analysis JSON written by `analyze`/`run`
    pub output_dir: PathBuf,

    /// Days of data to keep
    pub retention_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/trends.db"),
            history_path: PathBuf::from("data/trend_history.db"),
            raw_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("data/reports"),
            retention_days: 30,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: String::from("127.0.0.1:8080"),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when it exists (defaults otherwise), apply env overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected fields from `TRENDSCOUT_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TRENDSCOUT_SQLITE_PATH") {
            self.storage.sqlite_path = path.into();
        }
        if let Ok(path) = std::env::var("TRENDSCOUT_HISTORY_PATH") {
            self.storage.history_path = path.into();
        }
        if let Some(days) = env_parse::<u32>("TRENDSCOUT_RETENTION_DAYS") {
            self.storage.retention_days = days;
        }
        if let Some(timeout) = env_parse::<u64>("TRENDSCOUT_REQUEST_TIMEOUT") {
            self.collection.request_timeout_secs = timeout;
        }
        if let Ok(level) = std::env::var("TRENDSCOUT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TRENDSCOUT_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(addr) = std::env::var("TRENDSCOUT_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        for source in Source::ALL {
            let prefix = format!("TRENDSCOUT_{}", source.as_str().to_uppercase());
            let settings = self.sources.get_mut(source);
            if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
                settings.api_key = Some(key);
            }
            if let Ok(endpoint) = std::env::var(format!("{prefix}_ENDPOINT")) {
                settings.endpoint = Some(endpoint);
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let weights = &self.analysis.scoring;
        for (name, w) in [
            ("frequency", weights.frequency),
            ("recency", weights.recency),
            ("growth", weights.growth),
            ("cross_platform", weights.cross_platform),
        ] {
            if !w.is_finite() || w < 0.0 {
                anyhow::bail!("scoring weight {name} must be a non-negative number");
            }
        }
        if weights.sum() <= 0.0 {
            anyhow::bail!("scoring weights must not all be zero");
        }

        for (name, value) in [
            ("analysis.min_score", self.analysis.min_score),
            ("detector.min_emerging_score", self.detector.min_emerging_score),
            ("detector.min_confidence", self.detector.min_confidence),
            ("detector.new_trend_score", self.detector.new_trend_score),
            ("detector.high_confidence", self.detector.high_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be between 0 and 1, got {value}");
            }
        }

        if self.detector.min_sources == 0 {
            anyhow::bail!("detector.min_sources must be greater than 0");
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.detector.lookback_days) {
            anyhow::bail!("detector.lookback_days must be between 1 and {MAX_WINDOW_DAYS}");
        }
        if self.analysis.series_window < 2 {
            anyhow::bail!("analysis.series_window must be at least 2");
        }

        for category in &self.analysis.categories {
            if category.name.trim().is_empty() {
                anyhow::bail!("category names must not be empty");
            }
            if category.terms.is_empty() {
                anyhow::bail!("category {} has no terms", category.name);
            }
        }

        if !(1..=MAX_WINDOW_DAYS).contains(&self.storage.retention_days) {
            anyhow::bail!("storage.retention_days must be between 1 and {MAX_WINDOW_DAYS}");
        }
        if self.collection.request_timeout_secs == 0 {
            anyhow::bail!("collection.request_timeout_secs must be greater than 0");
        }
        if self.collection.requests_per_second == 0 {
            anyhow::bail!("collection.requests_per_second must be greater than 0");
        }

        for source in Source::ALL {
            if let Some(endpoint) = &self.sources.get(source).endpoint {
                url::Url::parse(endpoint)
                    .with_context(|| format!("Invalid endpoint for {source}: {endpoint}"))?;
            }
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.collection.request_timeout_secs)
    }

    /// Default configuration rendered as TOML
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")
    }

    /// Write the default configuration to `path`, creating parent directories
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(path, Self::default_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
