// Core data structures for trendscout

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::analytics::keyword_trends::Momentum;

/// External source an observation was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    GoogleTrends,
    Reddit,
    Pinterest,
    Twitter,
    Amazon,
    Etsy,
}

impl Source {
    /// Every known source, in display order
    pub const ALL: [Source; 6] = [
        Self::GoogleTrends,
        Self::Reddit,
        Self::Pinterest,
        Self::Twitter,
        Self::Amazon,
        Self::Etsy,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleTrends => "google_trends",
            Self::Reddit => "reddit",
            Self::Pinterest => "pinterest",
            Self::Twitter => "twitter",
            Self::Amazon => "amazon",
            Self::Etsy => "etsy",
        }
    }

    /// Create from string (case-insensitive, accepts a few aliases)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "google_trends" | "google" | "googletrends" => Some(Self::GoogleTrends),
            "reddit" => Some(Self::Reddit),
            "pinterest" => Some(Self::Pinterest),
            "twitter" | "x" => Some(Self::Twitter),
            "amazon" => Some(Self::Amazon),
            "etsy" => Some(Self::Etsy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Collection window: daily looks back one day, weekly one week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    #[default]
    Daily,
    Weekly,
}

impl CollectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Some(Self::Daily),
            "weekly" | "week" => Some(Self::Weekly),
            _ => None,
        }
    }

    /// Hours of data considered by this mode
    pub fn lookback_hours(&self) -> i64 {
        match self {
            Self::Daily => 24,
            Self::Weekly => 168,
        }
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(self.lookback_hours())
    }
}

impl std::fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reason an observation was rejected before storage
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidObservation {
    EmptyKeyword,
    BadMetric(f64),
}

impl std::fmt::Display for InvalidObservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyKeyword => write!(f, "empty keyword"),
            Self::BadMetric(v) => write!(f, "metric value {v} is not a finite non-negative number"),
        }
    }
}

/// One normalized data point: a keyword seen on a source with some magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub keyword: String,
    pub source: Source,
    pub metric_value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Observation {
    /// Create a new observation with a normalized keyword
    pub fn new(
        keyword: &str,
        source: Source,
        metric_value: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            source,
            metric_value,
            timestamp,
            text: None,
            category: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Stable identity used for deduplication: SHA256 of source, keyword and timestamp
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.keyword.as_bytes());
        hasher.update(b"|");
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..32].to_string()
    }

    /// Check the record is usable for analysis
    pub fn validate(&self) -> Result<(), InvalidObservation> {
        if self.keyword.trim().is_empty() {
            return Err(InvalidObservation::EmptyKeyword);
        }
        if !self.metric_value.is_finite() || self.metric_value < 0.0 {
            return Err(InvalidObservation::BadMetric(self.metric_value));
        }
        Ok(())
    }

    /// Keyword and context text joined, lowercased, for substring matching
    pub fn searchable_text(&self) -> String {
        match &self.text {
            Some(text) => format!("{} {}", self.keyword, text.to_lowercase()),
            None => self.keyword.clone(),
        }
    }
}

/// Normalize a keyword: trim, lowercase, collapse inner whitespace
pub fn normalize_keyword(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Outcome of one collector within a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceReport {
    pub count: usize,
    pub rejected: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything one collection run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSet {
    pub run_id: Uuid,
    pub mode: CollectionMode,
    pub collected_at: DateTime<Utc>,
    pub observations: Vec<Observation>,
    pub per_source: BTreeMap<Source, SourceReport>,
}

impl ObservationSet {
    pub fn new(mode: CollectionMode, collected_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            collected_at,
            observations: Vec::new(),
            per_source: BTreeMap::new(),
        }
    }

    pub fn total_items(&self) -> usize {
        self.observations.len()
    }

    /// Sources that returned an error during this run
    pub fn failed_sources(&self) -> Vec<Source> {
        self.per_source
            .iter()
            .filter(|(_, report)| report.error.is_some())
            .map(|(source, _)| *source)
            .collect()
    }
}

/// Coarse three-level assessment used for market potential and competition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        write!(f, "{label}")
    }
}

/// A keyword's standing on one platform for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTrend {
    pub keyword: String,
    pub category: Option<String>,
    pub platform: Source,
    pub popularity_score: f64,
    pub emerging_score: f64,
    pub confidence_score: f64,
    /// Relative growth against the previous snapshot; `None` when there was no baseline
    pub growth_rate: Option<f64>,
    pub source_count: usize,
    pub sources: Vec<Source>,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
}

impl PlatformTrend {
    pub fn new(
        keyword: &str,
        platform: Source,
        popularity_score: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            keyword: normalize_keyword(keyword),
            category: None,
            platform,
            popularity_score,
            emerging_score: 0.0,
            confidence_score: 0.0,
            growth_rate: None,
            source_count: 1,
            sources: vec![platform],
            timestamp,
            date: timestamp.date_naive(),
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }
}

/// A scored keyword together with the observations behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRecord {
    pub keyword: String,
    pub category: Option<String>,
    pub score: f64,
    pub momentum: Option<Momentum>,
    pub history: Vec<Observation>,
}
