//! Trend analytics: keyword extraction, classification, scoring, time series
//! and emerging-trend detection

pub mod analyzer;
pub mod classifier;
pub mod detector;
pub mod keyword_trends;
pub mod keywords;
pub mod scoring;

pub use analyzer::{AnalysisReport, AnalysisSummary, Opportunity, ScoredKeyword, TrendAnalyzer};
pub use classifier::CategoryClassifier;
pub use detector::{
    CrossPlatformTrend, DayAssessment, DetectionReport, DetectionSummary, DetectorConfig,
    EmergingTrendDetector, ListingSuggestion,
};
pub use keyword_trends::{
    DataPoint, KeywordTrend, Momentum, SeriesIndex, Spike, TrendDirection, TrendError,
    TrendResult,
};
pub use keywords::{extract_keywords, jaccard_similarity, tokenize};
pub use scoring::{ScoreBreakdown, ScoringEngine};
