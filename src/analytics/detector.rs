//! Emerging trend detection
//!
//! Compares each keyword's popularity on a platform with its most recent stored
//! baseline, boosts confidence for keywords seen on several platforms, and turns
//! the result into reports and listing suggestions.
//!
//! # Emerging score
//!
//! ```text
//! previous <= 0:  min(0.8, current / 100)          (0 when current is 0 too)
//! otherwise:      clamp((current - previous) / (previous + 1) * ln(current + 1), 0, 1)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{PlatformTrend, Rating, Source};

/// Thresholds for emerging trend detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum emerging score for a trend with history
    pub min_emerging_score: f64,

    /// Minimum relative growth against the baseline
    pub min_growth_rate: f64,

    /// Platforms a keyword needs to count as multi-source
    pub min_sources: usize,

    /// How many days back a baseline snapshot may be
    pub lookback_days: u32,

    /// Minimum confidence for high-quality filtering
    pub min_confidence: f64,

    /// Score assigned to multi-source keywords without history
    pub new_trend_score: f64,

    /// Confidence above which a trend counts as high-confidence
    pub high_confidence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_emerging_score: 0.75,
            min_growth_rate: 0.2,
            min_sources: 2,
            lookback_days: 7,
            min_confidence: 0.6,
            new_trend_score: 0.7,
            high_confidence: 0.8,
        }
    }
}

/// A keyword aggregated across the platforms it appears on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossPlatformTrend {
    pub keyword: String,
    pub category: Option<String>,
    pub platforms: Vec<Source>,
    pub source_count: usize,
    pub avg_popularity: f64,
    pub avg_emerging: f64,
    pub max_emerging: f64,
    pub confidence_score: f64,
    pub trends: Vec<PlatformTrend>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_emerging_trends: usize,
    pub cross_platform_trends: usize,
    pub high_confidence_trends: usize,
    pub avg_emerging_score: f64,
}

/// Structured result of a detection run, ready for an external report renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub generated_at: DateTime<Utc>,
    pub summary: DetectionSummary,
    pub top_emerging_trends: Vec<PlatformTrend>,
    pub cross_platform_trends: Vec<CrossPlatformTrend>,
    pub platform_breakdown: BTreeMap<String, usize>,
    pub category_breakdown: BTreeMap<String, usize>,
}

/// Marketplace listing idea derived from an emerging trend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSuggestion {
    pub keyword: String,
    pub category: String,
    pub emerging_score: f64,
    pub confidence_score: f64,
    pub suggested_title: String,
    pub suggested_tags: Vec<String>,
    pub market_potential: Rating,
}

/// Every trend of a day scored against its baseline, plus the emerging subset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayAssessment {
    pub trends: Vec<PlatformTrend>,
    pub emerging: Vec<PlatformTrend>,
}

const REPORT_TOP: usize = 10;
const SUGGESTION_LIMIT: usize = 20;
const MAX_TAGS: usize = 10;

fn by_score_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Keep one record per (keyword, platform): the newest, later input winning ties
fn latest_by_key(trends: &[PlatformTrend]) -> HashMap<(String, Source), &PlatformTrend> {
    let mut latest: HashMap<(String, Source), &PlatformTrend> = HashMap::new();
    for trend in trends {
        let key = (trend.keyword.clone(), trend.platform);
        match latest.get(&key) {
            Some(existing) if existing.timestamp > trend.timestamp => {}
            _ => {
                latest.insert(key, trend);
            }
        }
    }
    latest
}

fn title_case(keyword: &str) -> String {
    keyword
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, Clone, Default)]
pub struct EmergingTrendDetector {
    config: DetectorConfig,
}

impl EmergingTrendDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Emerging score in [0.0, 1.0] for a popularity change
    pub fn emerging_score(&self, current: f64, previous: f64) -> f64 {
        if previous <= 0.0 {
            return if current > 0.0 {
                (current / 100.0).min(0.8)
            } else {
                0.0
            };
        }

        let growth = (current - previous) / (previous + 1.0);
        let score = growth * (current + 1.0).ln();
        if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        }
    }

    /// Score every current record against its baseline and flag the emerging ones
    ///
    /// Records without a baseline get `new_trend_score` when the keyword appears on at
    /// least `min_sources` platforms today and 0 otherwise; their growth is `None`.
    fn evaluate(
        &self,
        current: &[PlatformTrend],
        historical: &[PlatformTrend],
    ) -> Vec<(PlatformTrend, bool)> {
        let current_by_key = latest_by_key(current);
        let baseline = latest_by_key(historical);

        let mut platforms_per_keyword: HashMap<&str, BTreeSet<Source>> = HashMap::new();
        for (keyword, platform) in current_by_key.keys() {
            platforms_per_keyword
                .entry(keyword.as_str())
                .or_default()
                .insert(*platform);
        }

        let mut evaluated: Vec<(PlatformTrend, bool)> = current_by_key
            .iter()
            .map(|(key, trend)| {
                let mut trend = (*trend).clone();
                let emerging = match baseline.get(key) {
                    Some(previous) => {
                        let before = previous.popularity_score;
                        let score = self.emerging_score(trend.popularity_score, before);
                        let growth = (trend.popularity_score - before) / before.max(1.0);
                        trend.emerging_score = score;
                        trend.growth_rate = Some(growth);
                        score >= self.config.min_emerging_score
                            && growth >= self.config.min_growth_rate
                    }
                    None => {
                        let platforms = platforms_per_keyword
                            .get(trend.keyword.as_str())
                            .map_or(0, BTreeSet::len);
                        let multi_source = platforms >= self.config.min_sources;
                        trend.emerging_score = if multi_source {
                            self.config.new_trend_score
                        } else {
                            0.0
                        };
                        trend.growth_rate = None;
                        multi_source
                    }
                };
                (trend, emerging)
            })
            .collect();

        evaluated.sort_by(|(a, _), (b, _)| {
            by_score_desc(a.emerging_score, b.emerging_score)
                .then_with(|| a.keyword.cmp(&b.keyword))
                .then_with(|| a.platform.cmp(&b.platform))
        });
        evaluated
    }

    /// Emerging trends among `current`, highest emerging score first
    pub fn detect(
        &self,
        current: &[PlatformTrend],
        historical: &[PlatformTrend],
    ) -> Vec<PlatformTrend> {
        self.evaluate(current, historical)
            .into_iter()
            .filter_map(|(trend, emerging)| emerging.then_some(trend))
            .collect()
    }

    /// Score a whole day: all trends carry emerging and confidence scores, and the
    /// emerging subset is returned separately
    pub fn assess_day(
        &self,
        current: &[PlatformTrend],
        historical: &[PlatformTrend],
    ) -> DayAssessment {
        let evaluated = self.evaluate(current, historical);
        let flags: Vec<bool> = evaluated.iter().map(|(_, emerging)| *emerging).collect();
        let mut trends: Vec<PlatformTrend> = evaluated.into_iter().map(|(t, _)| t).collect();

        self.apply_confidence(&mut trends);

        let emerging = trends
            .iter()
            .zip(flags)
            .filter_map(|(trend, emerging)| emerging.then(|| trend.clone()))
            .collect();

        DayAssessment { trends, emerging }
    }

    /// Set confidence, source count and source list on every record, per keyword
    ///
    /// `confidence = min(1, platforms/4 + max_emerging*0.3 + min(0.2, max_popularity/100))`
    pub fn apply_confidence(&self, trends: &mut [PlatformTrend]) {
        struct KeywordStats {
            platforms: BTreeSet<Source>,
            max_emerging: f64,
            max_popularity: f64,
        }

        let mut stats: HashMap<String, KeywordStats> = HashMap::new();
        for trend in trends.iter() {
            let entry = stats.entry(trend.keyword.clone()).or_insert(KeywordStats {
                platforms: BTreeSet::new(),
                max_emerging: 0.0,
                max_popularity: 0.0,
            });
            entry.platforms.insert(trend.platform);
            entry.max_emerging = entry.max_emerging.max(trend.emerging_score);
            entry.max_popularity = entry.max_popularity.max(trend.popularity_score);
        }

        for trend in trends.iter_mut() {
            let Some(s) = stats.get(&trend.keyword) else {
                continue;
            };
            let base = (s.platforms.len() as f64 / 4.0).min(1.0);
            let emerging_boost = s.max_emerging * 0.3;
            let popularity_boost = (s.max_popularity / 100.0).min(0.2);

            trend.confidence_score = (base + emerging_boost + popularity_boost).min(1.0);
            trend.source_count = s.platforms.len();
            trend.sources = s.platforms.iter().copied().collect();
        }
    }

    /// Keywords present on at least `min_sources` distinct platforms
    pub fn cross_platform(
        &self,
        trends: &[PlatformTrend],
        min_sources: usize,
    ) -> Vec<CrossPlatformTrend> {
        let mut by_keyword: BTreeMap<&str, Vec<&PlatformTrend>> = BTreeMap::new();
        for trend in trends {
            by_keyword.entry(trend.keyword.as_str()).or_default().push(trend);
        }

        let mut result: Vec<CrossPlatformTrend> = by_keyword
            .into_iter()
            .filter_map(|(keyword, group)| {
                let platforms: BTreeSet<Source> = group.iter().map(|t| t.platform).collect();
                if platforms.len() < min_sources {
                    return None;
                }

                let avg_popularity = mean(group.iter().map(|t| t.popularity_score));
                let avg_emerging = mean(group.iter().map(|t| t.emerging_score));
                let max_emerging = group
                    .iter()
                    .map(|t| t.emerging_score)
                    .fold(0.0_f64, f64::max);
                let confidence_score =
                    (platforms.len() as f64 / 4.0 + max_emerging * 0.3).min(1.0);

                Some(CrossPlatformTrend {
                    keyword: keyword.to_string(),
                    category: group.iter().find_map(|t| t.category.clone()),
                    source_count: platforms.len(),
                    platforms: platforms.into_iter().collect(),
                    avg_popularity,
                    avg_emerging,
                    max_emerging,
                    confidence_score,
                    trends: group.into_iter().cloned().collect(),
                })
            })
            .collect();

        result.sort_by(|a, b| {
            by_score_desc(a.confidence_score, b.confidence_score)
                .then_with(|| by_score_desc(a.max_emerging, b.max_emerging))
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        result
    }

    /// Trends meeting both the emerging and confidence thresholds
    ///
    /// `min_emerging` defaults to the configured `min_emerging_score`.
    pub fn filter_high_quality(
        &self,
        trends: &[PlatformTrend],
        min_emerging: Option<f64>,
        min_confidence: Option<f64>,
    ) -> Vec<PlatformTrend> {
        let min_emerging = min_emerging.unwrap_or(self.config.min_emerging_score);
        let min_confidence = min_confidence.unwrap_or(self.config.min_confidence);

        trends
            .iter()
            .filter(|t| t.emerging_score >= min_emerging && t.confidence_score >= min_confidence)
            .cloned()
            .collect()
    }

    pub fn report(
        &self,
        emerging: &[PlatformTrend],
        cross_platform: &[CrossPlatformTrend],
        generated_at: DateTime<Utc>,
    ) -> DetectionReport {
        let mut platform_breakdown = BTreeMap::new();
        let mut category_breakdown = BTreeMap::new();
        for trend in emerging {
            *platform_breakdown
                .entry(trend.platform.as_str().to_string())
                .or_insert(0) += 1;
            let category = trend
                .category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string());
            *category_breakdown.entry(category).or_insert(0) += 1;
        }

        DetectionReport {
            generated_at,
            summary: DetectionSummary {
                total_emerging_trends: emerging.len(),
                cross_platform_trends: cross_platform.len(),
                high_confidence_trends: emerging
                    .iter()
                    .filter(|t| t.confidence_score > self.config.high_confidence)
                    .count(),
                avg_emerging_score: mean(emerging.iter().map(|t| t.emerging_score)),
            },
            top_emerging_trends: emerging.iter().take(REPORT_TOP).cloned().collect(),
            cross_platform_trends: cross_platform.iter().take(REPORT_TOP).cloned().collect(),
            platform_breakdown,
            category_breakdown,
        }
    }

    /// Listing ideas for the top emerging trends
    pub fn suggest_listings(&self, emerging: &[PlatformTrend]) -> Vec<ListingSuggestion> {
        emerging
            .iter()
            .take(SUGGESTION_LIMIT)
            .map(|trend| {
                let category = trend
                    .category
                    .clone()
                    .unwrap_or_else(|| "general".to_string());

                let mut tags: Vec<String> = vec![
                    trend.keyword.to_lowercase(),
                    "handmade".into(),
                    "personalized".into(),
                    "custom".into(),
                    category.to_lowercase(),
                    "etsy".into(),
                    "trending".into(),
                ];
                let extra: &[&str] = match category.as_str() {
                    "jewelry" => &["necklace", "bracelet", "ring", "earrings"],
                    "home_decor" => &["wall art", "home decor", "interior design"],
                    "gifts" => &["gift", "present", "special occasion"],
                    _ => &[],
                };
                tags.extend(extra.iter().map(|t| t.to_string()));
                tags.truncate(MAX_TAGS);

                let combined = (trend.emerging_score + trend.confidence_score) / 2.0;
                let market_potential = if combined > 0.8 {
                    Rating::High
                } else if combined > 0.6 {
                    Rating::Medium
                } else {
                    Rating::Low
                };

                ListingSuggestion {
                    keyword: trend.keyword.clone(),
                    suggested_title: format!(
                        "Personalized {} - Handmade Custom Design",
                        title_case(&trend.keyword)
                    ),
                    category,
                    emerging_score: trend.emerging_score,
                    confidence_score: trend.confidence_score,
                    suggested_tags: tags,
                    market_potential,
                }
            })
            .collect()
    }
}
