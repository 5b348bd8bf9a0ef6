//! Keyword analysis over a window of observations
//!
//! Extracts candidate keywords, classifies and scores them, and turns the best
//! into product opportunities. Also projects observations onto per-platform
//! trends for the emerging-trend detector.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classifier::CategoryClassifier;
use super::keyword_trends::KeywordTrend;
use super::keywords::extract_keywords;
use super::scoring::{mentions, ScoringEngine};
use crate::config::AnalysisConfig;
use crate::models::{CollectionMode, Observation, PlatformTrend, Rating, Source, TrendRecord};
use crate::storage::ObservationRepository;

/// Keywords considered for categorization
const CATEGORIZE_LIMIT: usize = 100;

/// Keywords scored per analysis
const SCORE_LIMIT: usize = 50;

/// Scored keywords considered as opportunities
const OPPORTUNITY_LIMIT: usize = 20;

const MAX_SUGGESTED_TAGS: usize = 5;

const SUMMARY_TOP: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredKeyword {
    pub keyword: String,
    pub frequency: usize,
    pub score: f64,
    pub category: Option<String>,
    pub sources: Vec<Source>,
}

/// A scored keyword worth acting on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub keyword: String,
    pub category: Option<String>,
    pub score: f64,
    pub frequency: usize,
    pub sources: Vec<Source>,
    pub suggested_tags: Vec<String>,
    pub market_potential: Rating,
    pub competition_level: Rating,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_trends_analyzed: usize,
    pub high_potential_opportunities: usize,
    pub top_categories: Vec<String>,
    pub trending_sources: Vec<Source>,
}

/// Result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: CollectionMode,
    pub analysis_timestamp: DateTime<Utc>,
    pub data_sources_analyzed: Vec<Source>,
    pub total_items_analyzed: usize,
    pub trending_keywords: Vec<ScoredKeyword>,
    pub categorized_trends: BTreeMap<String, Vec<String>>,
    pub opportunities: Vec<Opportunity>,
    pub summary: AnalysisSummary,
}

impl AnalysisReport {
    pub fn empty(mode: CollectionMode, now: DateTime<Utc>) -> Self {
        Self {
            mode,
            analysis_timestamp: now,
            data_sources_analyzed: Vec::new(),
            total_items_analyzed: 0,
            trending_keywords: Vec::new(),
            categorized_trends: BTreeMap::new(),
            opportunities: Vec::new(),
            summary: AnalysisSummary::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_items_analyzed == 0
    }
}

/// Counts in first-seen order, then sorted by count descending (stable)
fn most_common(keywords: &[String]) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for keyword in keywords {
        match index.get(keyword.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(keyword.as_str(), counts.len());
                counts.push((keyword.clone(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn sources_mentioning(keyword: &str, observations: &[Observation]) -> Vec<Source> {
    mentions(keyword, observations)
        .into_iter()
        .map(|obs| obs.source)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Listing tags for a keyword: the keyword itself plus a few themed extras
fn suggested_tags(keyword: &str) -> Vec<String> {
    let extras: &[&str] = if keyword.contains("jewelry") || keyword.contains("necklace") {
        &["handmade", "personalized", "gift"]
    } else if keyword.contains("home") || keyword.contains("decor") {
        &["handmade", "unique", "artisan"]
    } else if keyword.contains("gift") {
        &["personalized", "custom", "unique"]
    } else {
        &[]
    };

    let mut tags = vec![keyword.to_string()];
    tags.extend(extras.iter().map(|t| t.to_string()));
    tags.truncate(MAX_SUGGESTED_TAGS);
    tags
}

fn market_potential(score: f64, frequency: usize) -> Rating {
    if score > 0.8 && frequency > 50 {
        Rating::High
    } else if score > 0.5 && frequency > 20 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

fn competition_level(frequency: usize) -> Rating {
    if frequency > 100 {
        Rating::High
    } else if frequency > 50 {
        Rating::Medium
    } else {
        Rating::Low
    }
}

/// Keys ranked by summed score, highest first; equal sums keep key order
fn top_by_score<K: Ord + Clone>(scores: BTreeMap<K, f64>, limit: usize) -> Vec<K> {
    let mut ranked: Vec<(K, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.into_iter().take(limit).map(|(k, _)| k).collect()
}

/// Classifies, scores and summarizes observation windows
pub struct TrendAnalyzer {
    classifier: CategoryClassifier,
    scoring: ScoringEngine,
    min_score: f64,
    max_trends: usize,
    series_window: usize,
}

impl TrendAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            classifier: CategoryClassifier::new(&config.categories),
            scoring: ScoringEngine::new(config.scoring),
            min_score: config.min_score,
            max_trends: config.max_trends,
            series_window: config.series_window,
        }
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Analyze `observations` as the window for `mode`
    pub fn analyze(
        &self,
        mode: CollectionMode,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> AnalysisReport {
        if observations.is_empty() {
            tracing::warn!(%mode, "No observations to analyze");
            return AnalysisReport::empty(mode, now);
        }

        let counts = most_common(&extract_keywords(observations));
        let categorized_trends = self.categorize(&counts);
        let scored = self.score(&counts, observations, now);
        let opportunities = self.opportunities(&scored);
        let summary = self.summarize(&scored, &opportunities);

        let data_sources_analyzed = observations
            .iter()
            .map(|obs| obs.source)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        tracing::info!(
            %mode,
            observations = observations.len(),
            keywords = counts.len(),
            scored = scored.len(),
            opportunities = opportunities.len(),
            "Trend analysis completed"
        );

        AnalysisReport {
            mode,
            analysis_timestamp: now,
            data_sources_analyzed,
            total_items_analyzed: observations.len(),
            trending_keywords: scored.into_iter().take(self.max_trends).collect(),
            categorized_trends,
            opportunities,
            summary,
        }
    }

    /// Analyze everything the store holds within the mode's lookback window
    pub fn analyze_recent(
        &self,
        repository: &dyn ObservationRepository,
        mode: CollectionMode,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport> {
        let observations = repository.since(now - mode.lookback())?;
        Ok(self.analyze(mode, &observations, now))
    }

    fn categorize(&self, counts: &[(String, usize)]) -> BTreeMap<String, Vec<String>> {
        let mut categorized: BTreeMap<String, Vec<String>> = self
            .classifier
            .all_categories()
            .into_iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();

        for (keyword, _) in counts.iter().take(CATEGORIZE_LIMIT) {
            if let Some(category) = self.classifier.classify_keyword(keyword) {
                if let Some(bucket) = categorized.get_mut(category) {
                    bucket.push(keyword.clone());
                }
            }
        }
        categorized
    }

    fn score(
        &self,
        counts: &[(String, usize)],
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> Vec<ScoredKeyword> {
        let mut scored: Vec<ScoredKeyword> = counts
            .iter()
            .take(SCORE_LIMIT)
            .map(|(keyword, frequency)| ScoredKeyword {
                keyword: keyword.clone(),
                frequency: *frequency,
                score: self.scoring.score(keyword, *frequency, observations, now),
                category: self.classifier.classify_keyword(keyword).map(str::to_string),
                sources: sources_mentioning(keyword, observations),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }

    fn opportunities(&self, scored: &[ScoredKeyword]) -> Vec<Opportunity> {
        scored
            .iter()
            .take(OPPORTUNITY_LIMIT)
            .filter(|trend| trend.score > self.min_score)
            .map(|trend| Opportunity {
                keyword: trend.keyword.clone(),
                category: trend.category.clone(),
                score: trend.score,
                frequency: trend.frequency,
                sources: trend.sources.clone(),
                suggested_tags: suggested_tags(&trend.keyword),
                market_potential: market_potential(trend.score, trend.frequency),
                competition_level: competition_level(trend.frequency),
            })
            .collect()
    }

    fn summarize(&self, scored: &[ScoredKeyword], opportunities: &[Opportunity]) -> AnalysisSummary {
        let mut category_scores: BTreeMap<String, f64> = BTreeMap::new();
        let mut source_scores: BTreeMap<Source, f64> = BTreeMap::new();

        for trend in scored {
            if let Some(category) = &trend.category {
                *category_scores.entry(category.clone()).or_insert(0.0) += trend.score;
            }
            for source in &trend.sources {
                *source_scores.entry(*source).or_insert(0.0) += trend.score;
            }
        }

        AnalysisSummary {
            total_trends_analyzed: scored.len(),
            high_potential_opportunities: opportunities
                .iter()
                .filter(|o| o.market_potential == Rating::High)
                .count(),
            top_categories: top_by_score(category_scores, SUMMARY_TOP),
            trending_sources: top_by_score(source_scores, SUMMARY_TOP),
        }
    }

    /// One trend per (keyword, source) with popularity = mean metric value
    ///
    /// The category comes from the observations when any carries one, else from
    /// the classifier.
    pub fn platform_trends(
        &self,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> Vec<PlatformTrend> {
        let mut groups: BTreeMap<(String, Source), (f64, usize, Option<String>)> = BTreeMap::new();
        for obs in observations {
            let entry = groups
                .entry((obs.keyword.clone(), obs.source))
                .or_insert((0.0, 0, None));
            entry.0 += obs.metric_value;
            entry.1 += 1;
            if entry.2.is_none() {
                entry.2 = obs.category.clone();
            }
        }

        groups
            .into_iter()
            .map(|((keyword, source), (sum, count, category))| {
                let category = category.or_else(|| {
                    self.classifier
                        .classify_keyword(&keyword)
                        .map(str::to_string)
                });
                PlatformTrend::new(&keyword, source, sum / count as f64, now).with_category(category)
            })
            .collect()
    }

    /// Scored keywords with their stored history and momentum
    pub fn trend_records(
        &self,
        scored: &[ScoredKeyword],
        repository: &dyn ObservationRepository,
        since: DateTime<Utc>,
    ) -> Result<Vec<TrendRecord>> {
        let mut records = Vec::with_capacity(scored.len());
        for trend in scored {
            let history = repository.by_keyword(&trend.keyword, since)?;
            let momentum =
                KeywordTrend::from_observations(&trend.keyword, &history, Some(self.series_window))
                    .momentum();

            records.push(TrendRecord {
                keyword: trend.keyword.clone(),
                category: trend.category.clone(),
                score: trend.score,
                momentum,
                history,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryObservationRepository, ObservationRepository};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 10, 12, 0, 0).unwrap()
    }

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new(&AnalysisConfig::default())
    }

    fn sample() -> Vec<Observation> {
        vec![
            Observation::new("soy candle", Source::Etsy, 40.0, now() - Duration::hours(1))
                .with_text("Hand poured soy candle"),
            Observation::new("soy candle", Source::Reddit, 20.0, now() - Duration::hours(3)),
            Observation::new("dog collar", Source::Amazon, 15.0, now() - Duration::hours(2)),
            Observation::new("vintage necklace", Source::Pinterest, 30.0, now() - Duration::hours(14)),
        ]
    }

    #[test]
    fn test_empty_input_keeps_mode() {
        let report = analyzer().analyze(CollectionMode::Weekly, &[], now());
        assert_eq!(report.mode, CollectionMode::Weekly);
        assert!(report.is_empty());
        assert!(report.trending_keywords.is_empty());
        assert!(report.categorized_trends.is_empty());
    }

    #[test]
    fn test_most_common_keeps_first_seen_order_on_ties() {
        let words: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let counts = most_common(&words);
        assert_eq!(
            counts,
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_analyze_scores_and_categorizes() {
        let report = analyzer().analyze(CollectionMode::Daily, &sample(), now());

        assert_eq!(report.total_items_analyzed, 4);
        assert_eq!(
            report.data_sources_analyzed,
            vec![Source::Reddit, Source::Pinterest, Source::Amazon, Source::Etsy]
        );

        let top = &report.trending_keywords[0];
        assert_eq!(top.keyword, "soy");
        assert_eq!(top.frequency, 3);
        assert_eq!(top.sources, vec![Source::Reddit, Source::Etsy]);
        assert_eq!(report.trending_keywords[1].keyword, "candle");
        assert_eq!(report.trending_keywords[1].category.as_deref(), Some("home_decor"));

        assert_eq!(report.categorized_trends["home_decor"], vec!["candle"]);
        assert_eq!(report.categorized_trends["pets"], vec!["dog"]);
        assert!(report.categorized_trends["crafts"].is_empty());

        assert_eq!(report.summary.total_trends_analyzed, 8);
        assert_eq!(report.summary.top_categories[0], "home_decor");
        assert_eq!(report.summary.top_categories[1], "pets");
        assert_eq!(report.summary.trending_sources[0], Source::Etsy);
    }

    #[test]
    fn test_opportunities_respect_min_score() {
        let report = analyzer().analyze(CollectionMode::Daily, &sample(), now());
        assert_eq!(report.opportunities.len(), 8);
        assert!(report
            .opportunities
            .iter()
            .all(|o| o.market_potential == Rating::Low && o.competition_level == Rating::Low));

        let strict = TrendAnalyzer::new(&AnalysisConfig {
            min_score: 0.45,
            ..AnalysisConfig::default()
        });
        let report = strict.analyze(CollectionMode::Daily, &sample(), now());
        let keywords: Vec<_> = report.opportunities.iter().map(|o| o.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["soy", "candle"]);
    }

    #[test]
    fn test_max_trends_truncates() {
        let analyzer = TrendAnalyzer::new(&AnalysisConfig {
            max_trends: 3,
            ..AnalysisConfig::default()
        });
        let report = analyzer.analyze(CollectionMode::Daily, &sample(), now());
        assert_eq!(report.trending_keywords.len(), 3);
        assert_eq!(report.summary.total_trends_analyzed, 8);
    }

    #[test]
    fn test_suggested_tags_and_ratings() {
        assert_eq!(
            suggested_tags("necklace"),
            vec!["necklace", "handmade", "personalized", "gift"]
        );
        assert_eq!(suggested_tags("mug"), vec!["mug"]);
        assert_eq!(market_potential(0.9, 60), Rating::High);
        assert_eq!(market_potential(0.9, 30), Rating::Medium);
        assert_eq!(market_potential(0.6, 10), Rating::Low);
        assert_eq!(competition_level(101), Rating::High);
        assert_eq!(competition_level(51), Rating::Medium);
    }

    #[test]
    fn test_platform_trends_average_per_source() {
        let mut observations = sample();
        observations.push(Observation::new(
            "soy candle",
            Source::Etsy,
            60.0,
            now() - Duration::hours(5),
        ));

        let trends = analyzer().platform_trends(&observations, now());
        assert_eq!(trends.len(), 4);

        let etsy = trends
            .iter()
            .find(|t| t.keyword == "soy candle" && t.platform == Source::Etsy)
            .unwrap();
        assert!((etsy.popularity_score - 50.0).abs() < 1e-9);
        assert_eq!(etsy.category.as_deref(), Some("home_decor"));
        assert_eq!(etsy.date, now().date_naive());
    }

    #[test]
    fn test_analyze_recent_and_records() {
        let repo = MemoryObservationRepository::new();
        let mut observations = sample();
        observations.push(Observation::new(
            "soy candle",
            Source::Etsy,
            10.0,
            now() - Duration::days(3),
        ));
        repo.insert_batch(&observations).unwrap();

        let analyzer = analyzer();
        let report = analyzer
            .analyze_recent(&repo, CollectionMode::Daily, now())
            .unwrap();
        assert_eq!(report.total_items_analyzed, 4);

        let records = analyzer
            .trend_records(&report.trending_keywords[..2], &repo, now() - Duration::days(7))
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keyword, "soy");
        assert_eq!(records[0].history.len(), 3);
        assert!(records[0].history[0].timestamp < records[0].history[2].timestamp);
        assert!(records[0].momentum.is_some());
    }
}
