//! Weighted keyword scoring
//!
//! A keyword's score combines four components, each in [0.0, 1.0]:
//! - frequency: how often the keyword was extracted
//! - recency: share of its mentions from the last 24 hours
//! - growth: mentions in the last 12 hours against the 12 hours before
//! - cross-platform: how many distinct sources mention it

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ScoringWeights;
use crate::models::{Observation, Source};

/// Per-component view of a keyword score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub frequency_score: f64,
    pub recency_score: f64,
    pub growth_score: f64,
    pub cross_platform_score: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Weighted score in [0.0, 1.0]
    pub fn score(
        &self,
        keyword: &str,
        frequency: usize,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> f64 {
        self.breakdown(keyword, frequency, observations, now).final_score
    }

    pub fn breakdown(
        &self,
        keyword: &str,
        frequency: usize,
        observations: &[Observation],
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let mentions = mentions(keyword, observations);

        let frequency_score = frequency_score(frequency);
        let recency_score = recency_score(&mentions, now);
        let growth_score = growth_score(&mentions, now);
        let cross_platform_score = cross_platform_score(&mentions);

        let weighted = frequency_score * self.weights.frequency
            + recency_score * self.weights.recency
            + growth_score * self.weights.growth
            + cross_platform_score * self.weights.cross_platform;

        ScoreBreakdown {
            frequency_score,
            recency_score,
            growth_score,
            cross_platform_score,
            final_score: weighted.clamp(0.0, 1.0),
        }
    }
}

/// Observations whose keyword or text contains `keyword`, case-insensitively
pub(crate) fn mentions<'a>(keyword: &str, observations: &'a [Observation]) -> Vec<&'a Observation> {
    let needle = keyword.to_lowercase();
    observations
        .iter()
        .filter(|obs| obs.searchable_text().contains(&needle))
        .collect()
}

/// Age of an observation; timestamps in the future count as brand new
fn age(obs: &Observation, now: DateTime<Utc>) -> Duration {
    (now - obs.timestamp).max(Duration::zero())
}

fn frequency_score(frequency: usize) -> f64 {
    (frequency as f64 / 100.0).min(1.0)
}

fn recency_score(mentions: &[&Observation], now: DateTime<Utc>) -> f64 {
    if mentions.is_empty() {
        return 0.0;
    }
    let recent = mentions
        .iter()
        .filter(|obs| age(obs, now) < Duration::hours(24))
        .count();
    recent as f64 / mentions.len() as f64
}

fn growth_score(mentions: &[&Observation], now: DateTime<Utc>) -> f64 {
    let mut recent = 0usize;
    let mut older = 0usize;
    for obs in mentions {
        let age = age(obs, now);
        if age < Duration::hours(12) {
            recent += 1;
        } else if age < Duration::hours(24) {
            older += 1;
        }
    }

    if older == 0 {
        return 0.5;
    }

    let rate = (recent as f64 - older as f64) / older as f64;
    if rate >= 1.0 {
        1.0
    } else if rate <= -0.5 {
        0.0
    } else {
        (rate + 0.5) / 1.5
    }
}

fn cross_platform_score(mentions: &[&Observation]) -> f64 {
    let platforms: HashSet<Source> = mentions.iter().map(|obs| obs.source).collect();
    (platforms.len() as f64 / Source::ALL.len() as f64).min(1.0)
}
