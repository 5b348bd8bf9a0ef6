//! Collector serving a fixed observation list
//!
//! Used by the offline demo and by tests that need collectors with known
//! output, failures or delays.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;

use super::Collector;
use crate::config::SourceConfig;
use crate::models::{CollectionMode, Observation, Source};
use crate::utils::error::CollectError;

/// Demo catalogue: keyword, context text, base popularity
const DEMO_KEYWORDS: [(&str, &str, f64); 8] = [
    ("boho wall art", "Boho wall art for a cozy living room", 62.0),
    ("personalized dog collar", "Personalized dog collar with name tag", 48.0),
    ("soy candle", "Hand poured soy candle, lavender scent", 71.0),
    ("minimalist gold necklace", "Minimalist gold necklace, dainty layering", 55.0),
    ("printable planner", "Printable planner download for 2024", 39.0),
    ("vintage ceramic mug", "Vintage ceramic mug set", 33.0),
    ("handmade soap", "Handmade soap bars with essential oils", 44.0),
    ("custom pet portrait", "Custom pet portrait from photo", 58.0),
];

fn source_weight(source: Source) -> f64 {
    match source {
        Source::GoogleTrends => 1.0,
        Source::Reddit => 0.6,
        Source::Pinterest => 0.8,
        Source::Twitter => 0.5,
        Source::Amazon => 0.9,
        Source::Etsy => 1.1,
    }
}

pub struct StaticCollector {
    source: Source,
    observations: Vec<Observation>,
    fail_status: Option<u16>,
    delay: Option<StdDuration>,
}

impl StaticCollector {
    pub fn new(source: Source, observations: Vec<Observation>) -> Self {
        Self {
            source,
            observations,
            fail_status: None,
            delay: None,
        }
    }

    /// Collector that always answers with an HTTP status error
    pub fn failing(source: Source, status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::new(source, Vec::new())
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Deterministic demo data for `source`, observed in the 24 hours before `now`
    pub fn demo(source: Source, now: DateTime<Utc>) -> Self {
        Self::demo_scaled(source, now, 1.0)
    }

    /// Demo data with every metric multiplied by `scale`
    pub fn demo_scaled(source: Source, now: DateTime<Utc>, scale: f64) -> Self {
        let position = Source::ALL
            .iter()
            .position(|s| *s == source)
            .unwrap_or_default();
        let weight = source_weight(source) * scale;

        let mut observations = Vec::new();
        for (index, (keyword, text, base)) in DEMO_KEYWORDS.iter().enumerate() {
            // every keyword shows up on four of the six sources
            if (position + index) % 3 == 0 {
                continue;
            }
            let value = (base * weight * 100.0).round() / 100.0;
            let offset = index as i64;

            observations.push(
                Observation::new(keyword, source, value, now - Duration::hours(1 + offset))
                    .with_text(*text),
            );
            observations.push(Observation::new(
                keyword,
                source,
                (value * 0.8 * 100.0).round() / 100.0,
                now - Duration::hours(13 + offset),
            ));
        }

        Self::new(source, observations)
    }
}

#[async_trait]
impl Collector for StaticCollector {
    fn source(&self) -> Source {
        self.source
    }

    async fn collect(
        &self,
        _mode: CollectionMode,
        settings: &SourceConfig,
    ) -> Result<Vec<Observation>, CollectError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.fail_status {
            return Err(CollectError::Status {
                platform: self.source,
                status,
            });
        }

        let mut observations = self.observations.clone();
        observations.truncate(settings.max_items.max(1));
        Ok(observations)
    }
}
