//! Keyword time-series tracking with spike detection and momentum
//!
//! This module provides functionality for:
//! - Tracking per-keyword metric values over time
//! - Moving averages and spike detection
//! - Trend direction, velocity and acceleration
//! - Bucketing raw observations into daily series

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::models::Observation;

/// Errors that can occur during keyword trend analysis
#[derive(Debug, Error)]
pub enum TrendError {
    #[error("Insufficient data points: need at least {0}, got {1}")]
    InsufficientData(usize, usize),

    #[error("Invalid time range: start {0} is after end {1}")]
    InvalidTimeRange(DateTime<Utc>, DateTime<Utc>),

    #[error("Invalid window size: {0}")]
    InvalidWindowSize(usize),

    #[error("No data point at {0}")]
    MissingPoint(DateTime<Utc>),
}

/// Result type for trend analysis operations
pub type TrendResult<T> = Result<T, TrendError>;

/// Time-series data point for a keyword
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    /// Timestamp of this data point
    pub timestamp: DateTime<Utc>,

    /// Accumulated metric value at this timestamp
    pub value: f64,

    /// Normalized value (0.0 to 1.0)
    pub normalized: f64,
}

impl DataPoint {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            normalized: 0.0,
        }
    }
}

/// Trend direction indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Strongly increasing
    Rising,

    /// Slightly increasing
    SlightlyRising,

    /// Stable, no significant change
    Stable,

    /// Slightly decreasing
    SlightlyFalling,

    /// Strongly decreasing
    Falling,
}

impl TrendDirection {
    /// Determine trend direction from velocity
    ///
    /// # Classification
    /// - `velocity > 0.3`: Rising
    /// - `0.1 < velocity <= 0.3`: SlightlyRising
    /// - `-0.1 <= velocity <= 0.1`: Stable
    /// - `-0.3 <= velocity < -0.1`: SlightlyFalling
    /// - `velocity < -0.3`: Falling
    #[must_use]
    pub fn from_velocity(velocity: f64) -> Self {
        if velocity > 0.3 {
            Self::Rising
        } else if velocity > 0.1 {
            Self::SlightlyRising
        } else if velocity >= -0.1 {
            Self::Stable
        } else if velocity >= -0.3 {
            Self::SlightlyFalling
        } else {
            Self::Falling
        }
    }
}

/// Spike detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spike {
    /// When the spike occurred
    pub timestamp: DateTime<Utc>,

    /// Actual value at spike
    pub value: f64,

    /// Expected value (moving average)
    pub expected: f64,

    /// Spike magnitude (value / expected)
    pub magnitude: f64,

    /// Z-score of the spike
    pub z_score: f64,
}

/// Momentum signals for one keyword
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub direction: TrendDirection,
    /// Normalized slope in [-1.0, 1.0]
    pub velocity: f64,
    /// Change in velocity between the two most recent windows
    pub acceleration: Option<f64>,
}

/// Least-squares slope over equally spaced values, normalized by their mean
fn normalized_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i * i) as f64).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;

    let mean = sum_y / n;
    if mean > 0.0 {
        (slope / mean).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Keyword time-series with trend analysis capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTrend {
    /// Keyword being tracked
    pub keyword: String,

    /// Time-series data points (sorted by timestamp)
    data: BTreeMap<DateTime<Utc>, DataPoint>,

    /// Moving average window size (in number of data points)
    window_size: usize,

    /// Cached moving average values
    #[serde(skip)]
    moving_avg_cache: HashMap<DateTime<Utc>, f64>,
}

impl KeywordTrend {
    /// Create a new keyword trend tracker
    ///
    /// # Arguments
    /// * `keyword` - The keyword to track
    /// * `window_size` - Number of data points for moving average (default: 7)
    #[must_use]
    pub fn new(keyword: String, window_size: Option<usize>) -> Self {
        Self {
            keyword,
            data: BTreeMap::new(),
            window_size: window_size.unwrap_or(7).max(1),
            moving_avg_cache: HashMap::new(),
        }
    }

    /// Daily series of `observations`, summing metric values per UTC day
    #[must_use]
    pub fn from_observations<'a, I>(keyword: &str, observations: I, window_size: Option<usize>) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut trend = Self::new(keyword.to_string(), window_size);
        for obs in observations {
            trend.accumulate(day_bucket(obs.timestamp), obs.metric_value);
        }
        trend
    }

    /// Set the value at a timestamp, replacing any previous value
    pub fn add_point(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.data.insert(timestamp, DataPoint::new(timestamp, value));
        self.moving_avg_cache.clear();
    }

    /// Add a value to whatever is already recorded at this timestamp
    pub fn accumulate(&mut self, timestamp: DateTime<Utc>, value: f64) {
        self.data
            .entry(timestamp)
            .and_modify(|point| point.value += value)
            .or_insert_with(|| DataPoint::new(timestamp, value));
        self.moving_avg_cache.clear();
    }

    /// Add multiple data points at once
    pub fn add_points<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = (DateTime<Utc>, f64)>,
    {
        for (timestamp, value) in points {
            self.add_point(timestamp, value);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get all data points in chronological order
    #[must_use]
    pub fn data_points(&self) -> Vec<&DataPoint> {
        self.data.values().collect()
    }

    /// Get data points within an inclusive time range
    #[must_use]
    pub fn data_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&DataPoint> {
        if start > end {
            return Vec::new();
        }
        self.data.range(start..=end).map(|(_, point)| point).collect()
    }

    fn values(&self) -> Vec<f64> {
        self.data.values().map(|p| p.value).collect()
    }

    /// Simple moving average ending at `timestamp`
    ///
    /// Returns `None` when there is no point at `timestamp`.
    #[must_use]
    pub fn moving_average(&mut self, timestamp: DateTime<Utc>) -> Option<f64> {
        if let Some(&cached) = self.moving_avg_cache.get(&timestamp) {
            return Some(cached);
        }

        let timestamps: Vec<_> = self.data.keys().copied().collect();
        let pos = timestamps.iter().position(|&t| t == timestamp)?;

        let start_idx = pos.saturating_sub(self.window_size - 1);
        let window: Vec<f64> = timestamps[start_idx..=pos]
            .iter()
            .filter_map(|t| self.data.get(t))
            .map(|p| p.value)
            .collect();

        if window.is_empty() {
            return None;
        }

        let avg = window.iter().sum::<f64>() / window.len() as f64;
        self.moving_avg_cache.insert(timestamp, avg);

        Some(avg)
    }

    /// Detect points that exceed their moving average by `threshold` times
    pub fn detect_spikes(&mut self, threshold: f64) -> Vec<Spike> {
        let mut spikes = Vec::new();

        if self.data.len() < self.window_size {
            return spikes;
        }

        let values = self.values();
        let mean = values.iter().mean();
        let std_dev = values.iter().population_std_dev();

        let snapshot: Vec<_> = self.data.iter().map(|(&ts, p)| (ts, p.value)).collect();

        for (timestamp, value) in snapshot {
            let Some(expected) = self.moving_average(timestamp) else {
                continue;
            };
            if expected <= 0.0 {
                continue;
            }

            let magnitude = value / expected;
            if magnitude >= threshold {
                let z_score = if std_dev > 0.0 {
                    (value - mean) / std_dev
                } else {
                    0.0
                };

                spikes.push(Spike {
                    timestamp,
                    value,
                    expected,
                    magnitude,
                    z_score,
                });
            }
        }

        spikes
    }

    /// Trend direction and velocity over the most recent points
    ///
    /// Velocity is the least-squares slope divided by the mean, clamped to [-1.0, 1.0].
    pub fn trend_direction(
        &self,
        recent_points: Option<usize>,
    ) -> TrendResult<(TrendDirection, f64)> {
        let n = recent_points.unwrap_or(self.window_size);

        if self.data.len() < 2 {
            return Err(TrendError::InsufficientData(2, self.data.len()));
        }

        let values = self.values();
        let recent = &values[values.len().saturating_sub(n)..];

        if recent.len() < 2 {
            return Err(TrendError::InsufficientData(2, recent.len()));
        }

        let velocity = normalized_slope(recent);
        Ok((TrendDirection::from_velocity(velocity), velocity))
    }

    /// Velocity of the last `window` points minus velocity of the `window` points before them
    pub fn acceleration(&self, window: usize) -> TrendResult<f64> {
        if window < 2 {
            return Err(TrendError::InvalidWindowSize(window));
        }

        let values = self.values();
        let needed = window * 2;
        if values.len() < needed {
            return Err(TrendError::InsufficientData(needed, values.len()));
        }

        let split = values.len() - window;
        let recent = &values[split..];
        let previous = &values[split - window..split];

        Ok(normalized_slope(recent) - normalized_slope(previous))
    }

    /// Direction, velocity and (when enough history exists) acceleration
    #[must_use]
    pub fn momentum(&self) -> Option<Momentum> {
        let (direction, velocity) = self.trend_direction(None).ok()?;
        let window = self.window_size.min(self.data.len() / 2);
        let acceleration = self.acceleration(window).ok();

        Some(Momentum {
            direction,
            velocity,
            acceleration,
        })
    }

    /// Percent change between the values at two timestamps
    pub fn percent_change(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> TrendResult<f64> {
        if start >= end {
            return Err(TrendError::InvalidTimeRange(start, end));
        }

        let start_point = self.data.get(&start).ok_or(TrendError::MissingPoint(start))?;
        let end_point = self.data.get(&end).ok_or(TrendError::MissingPoint(end))?;

        if start_point.value == 0.0 {
            return Ok(100.0);
        }

        Ok((end_point.value - start_point.value) / start_point.value * 100.0)
    }

    /// Min-max normalize every point into the `normalized` field
    pub fn normalize(&mut self) {
        if self.data.is_empty() {
            return;
        }

        let values = self.values();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        if range == 0.0 {
            for point in self.data.values_mut() {
                point.normalized = 0.5;
            }
        } else {
            for point in self.data.values_mut() {
                point.normalized = (point.value - min) / range;
            }
        }
    }
}

/// Start of the UTC day containing `timestamp`
fn day_bucket(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Collection of keyword series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesIndex {
    trends: HashMap<String, KeywordTrend>,
    default_window_size: usize,
}

impl SeriesIndex {
    #[must_use]
    pub fn new(window_size: Option<usize>) -> Self {
        Self {
            trends: HashMap::new(),
            default_window_size: window_size.unwrap_or(7),
        }
    }

    /// Build daily series: each observation's value is summed into its keyword's UTC day
    #[must_use]
    pub fn from_observations<'a, I>(observations: I, window_size: Option<usize>) -> Self
    where
        I: IntoIterator<Item = &'a Observation>,
    {
        let mut index = Self::new(window_size);
        for obs in observations {
            index.add_observation(&obs.keyword, day_bucket(obs.timestamp), obs.metric_value);
        }
        index
    }

    /// Accumulate a value into a keyword's series
    pub fn add_observation(&mut self, keyword: &str, timestamp: DateTime<Utc>, value: f64) {
        let window = self.default_window_size;
        self.trends
            .entry(keyword.to_string())
            .or_insert_with(|| KeywordTrend::new(keyword.to_string(), Some(window)))
            .accumulate(timestamp, value);
    }

    #[must_use]
    pub fn get_trend(&self, keyword: &str) -> Option<&KeywordTrend> {
        self.trends.get(keyword)
    }

    pub fn get_trend_mut(&mut self, keyword: &str) -> Option<&mut KeywordTrend> {
        self.trends.get_mut(keyword)
    }

    #[must_use]
    pub fn keywords(&self) -> Vec<&str> {
        self.trends.keys().map(String::as_str).collect()
    }

    /// Keywords sorted by recent velocity, highest first
    #[must_use]
    pub fn top_trending(&self, limit: usize, recent_points: Option<usize>) -> Vec<(String, f64)> {
        let mut velocities: Vec<_> = self
            .trends
            .iter()
            .filter_map(|(keyword, trend)| {
                trend
                    .trend_direction(recent_points)
                    .ok()
                    .map(|(_, velocity)| (keyword.clone(), velocity))
            })
            .collect();

        velocities.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        velocities.truncate(limit);
        velocities
    }

    /// Keywords with spikes at or after `since` (default: the last 7 days)
    pub fn find_spikes(
        &mut self,
        threshold: f64,
        since: Option<DateTime<Utc>>,
    ) -> HashMap<String, Vec<Spike>> {
        let cutoff = since.unwrap_or_else(|| Utc::now() - Duration::days(7));

        self.trends
            .iter_mut()
            .filter_map(|(keyword, trend)| {
                let spikes: Vec<_> = trend
                    .detect_spikes(threshold)
                    .into_iter()
                    .filter(|spike| spike.timestamp >= cutoff)
                    .collect();

                if spikes.is_empty() {
                    None
                } else {
                    Some((keyword.clone(), spikes))
                }
            })
            .collect()
    }
}
