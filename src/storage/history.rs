//! Daily platform-trend history
//!
//! Each pipeline run stores the day's [`PlatformTrend`]s plus a one-row
//! snapshot summary. The emerging-trend detector reads the most recent earlier
//! snapshot back as its baseline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::repository::{format_ts, parse_ts};
use crate::models::{PlatformTrend, Source};

/// Emerging score above which a stored trend counts as emerging in a snapshot
pub const SNAPSHOT_EMERGING_THRESHOLD: f64 = 0.75;

/// Confidence above which a stored trend counts as high-confidence
pub const SNAPSHOT_HIGH_CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Per-day counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_trends: usize,
    pub emerging_trends: usize,
    pub high_confidence_trends: usize,
    pub platform_breakdown: BTreeMap<String, usize>,
}

/// A keyword seen on several platforms within a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSourceTrend {
    pub keyword: String,
    pub source_count: usize,
    pub avg_popularity: f64,
    pub avg_emerging: f64,
    pub avg_confidence: f64,
    pub platforms: Vec<Source>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_trends: usize,
    pub total_dates: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub platforms: BTreeMap<String, usize>,
    pub database_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResult {
    pub cutoff: NaiveDate,
    pub trends_deleted: usize,
    pub snapshots_deleted: usize,
}

fn parse_date(raw: &str) -> rusqlite::Result<NaiveDate> {
    raw.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn days_before(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| anyhow!("{days} days before {date} is out of range"))
}

fn join_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .map(Source::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn split_sources(raw: &str) -> Vec<Source> {
    let mut sources: Vec<Source> = raw.split(',').filter_map(Source::parse).collect();
    sources.sort();
    sources.dedup();
    sources
}

const TREND_COLUMNS: &str = "keyword, category, platform, popularity_score, emerging_score, \
     confidence_score, growth_rate, source_count, sources, timestamp, date";

/// SQLite-backed trend history with a retention window
pub struct HistoryManager {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    retention_days: u32,
}

impl HistoryManager {
    pub fn new(path: impl AsRef<Path>, retention_days: u32) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path).context("Failed to open history database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let manager = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
            retention_days,
        };
        manager.create_schema()?;

        tracing::info!(
            path = %path.display(),
            retention_days,
            "History manager initialized"
        );
        Ok(manager)
    }

    pub fn in_memory(retention_days: u32) -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory history database")?;
        let manager = Self {
            conn: Mutex::new(conn),
            path: None,
            retention_days,
        };
        manager.create_schema()?;
        Ok(manager)
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("history connection lock poisoned"))
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS trends (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword TEXT NOT NULL,
                category TEXT,
                platform TEXT NOT NULL,
                popularity_score REAL NOT NULL DEFAULT 0,
                emerging_score REAL NOT NULL DEFAULT 0,
                confidence_score REAL NOT NULL DEFAULT 0,
                growth_rate REAL,
                source_count INTEGER NOT NULL DEFAULT 1,
                sources TEXT NOT NULL DEFAULT '',
                timestamp TEXT NOT NULL,
                date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS daily_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT UNIQUE NOT NULL,
                total_trends INTEGER NOT NULL DEFAULT 0,
                emerging_trends INTEGER NOT NULL DEFAULT 0,
                high_confidence_trends INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_trends_date ON trends(date);
            CREATE INDEX IF NOT EXISTS idx_trends_keyword ON trends(keyword);
            CREATE INDEX IF NOT EXISTS idx_trends_platform ON trends(platform);
            CREATE INDEX IF NOT EXISTS idx_trends_emerging ON trends(emerging_score);
            "#,
        )
        .context("Failed to create history schema")?;
        Ok(())
    }

    fn row_to_trend(row: &Row<'_>) -> rusqlite::Result<PlatformTrend> {
        let platform: String = row.get("platform")?;
        let sources: String = row.get("sources")?;
        let timestamp: String = row.get("timestamp")?;
        let date: String = row.get("date")?;

        let platform = Source::parse(&platform).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("unknown platform: {platform}").into(),
            )
        })?;

        Ok(PlatformTrend {
            keyword: row.get("keyword")?,
            category: row.get("category")?,
            platform,
            popularity_score: row.get("popularity_score")?,
            emerging_score: row.get("emerging_score")?,
            confidence_score: row.get("confidence_score")?,
            growth_rate: row.get("growth_rate")?,
            source_count: row.get::<_, i64>("source_count")? as usize,
            sources: split_sources(&sources),
            timestamp: parse_ts(&timestamp)?,
            date: parse_date(&date)?,
        })
    }

    fn query_trends(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<PlatformTrend>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).context("Failed to prepare history query")?;
        let trends = stmt
            .query_map(params, Self::row_to_trend)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read stored trends")?;
        Ok(trends)
    }

    /// Store the trends for `date`, replacing anything already stored for it
    pub fn store_daily_trends(&self, trends: &[PlatformTrend], date: NaiveDate) -> Result<DailySummary> {
        let date_key = date.to_string();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM trends WHERE date = ?1", params![date_key])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trends (
                    keyword, category, platform, popularity_score, emerging_score,
                    confidence_score, growth_rate, source_count, sources, timestamp, date
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for trend in trends {
                stmt.execute(params![
                    trend.keyword,
                    trend.category,
                    trend.platform.as_str(),
                    trend.popularity_score,
                    trend.emerging_score,
                    trend.confidence_score,
                    trend.growth_rate,
                    trend.source_count as i64,
                    join_sources(&trend.sources),
                    format_ts(trend.timestamp),
                    date_key,
                ])?;
            }
        }

        let emerging = trends
            .iter()
            .filter(|t| t.emerging_score > SNAPSHOT_EMERGING_THRESHOLD)
            .count();
        let high_confidence = trends
            .iter()
            .filter(|t| t.confidence_score > SNAPSHOT_HIGH_CONFIDENCE_THRESHOLD)
            .count();

        tx.execute(
            "INSERT OR REPLACE INTO daily_snapshots
                (date, total_trends, emerging_trends, high_confidence_trends)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                date_key,
                trends.len() as i64,
                emerging as i64,
                high_confidence as i64
            ],
        )?;
        tx.commit().context("Failed to commit daily trends")?;

        let mut platform_breakdown = BTreeMap::new();
        for trend in trends {
            *platform_breakdown
                .entry(trend.platform.as_str().to_string())
                .or_insert(0) += 1;
        }

        tracing::info!(%date, stored = trends.len(), emerging, "Stored daily trends");

        Ok(DailySummary {
            date,
            total_trends: trends.len(),
            emerging_trends: emerging,
            high_confidence_trends: high_confidence,
            platform_breakdown,
        })
    }

    pub fn trends_by_date(&self, date: NaiveDate) -> Result<Vec<PlatformTrend>> {
        self.query_trends(
            &format!(
                "SELECT {TREND_COLUMNS} FROM trends WHERE date = ?1
                 ORDER BY emerging_score DESC, popularity_score DESC, keyword ASC, platform ASC"
            ),
            &[&date.to_string()],
        )
    }

    /// Trends with `start <= date <= end`, newest day first
    pub fn trends_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<PlatformTrend>> {
        self.query_trends(
            &format!(
                "SELECT {TREND_COLUMNS} FROM trends WHERE date BETWEEN ?1 AND ?2
                 ORDER BY date DESC, emerging_score DESC, keyword ASC, platform ASC"
            ),
            &[&start.to_string(), &end.to_string()],
        )
    }

    pub fn emerging_trends(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        min_score: f64,
    ) -> Result<Vec<PlatformTrend>> {
        self.query_trends(
            &format!(
                "SELECT {TREND_COLUMNS} FROM trends
                 WHERE date BETWEEN ?1 AND ?2 AND emerging_score >= ?3
                 ORDER BY emerging_score DESC, confidence_score DESC, keyword ASC, platform ASC"
            ),
            &[&start.to_string(), &end.to_string(), &min_score],
        )
    }

    pub fn multi_source_trends(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        min_sources: usize,
    ) -> Result<Vec<MultiSourceTrend>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT keyword, COUNT(DISTINCT platform) AS source_count,
                    AVG(popularity_score) AS avg_popularity,
                    AVG(emerging_score) AS avg_emerging,
                    AVG(confidence_score) AS avg_confidence,
                    GROUP_CONCAT(DISTINCT platform) AS platforms
             FROM trends
             WHERE date BETWEEN ?1 AND ?2
             GROUP BY keyword
             HAVING COUNT(DISTINCT platform) >= ?3
             ORDER BY avg_emerging DESC, avg_popularity DESC, keyword ASC",
        )?;

        let trends = stmt
            .query_map(
                params![start.to_string(), end.to_string(), min_sources as i64],
                |row| {
                    let platforms: String = row.get(5)?;
                    Ok(MultiSourceTrend {
                        keyword: row.get(0)?,
                        source_count: row.get::<_, i64>(1)? as usize,
                        avg_popularity: row.get(2)?,
                        avg_emerging: row.get(3)?,
                        avg_confidence: row.get(4)?,
                        platforms: split_sources(&platforms),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read multi-source trends")?;
        Ok(trends)
    }

    /// Most recent snapshot strictly before `date`, at most `lookback_days` old
    pub fn latest_snapshot_before(
        &self,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Result<Option<NaiveDate>> {
        let earliest = days_before(date, lookback_days)?;
        let conn = self.conn()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT date FROM daily_snapshots
                 WHERE date < ?1 AND date >= ?2
                 ORDER BY date DESC LIMIT 1",
                params![date.to_string(), earliest.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.map(|raw| parse_date(&raw)).transpose()?)
    }

    pub fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let conn = self.conn()?;
        let snapshot: Option<(i64, i64, i64)> = conn
            .query_row(
                "SELECT total_trends, emerging_trends, high_confidence_trends
                 FROM daily_snapshots WHERE date = ?1",
                params![date.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((total, emerging, high_confidence)) = snapshot else {
            return Ok(DailySummary {
                date,
                total_trends: 0,
                emerging_trends: 0,
                high_confidence_trends: 0,
                platform_breakdown: BTreeMap::new(),
            });
        };

        let mut platform_breakdown = BTreeMap::new();
        let mut stmt =
            conn.prepare("SELECT platform, COUNT(*) FROM trends WHERE date = ?1 GROUP BY platform")?;
        let rows = stmt.query_map(params![date.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (platform, count) = row?;
            platform_breakdown.insert(platform, count as usize);
        }

        Ok(DailySummary {
            date,
            total_trends: total as usize,
            emerging_trends: emerging as usize,
            high_confidence_trends: high_confidence as usize,
            platform_breakdown,
        })
    }

    /// Delete trends and snapshots older than the retention window
    pub fn cleanup(&self, today: NaiveDate) -> Result<CleanupResult> {
        let cutoff = days_before(today, self.retention_days)?;
        let cutoff_key = cutoff.to_string();

        let conn = self.conn()?;
        let trends_deleted =
            conn.execute("DELETE FROM trends WHERE date < ?1", params![cutoff_key])?;
        let snapshots_deleted =
            conn.execute("DELETE FROM daily_snapshots WHERE date < ?1", params![cutoff_key])?;

        tracing::info!(
            %cutoff,
            trends_deleted,
            snapshots_deleted,
            "Cleaned up trend history"
        );

        Ok(CleanupResult {
            cutoff,
            trends_deleted,
            snapshots_deleted,
        })
    }

    pub fn stats(&self) -> Result<HistoryStats> {
        let conn = self.conn()?;

        let total_trends: i64 = conn.query_row("SELECT COUNT(*) FROM trends", [], |row| row.get(0))?;
        let total_dates: i64 =
            conn.query_row("SELECT COUNT(DISTINCT date) FROM trends", [], |row| row.get(0))?;
        let (first, last): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(date), MAX(date) FROM trends",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut platforms = BTreeMap::new();
        let mut stmt = conn.prepare("SELECT platform, COUNT(*) FROM trends GROUP BY platform")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (platform, count) = row?;
            platforms.insert(platform, count as usize);
        }

        let database_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(HistoryStats {
            total_trends: total_trends as usize,
            total_dates: total_dates as usize,
            first_date: first.as_deref().map(parse_date).transpose()?,
            last_date: last.as_deref().map(parse_date).transpose()?,
            platforms,
            database_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn trend(keyword: &str, platform: Source, popularity: f64, emerging: f64, d: u32) -> PlatformTrend {
        let ts = Utc.with_ymd_and_hms(2024, 7, d, 9, 0, 0).unwrap();
        let mut t = PlatformTrend::new(keyword, platform, popularity, ts);
        t.emerging_score = emerging;
        t
    }

    #[test]
    fn test_store_and_read_back() {
        let history = HistoryManager::in_memory(30).unwrap();
        let mut t = trend("soy candle", Source::Etsy, 42.0, 0.9, 10).with_category(Some("home_decor".into()));
        t.confidence_score = 0.85;
        t.growth_rate = Some(0.5);
        t.sources = vec![Source::Reddit, Source::Etsy];
        t.source_count = 2;

        let summary = history
            .store_daily_trends(&[t.clone(), trend("mug", Source::Amazon, 10.0, 0.1, 10)], day(10))
            .unwrap();
        assert_eq!(summary.total_trends, 2);
        assert_eq!(summary.emerging_trends, 1);
        assert_eq!(summary.high_confidence_trends, 1);

        let stored = history.trends_by_date(day(10)).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].keyword, "soy candle");
        assert_eq!(stored[0].category.as_deref(), Some("home_decor"));
        assert_eq!(stored[0].growth_rate, Some(0.5));
        assert_eq!(stored[0].sources, vec![Source::Reddit, Source::Etsy]);
        assert_eq!(stored[0].timestamp, t.timestamp);
        assert_eq!(stored[1].growth_rate, None);
    }

    #[test]
    fn test_restoring_a_day_replaces_it() {
        let history = HistoryManager::in_memory(30).unwrap();
        history
            .store_daily_trends(&[trend("a", Source::Etsy, 1.0, 0.0, 10), trend("b", Source::Etsy, 1.0, 0.0, 10)], day(10))
            .unwrap();
        history
            .store_daily_trends(&[trend("c", Source::Etsy, 1.0, 0.0, 10)], day(10))
            .unwrap();

        let stored = history.trends_by_date(day(10)).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].keyword, "c");
        assert_eq!(history.daily_summary(day(10)).unwrap().total_trends, 1);
    }

    #[test]
    fn test_range_and_emerging_queries() {
        let history = HistoryManager::in_memory(30).unwrap();
        history
            .store_daily_trends(&[trend("old", Source::Reddit, 5.0, 0.8, 5)], day(5))
            .unwrap();
        history
            .store_daily_trends(
                &[trend("new", Source::Reddit, 5.0, 0.95, 9), trend("meh", Source::Etsy, 5.0, 0.3, 9)],
                day(9),
            )
            .unwrap();

        let range = history.trends_in_range(day(4), day(9)).unwrap();
        assert_eq!(range.len(), 3);
        assert_eq!(range[0].date, day(9));
        assert_eq!(range[2].keyword, "old");

        let emerging = history.emerging_trends(day(4), day(9), 0.75).unwrap();
        let keywords: Vec<_> = emerging.iter().map(|t| t.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["new", "old"]);

        assert_eq!(history.trends_in_range(day(6), day(8)).unwrap().len(), 0);
    }

    #[test]
    fn test_multi_source_trends() {
        let history = HistoryManager::in_memory(30).unwrap();
        history
            .store_daily_trends(
                &[
                    trend("tote bag", Source::Etsy, 40.0, 0.6, 9),
                    trend("tote bag", Source::Pinterest, 20.0, 0.8, 9),
                    trend("tote bag", Source::Etsy, 30.0, 0.7, 9),
                    trend("lamp", Source::Amazon, 90.0, 0.9, 9),
                ],
                day(9),
            )
            .unwrap();

        let multi = history.multi_source_trends(day(1), day(9), 2).unwrap();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].keyword, "tote bag");
        assert_eq!(multi[0].source_count, 2);
        assert_eq!(multi[0].platforms, vec![Source::Pinterest, Source::Etsy]);
        assert!((multi[0].avg_popularity - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_multi_source_counts_platforms_across_days() {
        let history = HistoryManager::in_memory(30).unwrap();
        history
            .store_daily_trends(&[trend("tote bag", Source::Etsy, 40.0, 0.6, 8)], day(8))
            .unwrap();
        history
            .store_daily_trends(&[trend("tote bag", Source::Pinterest, 20.0, 0.8, 9)], day(9))
            .unwrap();

        let multi = history.multi_source_trends(day(1), day(9), 2).unwrap();
        assert_eq!(multi.len(), 1);
        assert_eq!(multi[0].keyword, "tote bag");
        assert_eq!(multi[0].source_count, 2);

        assert!(history.multi_source_trends(day(9), day(9), 2).unwrap().is_empty());
    }

    #[test]
    fn test_latest_snapshot_before() {
        let history = HistoryManager::in_memory(30).unwrap();
        assert_eq!(history.latest_snapshot_before(day(10), 7).unwrap(), None);

        history.store_daily_trends(&[], day(1)).unwrap();
        history.store_daily_trends(&[], day(6)).unwrap();
        history.store_daily_trends(&[], day(10)).unwrap();

        assert_eq!(history.latest_snapshot_before(day(10), 7).unwrap(), Some(day(6)));
        assert_eq!(history.latest_snapshot_before(day(6), 7).unwrap(), Some(day(1)));
        assert_eq!(history.latest_snapshot_before(day(6), 3).unwrap(), None);
    }

    #[test]
    fn test_oversized_windows_error_instead_of_panicking() {
        let history = HistoryManager::in_memory(u32::MAX).unwrap();
        assert!(history.latest_snapshot_before(day(10), u32::MAX).is_err());
        assert!(history.cleanup(day(10)).is_err());
    }

    #[test]
    fn test_daily_summary_without_snapshot() {
        let history = HistoryManager::in_memory(30).unwrap();
        let summary = history.daily_summary(day(3)).unwrap();
        assert_eq!(summary.total_trends, 0);
        assert!(summary.platform_breakdown.is_empty());
    }

    #[test]
    fn test_cleanup_respects_retention() {
        let history = HistoryManager::in_memory(5).unwrap();
        history
            .store_daily_trends(&[trend("a", Source::Etsy, 1.0, 0.0, 1)], day(1))
            .unwrap();
        history
            .store_daily_trends(&[trend("b", Source::Etsy, 1.0, 0.0, 8)], day(8))
            .unwrap();

        let result = history.cleanup(day(10)).unwrap();
        assert_eq!(result.cutoff, day(5));
        assert_eq!(result.trends_deleted, 1);
        assert_eq!(result.snapshots_deleted, 1);

        let stats = history.stats().unwrap();
        assert_eq!(stats.total_trends, 1);
        assert_eq!(stats.total_dates, 1);
        assert_eq!(stats.first_date, Some(day(8)));
        assert_eq!(stats.platforms["etsy"], 1);
    }

    #[test]
    fn test_file_backed_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("trend_history.db");
        let history = HistoryManager::new(&path, 30).unwrap();
        history
            .store_daily_trends(&[trend("a", Source::Etsy, 1.0, 0.0, 2)], day(2))
            .unwrap();
        assert!(path.exists());
        assert_eq!(history.stats().unwrap().total_trends, 1);
    }
}
