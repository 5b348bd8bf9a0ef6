//! Observation repository
//!
//! Trait-based storage for raw observations and saved analysis results, so the
//! pipeline and API can run against SQLite in production and an in-memory store
//! in tests and demos.
//!
//! ```text
//!              ┌──────────────────────────────┐
//!              │  pipeline / analyzer / api   │
//!              └──────────────────────────────┘
//!                             │
//!                             ▼
//!              ┌──────────────────────────────┐
//!              │    ObservationRepository     │
//!              └──────────────────────────────┘
//!                    │                  │
//!                    ▼                  ▼
//!          ┌─────────────────┐ ┌─────────────────┐
//!          │     SQLite      │ │    In-memory    │
//!          └─────────────────┘ └─────────────────┘
//! ```
//!
//! Observations are keyed by [`Observation::id`], so inserting the same batch
//! twice stores it once.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::models::{normalize_keyword, CollectionMode, Observation, Source};

// ============================================================================
// Core Types
// ============================================================================

/// How often a keyword was observed in a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordFrequency {
    pub keyword: String,
    pub frequency: usize,
    pub avg_value: f64,
    pub source_count: usize,
}

/// Store-wide counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationStats {
    pub total: usize,
    pub last_24h: usize,
    pub per_source: BTreeMap<String, usize>,
    pub per_category: BTreeMap<String, usize>,
}

/// A saved analysis document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub mode: CollectionMode,
    pub created_at: DateTime<Utc>,
    pub results: serde_json::Value,
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_source(raw: &str) -> rusqlite::Result<Source> {
    Source::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown source: {raw}").into(),
        )
    })
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Storage for observations and analysis results
pub trait ObservationRepository: Send + Sync {
    /// Insert observations, skipping ids already stored; returns rows inserted
    fn insert_batch(&self, observations: &[Observation]) -> Result<usize>;

    /// Observations at or after `cutoff`, newest first
    fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Observations whose keyword or text contains `needle`, oldest first
    fn by_keyword(&self, needle: &str, since: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Observations tagged with `category`, newest first
    fn by_category(&self, category: &str, since: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Observations of exactly `keyword`, oldest first
    fn history_for(&self, keyword: &str, since: DateTime<Utc>) -> Result<Vec<Observation>>;

    /// Most frequently observed keywords since `since`
    fn keyword_frequencies(&self, since: DateTime<Utc>, limit: usize)
        -> Result<Vec<KeywordFrequency>>;

    /// Delete observations older than `cutoff`; returns rows deleted
    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    fn stats(&self, now: DateTime<Utc>) -> Result<ObservationStats>;

    fn count(&self) -> Result<usize>;

    fn save_analysis(
        &self,
        mode: CollectionMode,
        created_at: DateTime<Utc>,
        results: &serde_json::Value,
    ) -> Result<()>;

    /// Most recent analysis, optionally restricted to one mode
    fn latest_analysis(&self, mode: Option<CollectionMode>) -> Result<Option<StoredAnalysis>>;
}

/// Shared repository handle
pub type SharedObservationRepository = Arc<dyn ObservationRepository>;

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of ObservationRepository
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteObservationRepository {
    conn: Mutex<Connection>,
}

impl SqliteObservationRepository {
    /// Open (or create) a repository at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "Observation store initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory SQLite")?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("observation store connection lock poisoned"))
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS observations (
                    id TEXT PRIMARY KEY,
                    keyword TEXT NOT NULL,
                    source TEXT NOT NULL,
                    metric_value REAL NOT NULL,
                    timestamp TEXT NOT NULL,
                    text TEXT,
                    category TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_observations_timestamp
                    ON observations(timestamp);

                CREATE INDEX IF NOT EXISTS idx_observations_keyword
                    ON observations(keyword);

                CREATE INDEX IF NOT EXISTS idx_observations_source
                    ON observations(source);

                CREATE TABLE IF NOT EXISTS analysis_results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mode TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    results TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_analysis_results_created
                    ON analysis_results(created_at);
                "#,
        )
        .context("Failed to create SQLite schema")?;

        Ok(())
    }

    fn row_to_observation(row: &Row<'_>) -> rusqlite::Result<Observation> {
        let source: String = row.get("source")?;
        let timestamp: String = row.get("timestamp")?;
        Ok(Observation {
            keyword: row.get("keyword")?,
            source: parse_source(&source)?,
            metric_value: row.get("metric_value")?,
            timestamp: parse_ts(&timestamp)?,
            text: row.get("text")?,
            category: row.get("category")?,
        })
    }

    fn query_observations(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Observation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).context("Failed to prepare observation query")?;
        let rows = stmt
            .query_map(params, Self::row_to_observation)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read observations")?;
        Ok(rows)
    }
}

const OBSERVATION_COLUMNS: &str = "keyword, source, metric_value, timestamp, text, category";

impl ObservationRepository for SqliteObservationRepository {
    fn insert_batch(&self, observations: &[Observation]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO observations
                    (id, keyword, source, metric_value, timestamp, text, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for obs in observations {
                inserted += stmt.execute(params![
                    obs.id(),
                    obs.keyword,
                    obs.source.as_str(),
                    obs.metric_value,
                    format_ts(obs.timestamp),
                    obs.text,
                    obs.category,
                ])?;
            }
        }
        tx.commit().context("Failed to commit observation batch")?;

        tracing::debug!(inserted, offered = observations.len(), "Stored observations");
        Ok(inserted)
    }

    fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {OBSERVATION_COLUMNS} FROM observations
                 WHERE timestamp >= ?1 ORDER BY timestamp DESC"
            ),
            &[&format_ts(cutoff)],
        )
    }

    fn by_keyword(&self, needle: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        // Literal substring on `searchable_text`, matching the in-memory store
        let needle = needle.to_lowercase();
        let mut found = self.query_observations(
            &format!(
                "SELECT {OBSERVATION_COLUMNS} FROM observations
                 WHERE timestamp >= ?1
                 ORDER BY timestamp ASC"
            ),
            &[&format_ts(since)],
        )?;
        found.retain(|o| o.searchable_text().contains(&needle));
        Ok(found)
    }

    fn by_category(&self, category: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {OBSERVATION_COLUMNS} FROM observations
                 WHERE timestamp >= ?1 AND category = ?2
                 ORDER BY timestamp DESC"
            ),
            &[&format_ts(since), &category],
        )
    }

    fn history_for(&self, keyword: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        self.query_observations(
            &format!(
                "SELECT {OBSERVATION_COLUMNS} FROM observations
                 WHERE timestamp >= ?1 AND keyword = ?2
                 ORDER BY timestamp ASC"
            ),
            &[&format_ts(since), &normalize_keyword(keyword)],
        )
    }

    fn keyword_frequencies(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<KeywordFrequency>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT keyword, COUNT(*) AS frequency, AVG(metric_value) AS avg_value,
                    COUNT(DISTINCT source) AS source_count
             FROM observations
             WHERE timestamp >= ?1
             GROUP BY keyword
             ORDER BY frequency DESC, avg_value DESC, keyword ASC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![format_ts(since), limit as i64], |row| {
                Ok(KeywordFrequency {
                    keyword: row.get(0)?,
                    frequency: row.get::<_, i64>(1)? as usize,
                    avg_value: row.get(2)?,
                    source_count: row.get::<_, i64>(3)? as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read keyword frequencies")?;
        Ok(rows)
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM observations WHERE timestamp < ?1",
                params![format_ts(cutoff)],
            )
            .context("Failed to purge observations")?;
        conn.execute(
            "DELETE FROM analysis_results WHERE created_at < ?1",
            params![format_ts(cutoff)],
        )
        .context("Failed to purge analysis results")?;
        Ok(deleted)
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<ObservationStats> {
        let conn = self.conn()?;

        let total: i64 =
            conn.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        let last_24h: i64 = conn.query_row(
            "SELECT COUNT(*) FROM observations WHERE timestamp >= ?1",
            params![format_ts(now - Duration::hours(24))],
            |row| row.get(0),
        )?;

        let mut per_source = BTreeMap::new();
        let mut stmt =
            conn.prepare("SELECT source, COUNT(*) FROM observations GROUP BY source")?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (source, count) = row?;
            per_source.insert(source, count as usize);
        }

        let mut per_category = BTreeMap::new();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(category, 'uncategorized'), COUNT(*)
             FROM observations GROUP BY COALESCE(category, 'uncategorized')",
        )?;
        for row in stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))? {
            let (category, count) = row?;
            per_category.insert(category, count as usize);
        }

        Ok(ObservationStats {
            total: total as usize,
            last_24h: last_24h as usize,
            per_source,
            per_category,
        })
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let total: i64 =
            conn.query_row("SELECT COUNT(*) FROM observations", [], |row| row.get(0))?;
        Ok(total as usize)
    }

    fn save_analysis(
        &self,
        mode: CollectionMode,
        created_at: DateTime<Utc>,
        results: &serde_json::Value,
    ) -> Result<()> {
        let body = serde_json::to_string(results).context("Failed to serialize analysis")?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO analysis_results (mode, created_at, results) VALUES (?1, ?2, ?3)",
            params![mode.as_str(), format_ts(created_at), body],
        )
        .context("Failed to save analysis results")?;
        Ok(())
    }

    fn latest_analysis(&self, mode: Option<CollectionMode>) -> Result<Option<StoredAnalysis>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String)> = match mode {
            Some(mode) => conn
                .query_row(
                    "SELECT mode, created_at, results FROM analysis_results
                     WHERE mode = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
                    params![mode.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT mode, created_at, results FROM analysis_results
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?,
        };

        let Some((mode, created_at, body)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredAnalysis {
            mode: CollectionMode::parse(&mode)
                .ok_or_else(|| anyhow!("unknown analysis mode in store: {mode}"))?,
            created_at: parse_ts(&created_at)?,
            results: serde_json::from_str(&body).context("Failed to parse stored analysis")?,
        }))
    }
}

// ============================================================================
// In-memory Implementation
// ============================================================================

/// In-memory implementation, used by tests and the offline demo
#[derive(Default)]
pub struct MemoryObservationRepository {
    observations: RwLock<Vec<Observation>>,
    ids: RwLock<HashSet<String>>,
    analyses: RwLock<Vec<StoredAnalysis>>,
}

impl MemoryObservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_all(&self) -> Result<Vec<Observation>> {
        self.observations
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("observation lock poisoned"))
    }

    fn filtered<F>(&self, keep: F) -> Result<Vec<Observation>>
    where
        F: Fn(&Observation) -> bool,
    {
        Ok(self.read_all()?.into_iter().filter(|o| keep(o)).collect())
    }
}

impl ObservationRepository for MemoryObservationRepository {
    fn insert_batch(&self, observations: &[Observation]) -> Result<usize> {
        let mut ids = self.ids.write().map_err(|_| anyhow!("id lock poisoned"))?;
        let mut stored = self
            .observations
            .write()
            .map_err(|_| anyhow!("observation lock poisoned"))?;

        let mut inserted = 0;
        for obs in observations {
            if ids.insert(obs.id()) {
                stored.push(obs.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Observation>> {
        let mut found = self.filtered(|o| o.timestamp >= cutoff)?;
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    fn by_keyword(&self, needle: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        let needle = needle.to_lowercase();
        let mut found =
            self.filtered(|o| o.timestamp >= since && o.searchable_text().contains(&needle))?;
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(found)
    }

    fn by_category(&self, category: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        let mut found = self.filtered(|o| {
            o.timestamp >= since && o.category.as_deref() == Some(category)
        })?;
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    fn history_for(&self, keyword: &str, since: DateTime<Utc>) -> Result<Vec<Observation>> {
        let keyword = normalize_keyword(keyword);
        let mut found = self.filtered(|o| o.timestamp >= since && o.keyword == keyword)?;
        found.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(found)
    }

    fn keyword_frequencies(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<KeywordFrequency>> {
        let mut groups: HashMap<String, (usize, f64, HashSet<Source>)> = HashMap::new();
        for obs in self.filtered(|o| o.timestamp >= since)? {
            let entry = groups
                .entry(obs.keyword.clone())
                .or_insert_with(|| (0, 0.0, HashSet::new()));
            entry.0 += 1;
            entry.1 += obs.metric_value;
            entry.2.insert(obs.source);
        }

        let mut result: Vec<KeywordFrequency> = groups
            .into_iter()
            .map(|(keyword, (frequency, sum, sources))| KeywordFrequency {
                keyword,
                frequency,
                avg_value: sum / frequency as f64,
                source_count: sources.len(),
            })
            .collect();

        result.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| {
                    b.avg_value
                        .partial_cmp(&a.avg_value)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.keyword.cmp(&b.keyword))
        });
        result.truncate(limit);
        Ok(result)
    }

    fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut ids = self.ids.write().map_err(|_| anyhow!("id lock poisoned"))?;
        let mut stored = self
            .observations
            .write()
            .map_err(|_| anyhow!("observation lock poisoned"))?;

        let before = stored.len();
        stored.retain(|o| o.timestamp >= cutoff);
        *ids = stored.iter().map(Observation::id).collect();

        self.analyses
            .write()
            .map_err(|_| anyhow!("analysis lock poisoned"))?
            .retain(|a| a.created_at >= cutoff);

        Ok(before - stored.len())
    }

    fn stats(&self, now: DateTime<Utc>) -> Result<ObservationStats> {
        let all = self.read_all()?;
        let cutoff = now - Duration::hours(24);

        let mut stats = ObservationStats {
            total: all.len(),
            last_24h: all.iter().filter(|o| o.timestamp >= cutoff).count(),
            ..Default::default()
        };
        for obs in &all {
            *stats
                .per_source
                .entry(obs.source.as_str().to_string())
                .or_insert(0) += 1;
            let category = obs
                .category
                .clone()
                .unwrap_or_else(|| "uncategorized".to_string());
            *stats.per_category.entry(category).or_insert(0) += 1;
        }
        Ok(stats)
    }

    fn count(&self) -> Result<usize> {
        Ok(self
            .observations
            .read()
            .map_err(|_| anyhow!("observation lock poisoned"))?
            .len())
    }

    fn save_analysis(
        &self,
        mode: CollectionMode,
        created_at: DateTime<Utc>,
        results: &serde_json::Value,
    ) -> Result<()> {
        self.analyses
            .write()
            .map_err(|_| anyhow!("analysis lock poisoned"))?
            .push(StoredAnalysis {
                mode,
                created_at,
                results: results.clone(),
            });
        Ok(())
    }

    fn latest_analysis(&self, mode: Option<CollectionMode>) -> Result<Option<StoredAnalysis>> {
        let analyses = self
            .analyses
            .read()
            .map_err(|_| anyhow!("analysis lock poisoned"))?;

        // Later saves win ties on created_at, matching the SQLite ordering by id
        Ok(analyses
            .iter()
            .enumerate()
            .filter(|(_, a)| mode.map_or(true, |m| a.mode == m))
            .max_by(|(ia, a), (ib, b)| a.created_at.cmp(&b.created_at).then(ia.cmp(ib)))
            .map(|(_, a)| a.clone()))
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

pub fn create_sqlite_repository(path: impl AsRef<Path>) -> Result<SharedObservationRepository> {
    Ok(Arc::new(SqliteObservationRepository::new(path)?))
}

pub fn create_memory_repository() -> SharedObservationRepository {
    Arc::new(MemoryObservationRepository::new())
}
