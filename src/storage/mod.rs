//! Persistence for observations, saved analyses and daily trend history
//!
//! Raw observations live in the observation store ([`repository`]); the
//! per-day platform trends used as the emerging-trend baseline live in a
//! separate history database ([`history`]).

pub mod history;
pub mod repository;

pub use history::{CleanupResult, DailySummary, HistoryManager, HistoryStats, MultiSourceTrend};
pub use repository::{
    create_memory_repository, create_sqlite_repository, KeywordFrequency,
    MemoryObservationRepository, ObservationRepository, ObservationStats,
    SharedObservationRepository, SqliteObservationRepository, StoredAnalysis,
};
