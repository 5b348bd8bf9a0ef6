//! Read-only REST API over collected observations and trend history
//!
//! ```text
//! GET /api/health
//! GET /api/trends/emerging?days=7&end=YYYY-MM-DD&min_score=0.75
//! GET /api/trends/multi-source?days=7&min_sources=2
//! GET /api/trends/{date}
//! GET /api/summary/{date}
//! GET /api/keywords?hours=24&limit=20
//! GET /api/keywords/{keyword}/history?days=30
//! GET /api/analysis/latest?mode=daily
//! GET /api/stats
//! GET /metrics
//! ```

pub mod routes;
pub mod server;

pub use routes::{create_router, ApiResponse};
pub use server::{AppState, ServerError, TrendServer};
