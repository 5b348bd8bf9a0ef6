//! Source collectors
//!
//! A collector adapts one external source into a list of [`Observation`]s.
//! The [`CollectorManager`] fans out over all registered collectors and
//! merges their output into one [`ObservationSet`](crate::models::ObservationSet).

pub mod feed;
pub mod fixture;
pub mod manager;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SourceConfig;
use crate::models::{CollectionMode, Observation, Source};
use crate::utils::error::CollectError;

pub use feed::FeedCollector;
pub use fixture::StaticCollector;
pub use manager::{parse_sources, write_raw_snapshot, CollectorManager, CollectorStatus};

/// Adapter producing observations for one source
#[async_trait]
pub trait Collector: Send + Sync {
    fn source(&self) -> Source;

    async fn collect(
        &self,
        mode: CollectionMode,
        settings: &SourceConfig,
    ) -> Result<Vec<Observation>, CollectError>;
}

pub type SharedCollector = Arc<dyn Collector>;
