//! HTTP server wiring for the trend API

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::storage::{HistoryManager, SharedObservationRepository};

use super::routes::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repository: SharedObservationRepository,
    pub history: Arc<HistoryManager>,
    pub config: Arc<Config>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        repository: SharedObservationRepository,
        history: Arc<HistoryManager>,
    ) -> Self {
        Self {
            repository,
            history,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid bind address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to bind: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub struct TrendServer {
    bind_address: SocketAddr,
    state: AppState,
}

impl TrendServer {
    pub fn new(state: AppState) -> Result<Self, ServerError> {
        let address = state.config.server.bind_address.clone();
        let bind_address =
            address
                .parse::<SocketAddr>()
                .map_err(|e| ServerError::Address {
                    address: address.clone(),
                    reason: e.to_string(),
                })?;
        Ok(Self {
            bind_address,
            state,
        })
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Build the router with all routes and configured layers
    pub fn build_router(&self) -> Router {
        let server = &self.state.config.server;
        let mut router = create_router(self.state.clone());

        if server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(self.bind_address)
            .await
            .map_err(ServerError::Bind)?;

        tracing::info!(address = %self.bind_address, "Trend API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(ServerError::Serve)?;

        tracing::info!("Trend API shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::create_memory_repository;

    fn state(bind_address: &str) -> AppState {
        let mut config = Config::default();
        config.server.bind_address = bind_address.to_string();
        AppState::new(
            config,
            create_memory_repository(),
            Arc::new(HistoryManager::in_memory(30).unwrap()),
        )
    }

    #[test]
    fn test_server_creation() {
        let server = TrendServer::new(state("127.0.0.1:9191")).unwrap();
        assert_eq!(server.bind_address().port(), 9191);
    }

    #[test]
    fn test_invalid_bind_address() {
        let err = TrendServer::new(state("localhost")).err().unwrap();
        assert!(matches!(err, ServerError::Address { .. }));
    }
}
