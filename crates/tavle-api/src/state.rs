//! Application state shared across all handlers.

use std::sync::Arc;

use tavle_core::config::AppConfig;
use tavle_database::DatabasePool;
use tavle_realtime::LiveHub;
use tavle_service::SessionService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// PostgreSQL connection pool.
    pub db: DatabasePool,
    /// Session directory service.
    pub sessions: Arc<SessionService>,
    /// Realtime hub (event bus + presence).
    pub hub: LiveHub,
}
