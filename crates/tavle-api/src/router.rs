//! Route definitions for the Tavle HTTP API.
//!
//! All routes are organized by domain and mounted under `/api`. The
//! router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tavle_core::config::server::CorsConfig;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(session_routes())
        .merge(event_routes())
        .merge(room_routes())
        .merge(health_routes());

    let cors = build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Session lifecycle endpoints.
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(handlers::session::create))
        .route("/sessions/join", post(handlers::session::join))
        .route("/sessions/heartbeat", post(handlers::session::heartbeat))
        .route("/sessions/evict", post(handlers::session::evict))
        .route("/sessions/{code}", get(handlers::session::lookup))
        .route("/sessions/{code}", delete(handlers::session::close))
}

/// Event publish + stream endpoints.
fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(handlers::events::publish))
        .route("/events/stream", get(handlers::events::stream))
}

/// Teacher room list.
fn room_routes() -> Router<AppState> {
    Router::new().route("/rooms", get(handlers::rooms::list))
}

/// Health endpoints.
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

/// Build the CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if config.allowed_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}
