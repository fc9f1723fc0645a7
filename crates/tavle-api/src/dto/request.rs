//! Request DTOs.

use serde::Deserialize;

use tavle_core::events::live::LiveEvent;

/// Body for `POST /api/sessions/join`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinRequest {
    /// Session code as typed by the student (canonicalized server-side).
    pub session_code: String,
    /// Desired alias (normalized server-side).
    pub alias: String,
    /// Opaque per-client token.
    pub client_token: String,
}

/// Body for `POST /api/sessions/heartbeat`.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatRequest {
    /// Session code.
    pub session_code: String,
    /// Alias.
    pub alias: String,
}

/// Body for `POST /api/sessions/evict`.
#[derive(Debug, Clone, Deserialize)]
pub struct EvictRequest {
    /// Session code.
    pub session_code: String,
    /// Alias to remove.
    pub alias: String,
    /// Optional user-visible reason.
    pub reason: Option<String>,
}

/// Body for `POST /api/events`.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishRequest {
    /// Target room (`sessionCode:alias`).
    pub room: String,
    /// The event to broadcast.
    pub event: LiveEvent,
}

/// Query for `GET /api/events/stream`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamQuery {
    /// Room to stream (`sessionCode:alias`).
    pub room: String,
}

/// Query for `GET /api/rooms`.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomsQuery {
    /// Session code whose rooms to list.
    pub code: String,
}
