//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tavle_realtime::presence::RoomPresence;

/// Body for `GET /api/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when reachable.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Body for `GET /api/health/detailed`.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// Always "ok" when reachable.
    pub status: String,
    /// Whether the database answers.
    pub database: bool,
    /// Rooms currently tracked by the presence monitor.
    pub tracked_rooms: usize,
}

/// Body for `POST /api/events`.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    /// Always true: publish is fire-and-forget.
    pub ok: bool,
    /// How many subscribers the event was handed to.
    pub delivered: usize,
}

/// Body for `POST /api/sessions/heartbeat`.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatResponse {
    /// "alive" when the participant row was refreshed.
    pub status: String,
}

/// One row of the teacher's room list.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    /// Room identifier (`sessionCode:alias`).
    pub room: String,
    /// Participant alias.
    pub alias: String,
    /// Presence as derived from beacons and the timeout window.
    pub presence: RoomPresence,
    /// When the participant joined.
    pub joined_at: DateTime<Utc>,
    /// Last heartbeat touch.
    pub last_seen: DateTime<Utc>,
}
